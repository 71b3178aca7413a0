use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::info;
use travelbook_catalog::{NewTravelOption, TravelOption};
use travelbook_core::{BookingError, CoreResult, TravelOptionRepository};
use uuid::Uuid;

/// Administrative access to the travel option catalog
#[derive(Clone)]
pub struct CatalogService {
    options: Arc<dyn TravelOptionRepository>,
}

impl CatalogService {
    pub fn new(options: Arc<dyn TravelOptionRepository>) -> Self {
        Self { options }
    }

    /// Validate and store a new travel option with all seats available
    pub async fn register_travel_option(&self, input: NewTravelOption) -> CoreResult<TravelOption> {
        let option = input.validate()?;
        self.options.insert_travel_option(&option).await?;

        info!("Registered travel option {} ({})", option, option.id);
        Ok(option)
    }

    pub async fn get_travel_option(&self, id: Uuid) -> CoreResult<TravelOption> {
        self.options
            .get_travel_option(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    pub async fn list_travel_options(&self) -> CoreResult<Vec<TravelOption>> {
        self.options.list_travel_options().await
    }

    /// New unit price for future bookings; existing totals stay as sold
    pub async fn update_price(&self, id: Uuid, price: Decimal) -> CoreResult<TravelOption> {
        let option = self
            .options
            .update_price(id, price)
            .await?
            .ok_or_else(|| not_found(id))?;

        info!("Travel option {} now priced at {}", option.travel_code, option.price);
        Ok(option)
    }

    pub async fn delete_travel_option(&self, id: Uuid) -> CoreResult<()> {
        if !self.options.delete_travel_option(id).await? {
            return Err(not_found(id));
        }

        info!("Deleted travel option {}", id);
        Ok(())
    }
}

fn not_found(id: Uuid) -> BookingError {
    BookingError::NotFound(format!("travel option {}", id))
}
