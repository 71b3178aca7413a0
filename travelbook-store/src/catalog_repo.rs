use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use travelbook_catalog::{pricing, SeatInventory, TravelOption, TravelType};
use travelbook_core::{BookingError, CoreResult, TravelOptionRepository};
use uuid::Uuid;

use crate::database::{is_unique_violation, storage_error};

const TRAVEL_OPTION_COLUMNS: &str = "id, travel_code, travel_type, origin, destination, departure_time, \
     price, available_seats, total_capacity, created_at";

pub struct StoreTravelOptionRepository {
    pool: PgPool,
}

impl StoreTravelOptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct TravelOptionRow {
    id: Uuid,
    travel_code: String,
    travel_type: String,
    origin: String,
    destination: String,
    departure_time: DateTime<Utc>,
    price: Decimal,
    available_seats: i32,
    total_capacity: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<TravelOptionRow> for TravelOption {
    type Error = BookingError;

    fn try_from(row: TravelOptionRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let corrupt = |e: String| BookingError::Storage(format!("travel option {}: {}", id, e));

        let travel_type = row
            .travel_type
            .parse::<TravelType>()
            .map_err(|e| corrupt(e.to_string()))?;
        let seats = SeatInventory::restore(row.available_seats, row.total_capacity)
            .map_err(|e| corrupt(e.to_string()))?;

        Ok(TravelOption {
            id: row.id,
            travel_code: row.travel_code,
            travel_type,
            origin: row.origin,
            destination: row.destination,
            departure_time: row.departure_time,
            price: row.price,
            seats,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl TravelOptionRepository for StoreTravelOptionRepository {
    async fn insert_travel_option(&self, option: &TravelOption) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO travel_options (id, travel_code, travel_type, origin, destination, departure_time, price, available_seats, total_capacity, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(option.id)
        .bind(&option.travel_code)
        .bind(option.travel_type.as_str())
        .bind(&option.origin)
        .bind(&option.destination)
        .bind(option.departure_time)
        .bind(option.price)
        .bind(option.seats.available_seats)
        .bind(option.seats.total_capacity)
        .bind(option.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                BookingError::Conflict(format!("travel code {} already exists", option.travel_code))
            } else {
                storage_error(e)
            }
        })?;

        Ok(())
    }

    async fn get_travel_option(&self, id: Uuid) -> CoreResult<Option<TravelOption>> {
        let row = sqlx::query_as::<_, TravelOptionRow>(&format!(
            "SELECT {} FROM travel_options WHERE id = $1",
            TRAVEL_OPTION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        row.map(TravelOption::try_from).transpose()
    }

    async fn list_travel_options(&self) -> CoreResult<Vec<TravelOption>> {
        let rows = sqlx::query_as::<_, TravelOptionRow>(&format!(
            "SELECT {} FROM travel_options ORDER BY departure_time, travel_code",
            TRAVEL_OPTION_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.into_iter().map(TravelOption::try_from).collect()
    }

    async fn update_price(&self, id: Uuid, price: Decimal) -> CoreResult<Option<TravelOption>> {
        let price = pricing::normalize_unit_price(price)?;

        let row = sqlx::query_as::<_, TravelOptionRow>(&format!(
            "UPDATE travel_options SET price = $2 WHERE id = $1 RETURNING {}",
            TRAVEL_OPTION_COLUMNS
        ))
        .bind(id)
        .bind(price)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        row.map(TravelOption::try_from).transpose()
    }

    async fn delete_travel_option(&self, id: Uuid) -> CoreResult<bool> {
        // Bookings go with it via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM travel_options WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;

        Ok(result.rows_affected() > 0)
    }
}
