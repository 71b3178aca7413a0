use std::sync::Arc;
use travelbook_core::{BookingRepository, BookingRules, TravelOptionRepository};
use travelbook_order::{BookingService, CatalogService};
use travelbook_store::InMemoryStore;

#[derive(Clone)]
pub struct AppState {
    pub bookings: BookingService,
    pub catalog: CatalogService,
}

impl AppState {
    pub fn new(
        options: Arc<dyn TravelOptionRepository>,
        bookings: Arc<dyn BookingRepository>,
        rules: BookingRules,
    ) -> Self {
        Self {
            bookings: BookingService::new(bookings, rules),
            catalog: CatalogService::new(options),
        }
    }

    /// Both repositories backed by one process-local store
    pub fn in_memory(rules: BookingRules) -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self::new(store.clone(), store, rules)
    }
}
