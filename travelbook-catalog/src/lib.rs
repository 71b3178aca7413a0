pub mod travel_option;
pub mod pricing;
pub mod inventory;

pub use travel_option::{CatalogError, NewTravelOption, TravelOption, TravelType};
pub use pricing::PricingError;
pub use inventory::{InventoryError, SeatInventory};
