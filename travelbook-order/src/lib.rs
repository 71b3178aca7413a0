pub mod catalog;
pub mod manager;

pub use catalog::CatalogService;
pub use manager::BookingService;
