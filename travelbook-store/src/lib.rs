pub mod app_config;
pub mod database;
pub mod memory_repo;
pub mod catalog_repo;
pub mod booking_repo;

pub use database::DbClient;
pub use memory_repo::InMemoryStore;
pub use catalog_repo::StoreTravelOptionRepository;
pub use booking_repo::StoreBookingRepository;
