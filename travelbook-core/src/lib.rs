pub mod booking;
pub mod repository;
pub mod rules;

use travelbook_catalog::{CatalogError, InventoryError, PricingError};
use travelbook_shared::InvalidUserId;

pub use booking::{Booking, BookingDraft, BookingId, BookingStatus};
pub use repository::{BookingRepository, Reservation, TravelOptionRepository};
pub use rules::BookingRules;

/// Every way a booking or catalog operation can fail.
///
/// Each variant is a definitive outcome of the request that produced it; none
/// of them leaves partially applied state behind.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BookingError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Insufficient inventory: requested {requested}, available {available}")]
    InsufficientInventory {
        requested: i32,
        available: i32,
    },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// A freshly generated booking id is already taken
    #[error("Booking id already in use: {0}")]
    DuplicateBookingId(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type CoreResult<T> = Result<T, BookingError>;

impl From<InventoryError> for BookingError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::InsufficientInventory { requested, available } => {
                BookingError::InsufficientInventory { requested, available }
            }
            InventoryError::CapacityExceeded { .. } => BookingError::InvalidState(err.to_string()),
            InventoryError::InvalidQuantity(_) | InventoryError::InvalidCapacity { .. } => {
                BookingError::ValidationError(err.to_string())
            }
        }
    }
}

impl From<PricingError> for BookingError {
    fn from(err: PricingError) -> Self {
        BookingError::ValidationError(err.to_string())
    }
}

impl From<CatalogError> for BookingError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::InvalidField { .. } => BookingError::ValidationError(err.to_string()),
            CatalogError::Pricing(e) => e.into(),
            CatalogError::Inventory(e) => e.into(),
        }
    }
}

impl From<InvalidUserId> for BookingError {
    fn from(err: InvalidUserId) -> Self {
        BookingError::ValidationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inventory_errors_map_to_booking_taxonomy() {
        let err: BookingError = InventoryError::InsufficientInventory { requested: 3, available: 2 }.into();
        assert_eq!(err, BookingError::InsufficientInventory { requested: 3, available: 2 });

        let err: BookingError = InventoryError::CapacityExceeded { requested: 2, available: 4, capacity: 5 }.into();
        assert!(matches!(err, BookingError::InvalidState(_)));

        let err: BookingError = InventoryError::InvalidQuantity(0).into();
        assert!(matches!(err, BookingError::ValidationError(_)));
    }
}
