use serde::{Deserialize, Serialize};

/// Seat supply of one travel option.
///
/// `available_seats` moves down on reservation and back up on release, and is
/// always kept within `0..=total_capacity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatInventory {
    pub available_seats: i32,
    pub total_capacity: i32,
}

impl SeatInventory {
    /// Fresh inventory with every seat available
    pub fn new(total_capacity: i32) -> Result<Self, InventoryError> {
        Self::restore(total_capacity, total_capacity)
    }

    /// Rebuild inventory from persisted counters, checking the invariant
    pub fn restore(available_seats: i32, total_capacity: i32) -> Result<Self, InventoryError> {
        if total_capacity < 0 || available_seats < 0 || available_seats > total_capacity {
            return Err(InventoryError::InvalidCapacity {
                available: available_seats,
                capacity: total_capacity,
            });
        }

        Ok(Self {
            available_seats,
            total_capacity,
        })
    }

    /// Take seats out of the available pool (booking created)
    pub fn reserve(&mut self, quantity: i32) -> Result<(), InventoryError> {
        if quantity < 1 {
            return Err(InventoryError::InvalidQuantity(quantity));
        }

        if self.available_seats < quantity {
            return Err(InventoryError::InsufficientInventory {
                requested: quantity,
                available: self.available_seats,
            });
        }

        self.available_seats -= quantity;

        Ok(())
    }

    /// Return seats to the available pool (booking cancelled)
    pub fn release(&mut self, quantity: i32) -> Result<(), InventoryError> {
        if quantity < 1 {
            return Err(InventoryError::InvalidQuantity(quantity));
        }

        let restored = self
            .available_seats
            .checked_add(quantity)
            .filter(|restored| *restored <= self.total_capacity)
            .ok_or(InventoryError::CapacityExceeded {
                requested: quantity,
                available: self.available_seats,
                capacity: self.total_capacity,
            })?;

        self.available_seats = restored;

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InventoryError {
    #[error("Seat quantity must be at least 1, got {0}")]
    InvalidQuantity(i32),

    #[error("Invalid seat counters: {available} available of {capacity}")]
    InvalidCapacity {
        available: i32,
        capacity: i32,
    },

    #[error("Insufficient inventory: requested {requested}, available {available}")]
    InsufficientInventory {
        requested: i32,
        available: i32,
    },

    #[error("Releasing {requested} seats would exceed capacity {capacity} ({available} available)")]
    CapacityExceeded {
        requested: i32,
        available: i32,
        capacity: i32,
    },
}
