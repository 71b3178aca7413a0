use async_trait::async_trait;
use rust_decimal::Decimal;
use travelbook_catalog::TravelOption;
use travelbook_shared::UserId;
use uuid::Uuid;

use crate::booking::{Booking, BookingDraft, BookingId};
use crate::CoreResult;

/// A committed booking together with the seat count it left behind
#[derive(Debug, Clone, PartialEq)]
pub struct Reservation {
    pub booking: Booking,
    pub available_seats: i32,
}

/// Repository trait for travel option (inventory record) access
#[async_trait]
pub trait TravelOptionRepository: Send + Sync {
    /// Fails with `Conflict` when the travel code is taken
    async fn insert_travel_option(&self, option: &TravelOption) -> CoreResult<()>;

    async fn get_travel_option(&self, id: Uuid) -> CoreResult<Option<TravelOption>>;

    /// All travel options, earliest departure first
    async fn list_travel_options(&self) -> CoreResult<Vec<TravelOption>>;

    async fn update_price(&self, id: Uuid, price: Decimal) -> CoreResult<Option<TravelOption>>;

    /// Removes the option and every booking made against it
    async fn delete_travel_option(&self, id: Uuid) -> CoreResult<bool>;
}

/// Repository trait for the booking ledger.
///
/// `reserve` and `cancel` are the only writers of a travel option's seat
/// count. Each runs as one atomic unit serialized per travel option: the
/// seat adjustment and the ledger write are either both visible or neither.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Check availability, price the draft at the current unit price, persist
    /// it as confirmed and decrement the seats.
    ///
    /// Fails with `NotFound` for an unknown travel option, then
    /// `InsufficientInventory`, and `DuplicateBookingId` if the draft's id is
    /// taken.
    async fn reserve(&self, draft: BookingDraft) -> CoreResult<Reservation>;

    /// Mark the user's booking cancelled and return its seats.
    ///
    /// Fails with `NotFound` when the booking is missing or owned by someone
    /// else, and `InvalidState` when it is already cancelled.
    async fn cancel(&self, user_id: &UserId, booking_id: &BookingId) -> CoreResult<Reservation>;

    async fn get_booking(&self, user_id: &UserId, booking_id: &BookingId) -> CoreResult<Option<Booking>>;

    /// The user's bookings, newest first
    async fn list_bookings(&self, user_id: &UserId) -> CoreResult<Vec<Booking>>;

    /// Delete every booking of the user, returning seats still held by
    /// confirmed ones. Returns how many bookings were removed.
    async fn remove_user(&self, user_id: &UserId) -> CoreResult<usize>;
}
