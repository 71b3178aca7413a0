pub mod identity;
pub mod models;

pub use identity::{InvalidUserId, UserId};
pub use models::events::{BookingCancelledEvent, BookingConfirmedEvent, BookingEvent};
