use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use travelbook_catalog::pricing;
use travelbook_shared::UserId;
use uuid::Uuid;

use crate::{BookingError, CoreResult};

pub const BOOKING_ID_PREFIX: &str = "BK";
const BOOKING_ID_TOKEN_LEN: usize = 8;

/// Public booking reference, `BK` followed by eight upper-case hex digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BookingId(String);

impl BookingId {
    /// Draw a new random reference. Uniqueness is enforced by the store.
    pub fn generate() -> Self {
        let token = Uuid::new_v4().simple().to_string();
        Self(format!(
            "{}{}",
            BOOKING_ID_PREFIX,
            token[..BOOKING_ID_TOKEN_LEN].to_uppercase()
        ))
    }

    pub fn parse(raw: &str) -> CoreResult<Self> {
        let token = raw
            .strip_prefix(BOOKING_ID_PREFIX)
            .filter(|t| t.len() == BOOKING_ID_TOKEN_LEN)
            .filter(|t| t.chars().all(|c| matches!(c, '0'..='9' | 'A'..='F')))
            .ok_or_else(|| BookingError::ValidationError(format!("malformed booking id '{}'", raw)))?;

        Ok(Self(format!("{}{}", BOOKING_ID_PREFIX, token)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for BookingId {
    type Error = BookingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BookingId> for String {
    fn from(id: BookingId) -> Self {
        id.0
    }
}

/// Booking lifecycle. `Confirmed` is initial, `Cancelled` is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(BookingError::Storage(format!("unknown booking status '{}'", other))),
        }
    }
}

/// A reservation the service has validated but the store has not yet priced
/// or committed.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingDraft {
    pub booking_id: BookingId,
    pub user_id: UserId,
    pub travel_option_id: Uuid,
    pub seats: i32,
    pub requested_at: DateTime<Utc>,
}

impl BookingDraft {
    pub fn new(user_id: UserId, travel_option_id: Uuid, seats: i32) -> CoreResult<Self> {
        if seats < 1 {
            return Err(BookingError::ValidationError(format!(
                "seat quantity must be at least 1, got {}",
                seats
            )));
        }

        Ok(Self {
            booking_id: BookingId::generate(),
            user_id,
            travel_option_id,
            seats,
            requested_at: Utc::now(),
        })
    }

    /// Same request under a newly drawn booking id
    pub fn with_fresh_id(&self) -> Self {
        Self {
            booking_id: BookingId::generate(),
            ..self.clone()
        }
    }
}

/// One reservation against a travel option
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub booking_id: BookingId,
    pub user_id: UserId,
    pub travel_option_id: Uuid,
    pub seats: i32,
    /// Unit price times seats as of creation; never recomputed
    pub total_price: Decimal,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Booking {
    /// Price a draft at the unit price read under the seat lock.
    pub fn confirm(draft: BookingDraft, unit_price: Decimal) -> CoreResult<Self> {
        let total_price = pricing::total_price(unit_price, draft.seats)?;

        Ok(Self {
            booking_id: draft.booking_id,
            user_id: draft.user_id,
            travel_option_id: draft.travel_option_id,
            seats: draft.seats,
            total_price,
            status: BookingStatus::Confirmed,
            created_at: draft.requested_at,
            cancelled_at: None,
        })
    }

    /// Transition: Confirmed → Cancelled
    pub fn cancel(&mut self) -> CoreResult<()> {
        if self.status != BookingStatus::Confirmed {
            return Err(BookingError::InvalidState(format!(
                "booking {} is already {}",
                self.booking_id, self.status
            )));
        }

        self.status = BookingStatus::Cancelled;
        self.cancelled_at = Some(Utc::now());
        Ok(())
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == BookingStatus::Confirmed
    }

    pub fn belongs_to(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserId {
        UserId::new("testuser").unwrap()
    }

    #[test]
    fn test_booking_id_format() {
        let id = BookingId::generate();
        assert!(id.as_str().starts_with("BK"));
        assert_eq!(id.as_str().len(), 10);
        assert_eq!(BookingId::parse(id.as_str()).unwrap(), id);
    }

    #[test]
    fn test_booking_id_rejects_malformed_input() {
        for raw in ["", "BK", "BK1234567", "BK123456789", "XX0A1B2C3D", "BK0a1b2c3d", "BK0A1B2C3G"] {
            assert!(
                matches!(BookingId::parse(raw), Err(BookingError::ValidationError(_))),
                "accepted {raw}"
            );
        }
    }

    #[test]
    fn test_booking_creation() {
        let draft = BookingDraft::new(user(), Uuid::new_v4(), 2).unwrap();
        let booking = Booking::confirm(draft.clone(), "89.50".parse().unwrap()).unwrap();

        assert_eq!(booking.user_id, user());
        assert_eq!(booking.seats, 2);
        assert_eq!(booking.total_price, "179.00".parse::<Decimal>().unwrap());
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.created_at, draft.requested_at);
        assert!(booking.booking_id.as_str().starts_with("BK"));
    }

    #[test]
    fn test_draft_requires_a_seat() {
        assert!(matches!(
            BookingDraft::new(user(), Uuid::new_v4(), 0),
            Err(BookingError::ValidationError(_))
        ));
        assert!(BookingDraft::new(user(), Uuid::new_v4(), -2).is_err());
    }

    #[test]
    fn test_cancel_is_one_way() {
        let draft = BookingDraft::new(user(), Uuid::new_v4(), 1).unwrap();
        let mut booking = Booking::confirm(draft, "10.00".parse().unwrap()).unwrap();

        booking.cancel().unwrap();
        assert_eq!(booking.status, BookingStatus::Cancelled);
        assert!(booking.cancelled_at.is_some());

        let cancelled_at = booking.cancelled_at;
        assert!(matches!(booking.cancel(), Err(BookingError::InvalidState(_))));
        assert_eq!(booking.cancelled_at, cancelled_at);
    }

    #[test]
    fn test_fresh_id_keeps_request() {
        let draft = BookingDraft::new(user(), Uuid::new_v4(), 3).unwrap();
        let retry = draft.with_fresh_id();

        assert_eq!(retry.seats, 3);
        assert_eq!(retry.travel_option_id, draft.travel_option_id);
        assert_eq!(retry.requested_at, draft.requested_at);
    }

    #[test]
    fn test_status_wire_form() {
        assert_eq!(serde_json::to_value(BookingStatus::Cancelled).unwrap(), "cancelled");
        assert_eq!("confirmed".parse::<BookingStatus>().unwrap(), BookingStatus::Confirmed);
        assert!("pending".parse::<BookingStatus>().is_err());
    }
}
