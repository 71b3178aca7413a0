use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::inventory::{InventoryError, SeatInventory};
use crate::pricing::{self, PricingError};

pub const MAX_TRAVEL_CODE_LEN: usize = 20;
pub const MAX_PLACE_LEN: usize = 100;

/// Kind of transport a travel option sells seats on
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TravelType {
    Flight,
    Train,
    Bus,
}

impl TravelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelType::Flight => "flight",
            TravelType::Train => "train",
            TravelType::Bus => "bus",
        }
    }

    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            TravelType::Flight => "Flight",
            TravelType::Train => "Train",
            TravelType::Bus => "Bus",
        }
    }
}

impl FromStr for TravelType {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flight" => Ok(TravelType::Flight),
            "train" => Ok(TravelType::Train),
            "bus" => Ok(TravelType::Bus),
            other => Err(CatalogError::InvalidField {
                field: "travel_type",
                reason: format!("unknown travel type '{}'", other),
            }),
        }
    }
}

/// A bookable departure with finite seat supply
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TravelOption {
    pub id: Uuid,
    pub travel_code: String,
    pub travel_type: TravelType,
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    /// Unit price per seat; only applies to bookings made after it is set
    pub price: Decimal,
    #[serde(flatten)]
    pub seats: SeatInventory,
    pub created_at: DateTime<Utc>,
}

impl TravelOption {
    pub fn available_seats(&self) -> i32 {
        self.seats.available_seats
    }

    /// Replace the unit price. Existing bookings keep the total they were sold at.
    pub fn set_price(&mut self, price: Decimal) -> Result<(), PricingError> {
        self.price = pricing::normalize_unit_price(price)?;
        Ok(())
    }
}

impl fmt::Display for TravelOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} from {} to {}",
            self.travel_code,
            self.travel_type.label(),
            self.origin,
            self.destination
        )
    }
}

/// Administrative input for registering a travel option
#[derive(Debug, Clone, Deserialize)]
pub struct NewTravelOption {
    pub travel_code: String,
    pub travel_type: TravelType,
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub price: Decimal,
    pub seats: i32,
}

impl NewTravelOption {
    /// Check every field and build the record, with all seats available.
    pub fn validate(self) -> Result<TravelOption, CatalogError> {
        let travel_code = required_text("travel_code", &self.travel_code, MAX_TRAVEL_CODE_LEN)?;
        let origin = required_text("origin", &self.origin, MAX_PLACE_LEN)?;
        let destination = required_text("destination", &self.destination, MAX_PLACE_LEN)?;

        if travel_code.chars().any(char::is_whitespace) {
            return Err(CatalogError::InvalidField {
                field: "travel_code",
                reason: "must not contain whitespace".to_string(),
            });
        }

        let price = pricing::normalize_unit_price(self.price)?;
        let seats = SeatInventory::new(self.seats)?;

        Ok(TravelOption {
            id: Uuid::new_v4(),
            travel_code,
            travel_type: self.travel_type,
            origin,
            destination,
            departure_time: self.departure_time,
            price,
            seats,
            created_at: Utc::now(),
        })
    }
}

fn required_text(field: &'static str, value: &str, max_len: usize) -> Result<String, CatalogError> {
    let value = value.trim();

    if value.is_empty() {
        return Err(CatalogError::InvalidField {
            field,
            reason: "must not be empty".to_string(),
        });
    }

    if value.chars().count() > max_len {
        return Err(CatalogError::InvalidField {
            field,
            reason: format!("must be at most {} characters", max_len),
        });
    }

    Ok(value.to_string())
}

/// Catalog-related errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CatalogError {
    #[error("Invalid {field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    Inventory(#[from] InventoryError),
}
