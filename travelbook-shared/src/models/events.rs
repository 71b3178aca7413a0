use uuid::Uuid;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct BookingConfirmedEvent {
    pub booking_id: String,
    pub travel_option_id: Uuid,
    pub seats: i32,
    /// Seats left on the travel option once this booking committed.
    pub available_seats: i32,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct BookingCancelledEvent {
    pub booking_id: String,
    pub travel_option_id: Uuid,
    pub seats: i32,
    pub available_seats: i32,
    pub timestamp: i64,
}

/// Seat availability change published after a booking commits.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BookingEvent {
    Confirmed(BookingConfirmedEvent),
    Cancelled(BookingCancelledEvent),
}

impl BookingEvent {
    pub fn name(&self) -> &'static str {
        match self {
            BookingEvent::Confirmed(_) => "booking_confirmed",
            BookingEvent::Cancelled(_) => "booking_cancelled",
        }
    }

    pub fn travel_option_id(&self) -> Uuid {
        match self {
            BookingEvent::Confirmed(e) => e.travel_option_id,
            BookingEvent::Cancelled(e) => e.travel_option_id,
        }
    }

    pub fn available_seats(&self) -> i32 {
        match self {
            BookingEvent::Confirmed(e) => e.available_seats,
            BookingEvent::Cancelled(e) => e.available_seats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_is_tagged_on_the_wire() {
        let event = BookingEvent::Cancelled(BookingCancelledEvent {
            booking_id: "BK0A1B2C3D".to_string(),
            travel_option_id: Uuid::nil(),
            seats: 2,
            available_seats: 5,
            timestamp: 0,
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "cancelled");
        assert_eq!(json["available_seats"], 5);
        assert_eq!(event.name(), "booking_cancelled");
    }
}
