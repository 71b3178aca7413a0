use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use travelbook_core::{
    Booking, BookingDraft, BookingError, BookingId, BookingRepository, BookingRules, CoreResult,
    Reservation,
};
use travelbook_shared::{BookingCancelledEvent, BookingConfirmedEvent, BookingEvent, UserId};
use uuid::Uuid;

/// Manages the booking lifecycle on top of a booking repository.
///
/// Seat accounting happens inside the repository; the service validates
/// requests up front, retries id collisions and publishes a `BookingEvent`
/// for every committed change.
#[derive(Clone)]
pub struct BookingService {
    bookings: Arc<dyn BookingRepository>,
    rules: BookingRules,
    events: broadcast::Sender<BookingEvent>,
}

impl BookingService {
    pub fn new(bookings: Arc<dyn BookingRepository>, rules: BookingRules) -> Self {
        let (events, _) = broadcast::channel(rules.event_channel_capacity.max(1));
        Self {
            bookings,
            rules,
            events,
        }
    }

    /// Receive every booking event committed from now on
    pub fn subscribe(&self) -> broadcast::Receiver<BookingEvent> {
        self.events.subscribe()
    }

    /// Reserve `seats` on a travel option for `user_id`.
    pub async fn create_booking(
        &self,
        user_id: &UserId,
        travel_option_id: Uuid,
        seats: i32,
    ) -> CoreResult<Booking> {
        let mut draft = BookingDraft::new(user_id.clone(), travel_option_id, seats)?;

        if let Some(max) = self.rules.max_seats_per_booking.filter(|max| seats > *max) {
            return Err(BookingError::ValidationError(format!(
                "at most {} seats per booking, got {}",
                max, seats
            )));
        }

        let mut attempt = 1;
        let reservation = loop {
            match self.bookings.reserve(draft.clone()).await {
                Ok(reservation) => break reservation,
                Err(BookingError::DuplicateBookingId(id)) if attempt < self.rules.id_attempts => {
                    warn!("Booking id {} collided (attempt {}), drawing a new one", id, attempt);
                    attempt += 1;
                    draft = draft.with_fresh_id();
                }
                Err(BookingError::DuplicateBookingId(id)) => {
                    return Err(BookingError::Conflict(format!(
                        "could not allocate a unique booking id after {} attempts (last {})",
                        attempt, id
                    )));
                }
                Err(e) => return Err(e),
            }
        };

        info!(
            "Booking {} confirmed: {} seats on {} for {}, {} left",
            reservation.booking.booking_id,
            reservation.booking.seats,
            travel_option_id,
            user_id,
            reservation.available_seats
        );
        self.publish(confirmed_event(&reservation));

        Ok(reservation.booking)
    }

    /// Cancel one of the user's bookings and return its seats.
    pub async fn cancel_booking(&self, user_id: &UserId, booking_id: &BookingId) -> CoreResult<Booking> {
        let reservation = self.bookings.cancel(user_id, booking_id).await?;

        info!(
            "Booking {} cancelled: {} seats back on {}, {} available",
            booking_id,
            reservation.booking.seats,
            reservation.booking.travel_option_id,
            reservation.available_seats
        );
        self.publish(cancelled_event(&reservation));

        Ok(reservation.booking)
    }

    pub async fn get_booking(&self, user_id: &UserId, booking_id: &BookingId) -> CoreResult<Booking> {
        self.bookings
            .get_booking(user_id, booking_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("booking {}", booking_id)))
    }

    /// The user's bookings, newest first
    pub async fn list_bookings(&self, user_id: &UserId) -> CoreResult<Vec<Booking>> {
        self.bookings.list_bookings(user_id).await
    }

    /// Delete the user's bookings, putting back seats still held.
    pub async fn remove_user(&self, user_id: &UserId) -> CoreResult<usize> {
        let removed = self.bookings.remove_user(user_id).await?;
        info!("Removed user {} with {} bookings", user_id, removed);
        Ok(removed)
    }

    fn publish(&self, event: BookingEvent) {
        // No receivers is fine
        if self.events.send(event).is_err() {
            debug!("No subscribers for booking events");
        }
    }
}

fn confirmed_event(reservation: &Reservation) -> BookingEvent {
    let booking = &reservation.booking;
    BookingEvent::Confirmed(BookingConfirmedEvent {
        booking_id: booking.booking_id.to_string(),
        travel_option_id: booking.travel_option_id,
        seats: booking.seats,
        available_seats: reservation.available_seats,
        timestamp: booking.created_at.timestamp(),
    })
}

fn cancelled_event(reservation: &Reservation) -> BookingEvent {
    let booking = &reservation.booking;
    BookingEvent::Cancelled(BookingCancelledEvent {
        booking_id: booking.booking_id.to_string(),
        travel_option_id: booking.travel_option_id,
        seats: booking.seats,
        available_seats: reservation.available_seats,
        timestamp: booking
            .cancelled_at
            .unwrap_or(booking.created_at)
            .timestamp(),
    })
}
