use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use travelbook_catalog::TravelOption;
use travelbook_core::{
    Booking, BookingDraft, BookingError, BookingId, BookingRepository, CoreResult, Reservation,
    TravelOptionRepository,
};
use travelbook_shared::UserId;
use uuid::Uuid;

/// One travel option and the bookings made against it, guarded together so
/// a seat adjustment and its ledger write are never observed apart.
struct Shard {
    option: TravelOption,
    bookings: HashMap<BookingId, Booking>,
    /// Set when the option is deleted while a writer may still hold the Arc
    deleted: bool,
}

#[derive(Default)]
struct Catalog {
    shards: HashMap<Uuid, Arc<Mutex<Shard>>>,
    codes: HashMap<String, Uuid>,
}

#[derive(Clone)]
struct BookingLocator {
    travel_option_id: Uuid,
    user_id: UserId,
}

/// In-memory store with one mutex per travel option.
///
/// Writers on the same travel option queue on its shard; different options
/// proceed in parallel. Lock order is catalog, then shard, then index, and
/// the index lock is never held while waiting on another lock.
#[derive(Default)]
pub struct InMemoryStore {
    catalog: RwLock<Catalog>,
    index: RwLock<HashMap<BookingId, BookingLocator>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn shard(&self, id: Uuid) -> Option<Arc<Mutex<Shard>>> {
        self.catalog.read().await.shards.get(&id).cloned()
    }

    async fn locate(&self, user_id: &UserId, booking_id: &BookingId) -> CoreResult<Arc<Mutex<Shard>>> {
        let locator = self
            .index
            .read()
            .await
            .get(booking_id)
            .filter(|l| &l.user_id == user_id)
            .cloned()
            .ok_or_else(|| booking_not_found(booking_id))?;

        self.shard(locator.travel_option_id)
            .await
            .ok_or_else(|| booking_not_found(booking_id))
    }

    async fn reserve_in_shard(&self, draft: BookingDraft) -> CoreResult<Reservation> {
        let shard = self
            .shard(draft.travel_option_id)
            .await
            .ok_or_else(|| travel_option_not_found(draft.travel_option_id))?;
        let mut shard = shard.lock().await;

        if shard.deleted {
            return Err(travel_option_not_found(draft.travel_option_id));
        }

        // Work on copies; nothing is written until every check passed.
        let mut seats = shard.option.seats;
        seats.reserve(draft.seats)?;
        let booking = Booking::confirm(draft, shard.option.price)?;

        shard.option.seats = seats;
        shard.bookings.insert(booking.booking_id.clone(), booking.clone());

        Ok(Reservation {
            booking,
            available_seats: seats.available_seats,
        })
    }
}

fn travel_option_not_found(id: Uuid) -> BookingError {
    BookingError::NotFound(format!("travel option {}", id))
}

fn booking_not_found(id: &BookingId) -> BookingError {
    BookingError::NotFound(format!("booking {}", id))
}

#[async_trait]
impl TravelOptionRepository for InMemoryStore {
    async fn insert_travel_option(&self, option: &TravelOption) -> CoreResult<()> {
        let mut catalog = self.catalog.write().await;

        if catalog.codes.contains_key(&option.travel_code) {
            return Err(BookingError::Conflict(format!(
                "travel code {} already exists",
                option.travel_code
            )));
        }
        if catalog.shards.contains_key(&option.id) {
            return Err(BookingError::Conflict(format!("travel option {} already exists", option.id)));
        }

        catalog.codes.insert(option.travel_code.clone(), option.id);
        catalog.shards.insert(
            option.id,
            Arc::new(Mutex::new(Shard {
                option: option.clone(),
                bookings: HashMap::new(),
                deleted: false,
            })),
        );

        Ok(())
    }

    async fn get_travel_option(&self, id: Uuid) -> CoreResult<Option<TravelOption>> {
        match self.shard(id).await {
            Some(shard) => {
                let shard = shard.lock().await;
                Ok((!shard.deleted).then(|| shard.option.clone()))
            }
            None => Ok(None),
        }
    }

    async fn list_travel_options(&self) -> CoreResult<Vec<TravelOption>> {
        let shards: Vec<_> = self.catalog.read().await.shards.values().cloned().collect();

        let mut options = Vec::with_capacity(shards.len());
        for shard in shards {
            let shard = shard.lock().await;
            if !shard.deleted {
                options.push(shard.option.clone());
            }
        }

        options.sort_by(|a, b| {
            a.departure_time
                .cmp(&b.departure_time)
                .then_with(|| a.travel_code.cmp(&b.travel_code))
        });
        Ok(options)
    }

    async fn update_price(&self, id: Uuid, price: Decimal) -> CoreResult<Option<TravelOption>> {
        let Some(shard) = self.shard(id).await else {
            return Ok(None);
        };
        let mut shard = shard.lock().await;

        if shard.deleted {
            return Ok(None);
        }

        shard.option.set_price(price)?;
        Ok(Some(shard.option.clone()))
    }

    async fn delete_travel_option(&self, id: Uuid) -> CoreResult<bool> {
        let mut catalog = self.catalog.write().await;

        let Some(shard) = catalog.shards.remove(&id) else {
            return Ok(false);
        };

        let booking_ids: Vec<BookingId> = {
            let mut shard = shard.lock().await;
            shard.deleted = true;
            catalog.codes.remove(&shard.option.travel_code);
            shard.bookings.drain().map(|(id, _)| id).collect()
        };

        let mut index = self.index.write().await;
        for booking_id in &booking_ids {
            index.remove(booking_id);
        }

        debug!("Deleted travel option {} with {} bookings", id, booking_ids.len());
        Ok(true)
    }
}

#[async_trait]
impl BookingRepository for InMemoryStore {
    async fn reserve(&self, draft: BookingDraft) -> CoreResult<Reservation> {
        let booking_id = draft.booking_id.clone();

        // Claim the id first so two shards can never commit the same one.
        match self.index.write().await.entry(booking_id.clone()) {
            Entry::Occupied(_) => {
                return Err(BookingError::DuplicateBookingId(booking_id.to_string()));
            }
            Entry::Vacant(slot) => {
                slot.insert(BookingLocator {
                    travel_option_id: draft.travel_option_id,
                    user_id: draft.user_id.clone(),
                });
            }
        }

        let result = self.reserve_in_shard(draft).await;
        if result.is_err() {
            self.index.write().await.remove(&booking_id);
        }
        result
    }

    async fn cancel(&self, user_id: &UserId, booking_id: &BookingId) -> CoreResult<Reservation> {
        let shard = self.locate(user_id, booking_id).await?;
        let mut shard = shard.lock().await;

        if shard.deleted {
            return Err(booking_not_found(booking_id));
        }

        let mut booking = shard
            .bookings
            .get(booking_id)
            .filter(|b| b.belongs_to(user_id))
            .cloned()
            .ok_or_else(|| booking_not_found(booking_id))?;

        booking.cancel()?;
        let mut seats = shard.option.seats;
        seats.release(booking.seats)?;

        shard.option.seats = seats;
        shard.bookings.insert(booking_id.clone(), booking.clone());

        Ok(Reservation {
            booking,
            available_seats: seats.available_seats,
        })
    }

    async fn get_booking(&self, user_id: &UserId, booking_id: &BookingId) -> CoreResult<Option<Booking>> {
        let shard = match self.locate(user_id, booking_id).await {
            Ok(shard) => shard,
            Err(BookingError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        let shard = shard.lock().await;

        Ok(shard
            .bookings
            .get(booking_id)
            .filter(|b| !shard.deleted && b.belongs_to(user_id))
            .cloned())
    }

    async fn list_bookings(&self, user_id: &UserId) -> CoreResult<Vec<Booking>> {
        let mut by_option: HashMap<Uuid, Vec<BookingId>> = HashMap::new();
        for (booking_id, locator) in self.index.read().await.iter() {
            if &locator.user_id == user_id {
                by_option
                    .entry(locator.travel_option_id)
                    .or_default()
                    .push(booking_id.clone());
            }
        }

        let mut bookings = Vec::new();
        for (option_id, booking_ids) in by_option {
            let Some(shard) = self.shard(option_id).await else {
                continue;
            };
            let shard = shard.lock().await;
            if shard.deleted {
                continue;
            }
            bookings.extend(
                booking_ids
                    .iter()
                    .filter_map(|id| shard.bookings.get(id))
                    .filter(|b| b.belongs_to(user_id))
                    .cloned(),
            );
        }

        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn remove_user(&self, user_id: &UserId) -> CoreResult<usize> {
        let mut by_option: HashMap<Uuid, Vec<BookingId>> = HashMap::new();
        for (booking_id, locator) in self.index.read().await.iter() {
            if &locator.user_id == user_id {
                by_option
                    .entry(locator.travel_option_id)
                    .or_default()
                    .push(booking_id.clone());
            }
        }

        let mut removed = 0;
        for (option_id, booking_ids) in by_option {
            let Some(shard) = self.shard(option_id).await else {
                continue;
            };
            let mut shard = shard.lock().await;
            if shard.deleted {
                continue;
            }

            // Validate the whole shard before touching it
            let mut seats = shard.option.seats;
            let owned: Vec<BookingId> = booking_ids
                .into_iter()
                .filter(|id| shard.bookings.get(id).is_some_and(|b| b.belongs_to(user_id)))
                .collect();
            for id in &owned {
                let booking = &shard.bookings[id];
                if booking.is_confirmed() {
                    seats.release(booking.seats)?;
                }
            }

            shard.option.seats = seats;
            for id in &owned {
                shard.bookings.remove(id);
            }

            // Index follows each committed shard, so a later failure leaves no stale ids
            let mut index = self.index.write().await;
            for id in &owned {
                index.remove(id);
            }
            removed += owned.len();
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use travelbook_catalog::{NewTravelOption, TravelType};
    use travelbook_core::BookingStatus;

    fn option(code: &str, seats: i32, price: &str) -> TravelOption {
        NewTravelOption {
            travel_code: code.to_string(),
            travel_type: TravelType::Bus,
            origin: "Miami".to_string(),
            destination: "Orlando".to_string(),
            departure_time: Utc::now() + Duration::hours(6),
            price: price.parse().unwrap(),
            seats,
        }
        .validate()
        .unwrap()
    }

    fn user(name: &str) -> UserId {
        UserId::new(name).unwrap()
    }

    #[tokio::test]
    async fn test_reserve_decrements_and_records() {
        let store = InMemoryStore::new();
        let bus = option("BUS001", 40, "45.00");
        store.insert_travel_option(&bus).await.unwrap();

        let draft = BookingDraft::new(user("alice"), bus.id, 2).unwrap();
        let reservation = store.reserve(draft.clone()).await.unwrap();

        assert_eq!(reservation.available_seats, 38);
        assert_eq!(reservation.booking.total_price, "90.00".parse::<Decimal>().unwrap());
        assert_eq!(store.get_travel_option(bus.id).await.unwrap().unwrap().available_seats(), 38);
        assert_eq!(
            store.get_booking(&user("alice"), &draft.booking_id).await.unwrap(),
            Some(reservation.booking)
        );
    }

    #[tokio::test]
    async fn test_duplicate_booking_id_leaves_no_trace() {
        let store = InMemoryStore::new();
        let bus = option("BUS001", 10, "45.00");
        store.insert_travel_option(&bus).await.unwrap();

        let draft = BookingDraft::new(user("alice"), bus.id, 1).unwrap();
        store.reserve(draft.clone()).await.unwrap();

        let err = store.reserve(draft).await.unwrap_err();
        assert!(matches!(err, BookingError::DuplicateBookingId(_)));
        assert_eq!(store.get_travel_option(bus.id).await.unwrap().unwrap().available_seats(), 9);
        assert_eq!(store.list_bookings(&user("alice")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_reserve_releases_claimed_id() {
        let store = InMemoryStore::new();
        let bus = option("BUS001", 1, "45.00");
        store.insert_travel_option(&bus).await.unwrap();

        let draft = BookingDraft::new(user("alice"), bus.id, 2).unwrap();
        let err = store.reserve(draft.clone()).await.unwrap_err();
        assert_eq!(err, BookingError::InsufficientInventory { requested: 2, available: 1 });

        // The id is free again once the failed attempt is rolled back
        let mut retry = draft;
        retry.seats = 1;
        store.reserve(retry).await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_travel_option() {
        let store = InMemoryStore::new();
        let draft = BookingDraft::new(user("alice"), Uuid::new_v4(), 1).unwrap();

        assert!(matches!(store.reserve(draft).await, Err(BookingError::NotFound(_))));
        assert!(store.index.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_is_scoped_to_owner() {
        let store = InMemoryStore::new();
        let bus = option("BUS001", 5, "10.00");
        store.insert_travel_option(&bus).await.unwrap();

        let booking = store
            .reserve(BookingDraft::new(user("alice"), bus.id, 3).unwrap())
            .await
            .unwrap()
            .booking;

        let err = store.cancel(&user("mallory"), &booking.booking_id).await.unwrap_err();
        assert!(matches!(err, BookingError::NotFound(_)));
        assert_eq!(store.get_booking(&user("mallory"), &booking.booking_id).await.unwrap(), None);

        let cancelled = store.cancel(&user("alice"), &booking.booking_id).await.unwrap();
        assert_eq!(cancelled.booking.status, BookingStatus::Cancelled);
        assert_eq!(cancelled.available_seats, 5);

        let err = store.cancel(&user("alice"), &booking.booking_id).await.unwrap_err();
        assert!(matches!(err, BookingError::InvalidState(_)));
        assert_eq!(store.get_travel_option(bus.id).await.unwrap().unwrap().available_seats(), 5);
    }

    #[tokio::test]
    async fn test_duplicate_travel_code_conflicts() {
        let store = InMemoryStore::new();
        store.insert_travel_option(&option("TR001", 5, "10.00")).await.unwrap();

        let err = store.insert_travel_option(&option("TR001", 8, "12.00")).await.unwrap_err();
        assert!(matches!(err, BookingError::Conflict(_)));
        assert_eq!(store.list_travel_options().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_cascades_to_bookings() {
        let store = InMemoryStore::new();
        let bus = option("BUS001", 5, "10.00");
        store.insert_travel_option(&bus).await.unwrap();
        let booking = store
            .reserve(BookingDraft::new(user("alice"), bus.id, 1).unwrap())
            .await
            .unwrap()
            .booking;

        assert!(store.delete_travel_option(bus.id).await.unwrap());
        assert!(!store.delete_travel_option(bus.id).await.unwrap());

        assert_eq!(store.get_travel_option(bus.id).await.unwrap(), None);
        assert_eq!(store.get_booking(&user("alice"), &booking.booking_id).await.unwrap(), None);
        assert!(store.list_bookings(&user("alice")).await.unwrap().is_empty());

        // The code can be reused once the option is gone
        store.insert_travel_option(&option("BUS001", 5, "10.00")).await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_user_returns_held_seats() {
        let store = InMemoryStore::new();
        let bus = option("BUS001", 10, "10.00");
        store.insert_travel_option(&bus).await.unwrap();

        let kept = store
            .reserve(BookingDraft::new(user("bob"), bus.id, 2).unwrap())
            .await
            .unwrap()
            .booking;
        store.reserve(BookingDraft::new(user("alice"), bus.id, 3).unwrap()).await.unwrap();
        let cancelled = store
            .reserve(BookingDraft::new(user("alice"), bus.id, 4).unwrap())
            .await
            .unwrap()
            .booking;
        store.cancel(&user("alice"), &cancelled.booking_id).await.unwrap();
        assert_eq!(store.get_travel_option(bus.id).await.unwrap().unwrap().available_seats(), 5);

        assert_eq!(store.remove_user(&user("alice")).await.unwrap(), 2);

        assert_eq!(store.get_travel_option(bus.id).await.unwrap().unwrap().available_seats(), 8);
        assert!(store.list_bookings(&user("alice")).await.unwrap().is_empty());
        assert_eq!(store.list_bookings(&user("bob")).await.unwrap(), vec![kept]);
    }

    #[tokio::test]
    async fn test_remove_user_keeps_index_in_step_with_shards() {
        let store = InMemoryStore::new();
        let bus = option("BUS001", 10, "10.00");
        let coach = option("BUS002", 10, "10.00");
        store.insert_travel_option(&bus).await.unwrap();
        store.insert_travel_option(&coach).await.unwrap();

        let on_bus = store
            .reserve(BookingDraft::new(user("alice"), bus.id, 2).unwrap())
            .await
            .unwrap()
            .booking;
        let on_coach = store
            .reserve(BookingDraft::new(user("alice"), coach.id, 3).unwrap())
            .await
            .unwrap()
            .booking;

        // Counters that can no longer take the seats back
        let coach_shard = store.shard(coach.id).await.unwrap();
        coach_shard.lock().await.option.seats.available_seats = 10;

        let err = store.remove_user(&user("alice")).await.unwrap_err();
        assert!(matches!(err, BookingError::InvalidState(_)));

        // The coach booking survives; the bus booking may or may not have gone
        // first, but the index must agree with the shard either way.
        assert!(store.index.read().await.contains_key(&on_coach.booking_id));
        assert!(store.get_booking(&user("alice"), &on_coach.booking_id).await.unwrap().is_some());
        let bus_indexed = store.index.read().await.contains_key(&on_bus.booking_id);
        let bus_stored = store.shard(bus.id).await.unwrap().lock().await.bookings.contains_key(&on_bus.booking_id);
        assert_eq!(bus_indexed, bus_stored);

        coach_shard.lock().await.option.seats.available_seats = 7;
        let second = store.remove_user(&user("alice")).await.unwrap();
        assert_eq!(second, if bus_stored { 2 } else { 1 });

        assert!(store.index.read().await.is_empty());
        assert!(store.list_bookings(&user("alice")).await.unwrap().is_empty());
        assert_eq!(store.get_travel_option(bus.id).await.unwrap().unwrap().available_seats(), 10);
        assert_eq!(store.get_travel_option(coach.id).await.unwrap().unwrap().available_seats(), 10);
    }

    #[tokio::test]
    async fn test_lists_are_ordered() {
        let store = InMemoryStore::new();
        let mut later = option("BUS002", 5, "10.00");
        later.departure_time = Utc::now() + Duration::days(3);
        let sooner = option("BUS001", 5, "10.00");
        store.insert_travel_option(&later).await.unwrap();
        store.insert_travel_option(&sooner).await.unwrap();

        let codes: Vec<_> = store
            .list_travel_options()
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.travel_code)
            .collect();
        assert_eq!(codes, vec!["BUS001", "BUS002"]);

        let mut first = BookingDraft::new(user("alice"), sooner.id, 1).unwrap();
        first.requested_at = Utc::now() - Duration::minutes(5);
        let second = BookingDraft::new(user("alice"), later.id, 1).unwrap();
        store.reserve(first.clone()).await.unwrap();
        store.reserve(second.clone()).await.unwrap();

        let ids: Vec<_> = store
            .list_bookings(&user("alice"))
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.booking_id)
            .collect();
        assert_eq!(ids, vec![second.booking_id, first.booking_id]);
    }
}
