use std::sync::Arc;
use tracing::{debug, info};

use crate::models::{Booking, BookingId, BookingWithRoom, Room, RoomId, Ticket, TicketStatus, UserId};
use crate::repository::{BookingStore, WriteOutcome};
use crate::{BookingError, BookingResult, ConflictReason, Resource};

/// Enforces ticket eligibility and room capacity for hotel bookings.
#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn BookingStore>,
}

impl BookingService {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    /// The caller's current booking with its room.
    pub async fn get_booking_for_user(&self, user_id: UserId) -> BookingResult<BookingWithRoom> {
        self.store
            .find_active_booking_for_user(user_id)
            .await?
            .ok_or(BookingError::NotFound(Resource::Booking))
    }

    /// Books `room_id` for `user_id`.
    ///
    /// Checks run in a fixed order and stop at the first failure: room exists,
    /// room has a vacancy, user is enrolled, user holds a hotel-eligible ticket.
    /// Any booking the user already has is left untouched.
    pub async fn create_booking(&self, user_id: UserId, room_id: RoomId) -> BookingResult<Booking> {
        let room = self.ensure_vacancy(room_id).await?;

        let enrollment = self
            .store
            .find_enrollment_by_user_id(user_id)
            .await?
            .ok_or(BookingError::NotFound(Resource::Enrollment))?;

        let ticket = self.store.find_ticket_by_enrollment_id(enrollment.id).await?;
        if let Err(reason) = check_hotel_eligibility(ticket.as_ref()) {
            debug!(user_id, room_id, %reason, "booking rejected");
            return Err(BookingError::Conflict(reason));
        }

        let booking = written(self.store.create_booking_record(user_id, room.id).await?)?;
        info!(booking_id = booking.id, user_id, room_id, "booking created");
        Ok(booking)
    }

    /// Moves `booking_id` into `room_id`.
    ///
    /// Ticket eligibility is not re-checked and `user_id` is not matched
    /// against the booking's owner. The booking being moved counts towards the
    /// target room's occupancy, so moving into the room it already fills is
    /// rejected once that room is full.
    pub async fn update_booking(
        &self,
        user_id: UserId,
        room_id: RoomId,
        booking_id: BookingId,
    ) -> BookingResult<Booking> {
        let room = self.ensure_vacancy(room_id).await?;

        let current = self
            .store
            .find_booking_by_id(booking_id)
            .await?
            .ok_or(BookingError::NotFound(Resource::Booking))?;

        let booking = written(self.store.update_booking_room(booking_id, room.id).await?)?;
        info!(
            booking_id,
            user_id,
            from_room = current.room_id,
            to_room = room_id,
            "booking moved"
        );
        Ok(booking)
    }

    async fn ensure_vacancy(&self, room_id: RoomId) -> BookingResult<Room> {
        let room = self
            .store
            .find_room_by_id(room_id)
            .await?
            .ok_or(BookingError::NotFound(Resource::Room))?;

        let occupied = self.store.count_bookings_for_room(room_id).await?;
        if room.is_full(occupied) {
            debug!(room_id, occupied, capacity = room.capacity, "room full");
            return Err(BookingError::Conflict(ConflictReason::RoomFull));
        }

        Ok(room)
    }
}

/// A ticket grants a room only if it is paid for, includes hotel and is not remote.
pub fn check_hotel_eligibility(ticket: Option<&Ticket>) -> Result<(), ConflictReason> {
    let ticket = ticket.ok_or(ConflictReason::NoTicket)?;
    if ticket.status != TicketStatus::Paid {
        return Err(ConflictReason::TicketNotPaid);
    }
    if !ticket.ticket_type.includes_hotel {
        return Err(ConflictReason::HotelNotIncluded);
    }
    if ticket.ticket_type.is_remote {
        return Err(ConflictReason::RemoteTicket);
    }
    Ok(())
}

fn written(outcome: WriteOutcome<Booking>) -> BookingResult<Booking> {
    match outcome {
        WriteOutcome::Written(booking) => Ok(booking),
        WriteOutcome::RoomFull => Err(BookingError::Conflict(ConflictReason::RoomFull)),
        // Row deleted between the read checks and the write.
        WriteOutcome::Missing => Err(BookingError::NotFound(Resource::Room)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBookingStore;
    use crate::models::TicketType;

    fn hotel_ticket_type() -> TicketType {
        TicketType {
            id: 1,
            name: "Presencial + Hotel".to_string(),
            price: 600,
            is_remote: false,
            includes_hotel: true,
        }
    }

    async fn eligible_user(store: &InMemoryBookingStore, user_id: UserId) {
        let enrollment = store.add_enrollment(user_id).await;
        store
            .add_ticket(enrollment.id, TicketStatus::Paid, hotel_ticket_type())
            .await;
    }

    fn service(store: &Arc<InMemoryBookingStore>) -> BookingService {
        BookingService::new(store.clone())
    }

    #[tokio::test]
    async fn test_get_booking_not_found_without_booking() {
        let store = Arc::new(InMemoryBookingStore::new());
        eligible_user(&store, 1).await;

        let err = service(&store).get_booking_for_user(1).await.unwrap_err();
        assert!(matches!(err, BookingError::NotFound(Resource::Booking)));
    }

    #[tokio::test]
    async fn test_get_booking_returns_room() {
        let store = Arc::new(InMemoryBookingStore::new());
        let hotel = store.add_hotel("Driven Resort").await;
        let room = store.add_room(hotel.id, "101", 3).await;
        let booking = store.insert_booking(1, room.id).await;

        let found = service(&store).get_booking_for_user(1).await.unwrap();
        assert_eq!(found.id, booking.id);
        assert_eq!(found.room, room);
    }

    #[tokio::test]
    async fn test_create_unknown_room_is_not_found() {
        let store = Arc::new(InMemoryBookingStore::new());
        eligible_user(&store, 1).await;

        let err = service(&store).create_booking(1, 999).await.unwrap_err();
        assert!(matches!(err, BookingError::NotFound(Resource::Room)));
    }

    #[tokio::test]
    async fn test_create_in_full_room_conflicts() {
        let store = Arc::new(InMemoryBookingStore::new());
        let hotel = store.add_hotel("Driven Resort").await;
        let room = store.add_room(hotel.id, "1020", 2).await;
        store.insert_booking(10, room.id).await;
        store.insert_booking(11, room.id).await;
        eligible_user(&store, 1).await;

        let err = service(&store).create_booking(1, room.id).await.unwrap_err();
        assert!(matches!(err, BookingError::Conflict(ConflictReason::RoomFull)));
    }

    #[tokio::test]
    async fn test_room_check_precedes_enrollment_check() {
        let store = Arc::new(InMemoryBookingStore::new());
        let hotel = store.add_hotel("Driven Resort").await;
        let room = store.add_room(hotel.id, "1020", 1).await;
        store.insert_booking(10, room.id).await;

        // No enrollment either, but the full room is reported first.
        let err = service(&store).create_booking(1, room.id).await.unwrap_err();
        assert!(matches!(err, BookingError::Conflict(ConflictReason::RoomFull)));
    }

    #[tokio::test]
    async fn test_create_books_room_for_eligible_user() {
        let store = Arc::new(InMemoryBookingStore::new());
        let hotel = store.add_hotel("Driven Resort").await;
        let room = store.add_room(hotel.id, "101", 3).await;
        store.insert_booking(10, room.id).await;
        eligible_user(&store, 1).await;

        let before = store.count_bookings_for_room(room.id).await.unwrap();
        let booking = service(&store).create_booking(1, room.id).await.unwrap();

        assert_eq!(booking.user_id, 1);
        assert_eq!(booking.room_id, room.id);
        assert_eq!(store.count_bookings_for_room(room.id).await.unwrap(), before + 1);
    }

    #[tokio::test]
    async fn test_create_without_enrollment_is_not_found() {
        let store = Arc::new(InMemoryBookingStore::new());
        let hotel = store.add_hotel("Driven Resort").await;
        let room = store.add_room(hotel.id, "101", 3).await;

        let err = service(&store).create_booking(1, room.id).await.unwrap_err();
        assert!(matches!(err, BookingError::NotFound(Resource::Enrollment)));
    }

    #[tokio::test]
    async fn test_create_rejects_ineligible_tickets() {
        let cases = [
            (TicketStatus::Reserved, false, true, ConflictReason::TicketNotPaid),
            (TicketStatus::Paid, false, false, ConflictReason::HotelNotIncluded),
            (TicketStatus::Paid, true, true, ConflictReason::RemoteTicket),
        ];

        for (status, is_remote, includes_hotel, expected) in cases {
            let store = Arc::new(InMemoryBookingStore::new());
            let hotel = store.add_hotel("Driven Resort").await;
            let room = store.add_room(hotel.id, "101", 3).await;
            let enrollment = store.add_enrollment(1).await;
            let ticket_type = TicketType {
                is_remote,
                includes_hotel,
                ..hotel_ticket_type()
            };
            store.add_ticket(enrollment.id, status, ticket_type).await;

            let err = service(&store).create_booking(1, room.id).await.unwrap_err();
            assert!(
                matches!(err, BookingError::Conflict(reason) if reason == expected),
                "expected {:?}, got {:?}",
                expected,
                err
            );
            assert_eq!(store.count_bookings_for_room(room.id).await.unwrap(), 0);
        }
    }

    #[tokio::test]
    async fn test_create_without_ticket_conflicts() {
        let store = Arc::new(InMemoryBookingStore::new());
        let hotel = store.add_hotel("Driven Resort").await;
        let room = store.add_room(hotel.id, "101", 3).await;
        store.add_enrollment(1).await;

        let err = service(&store).create_booking(1, room.id).await.unwrap_err();
        assert!(matches!(err, BookingError::Conflict(ConflictReason::NoTicket)));
    }

    #[tokio::test]
    async fn test_last_slot_goes_to_first_user() {
        let store = Arc::new(InMemoryBookingStore::new());
        let hotel = store.add_hotel("Driven Resort").await;
        let room = store.add_room(hotel.id, "single", 1).await;
        eligible_user(&store, 1).await;
        eligible_user(&store, 2).await;
        let svc = service(&store);

        svc.create_booking(1, room.id).await.unwrap();
        let err = svc.create_booking(2, room.id).await.unwrap_err();
        assert!(matches!(err, BookingError::Conflict(ConflictReason::RoomFull)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_never_overfill_room() {
        let store = Arc::new(InMemoryBookingStore::new());
        let hotel = store.add_hotel("Driven Resort").await;
        let room = store.add_room(hotel.id, "single", 1).await;
        for user_id in 1..=8 {
            eligible_user(&store, user_id).await;
        }
        let svc = service(&store);
        let room_id = room.id;

        let handles: Vec<_> = (1..=8)
            .map(|user_id| {
                let svc = svc.clone();
                tokio::spawn(async move { svc.create_booking(user_id, room_id).await })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(BookingError::Conflict(ConflictReason::RoomFull)) => {}
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }

        assert_eq!(created, 1);
        assert_eq!(store.count_bookings_for_room(room_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_unknown_room_is_not_found() {
        let store = Arc::new(InMemoryBookingStore::new());
        let hotel = store.add_hotel("Driven Resort").await;
        let room = store.add_room(hotel.id, "101", 3).await;
        let booking = store.insert_booking(1, room.id).await;

        let err = service(&store).update_booking(1, 0, booking.id).await.unwrap_err();
        assert!(matches!(err, BookingError::NotFound(Resource::Room)));
    }

    #[tokio::test]
    async fn test_update_into_full_room_conflicts() {
        let store = Arc::new(InMemoryBookingStore::new());
        let hotel = store.add_hotel("Driven Resort").await;
        let full = store.add_room(hotel.id, "1020", 1).await;
        let other = store.add_room(hotel.id, "1021", 1).await;
        store.insert_booking(10, full.id).await;
        let booking = store.insert_booking(1, other.id).await;

        let err = service(&store)
            .update_booking(1, full.id, booking.id)
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Conflict(ConflictReason::RoomFull)));
        assert_eq!(store.find_booking_by_id(booking.id).await.unwrap().unwrap().room_id, other.id);
    }

    #[tokio::test]
    async fn test_update_moves_booking_and_keeps_id() {
        let store = Arc::new(InMemoryBookingStore::new());
        let hotel = store.add_hotel("Driven Resort").await;
        let from = store.add_room(hotel.id, "101", 2).await;
        let to = store.add_room(hotel.id, "102", 2).await;
        let booking = store.insert_booking(1, from.id).await;

        let moved = service(&store).update_booking(1, to.id, booking.id).await.unwrap();

        assert_eq!(moved.id, booking.id);
        assert_eq!(moved.room_id, to.id);
        assert_eq!(store.count_bookings_for_room(from.id).await.unwrap(), 0);
        assert_eq!(store.count_bookings_for_room(to.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_does_not_recheck_eligibility() {
        let store = Arc::new(InMemoryBookingStore::new());
        let hotel = store.add_hotel("Driven Resort").await;
        let from = store.add_room(hotel.id, "101", 2).await;
        let to = store.add_room(hotel.id, "102", 2).await;
        // Booking owned by user 1, moved by user 2 who has no enrollment.
        let booking = store.insert_booking(1, from.id).await;

        let moved = service(&store).update_booking(2, to.id, booking.id).await.unwrap();
        assert_eq!(moved.user_id, 1);
        assert_eq!(moved.room_id, to.id);
    }

    #[tokio::test]
    async fn test_update_within_own_full_room_conflicts() {
        let store = Arc::new(InMemoryBookingStore::new());
        let hotel = store.add_hotel("Driven Resort").await;
        let room = store.add_room(hotel.id, "single", 1).await;
        let booking = store.insert_booking(1, room.id).await;

        let err = service(&store)
            .update_booking(1, room.id, booking.id)
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Conflict(ConflictReason::RoomFull)));
    }

    #[tokio::test]
    async fn test_update_unknown_booking_is_not_found() {
        let store = Arc::new(InMemoryBookingStore::new());
        let hotel = store.add_hotel("Driven Resort").await;
        let room = store.add_room(hotel.id, "101", 2).await;

        let err = service(&store).update_booking(1, room.id, 42).await.unwrap_err();
        assert!(matches!(err, BookingError::NotFound(Resource::Booking)));
    }

    #[test]
    fn test_eligibility_order() {
        let ticket = Ticket {
            id: 1,
            enrollment_id: 1,
            status: TicketStatus::Reserved,
            ticket_type: TicketType {
                is_remote: true,
                includes_hotel: false,
                ..hotel_ticket_type()
            },
        };
        assert_eq!(check_hotel_eligibility(None), Err(ConflictReason::NoTicket));
        assert_eq!(check_hotel_eligibility(Some(&ticket)), Err(ConflictReason::TicketNotPaid));
    }
}
