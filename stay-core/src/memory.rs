use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::models::{
    Address, Booking, BookingId, BookingWithRoom, Enrollment, EnrollmentId, Hotel, Room, RoomId,
    Ticket, TicketStatus, TicketType, UserId,
};
use crate::repository::{BookingStore, StoreResult, WriteOutcome};

#[derive(Default)]
struct Tables {
    next_id: i32,
    hotels: HashMap<i32, Hotel>,
    rooms: HashMap<RoomId, Room>,
    bookings: HashMap<BookingId, Booking>,
    enrollments: HashMap<EnrollmentId, Enrollment>,
    tickets: HashMap<i32, Ticket>,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn occupancy(&self, room_id: RoomId) -> i64 {
        self.bookings.values().filter(|b| b.room_id == room_id).count() as i64
    }
}

/// In-memory store used by tests and local runs.
///
/// Every operation holds one lock over all tables, which makes the guarded
/// writes atomic.
#[derive(Default)]
pub struct InMemoryBookingStore {
    tables: Mutex<Tables>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_hotel(&self, name: &str) -> Hotel {
        let mut t = self.tables.lock().await;
        let hotel = Hotel {
            id: t.next_id(),
            name: name.to_string(),
            image: format!("https://images.example.com/{}.png", name.to_lowercase().replace(' ', "-")),
        };
        t.hotels.insert(hotel.id, hotel.clone());
        hotel
    }

    pub async fn add_room(&self, hotel_id: i32, name: &str, capacity: i32) -> Room {
        let mut t = self.tables.lock().await;
        let now = Utc::now();
        let room = Room {
            id: t.next_id(),
            name: name.to_string(),
            capacity,
            hotel_id,
            created_at: now,
            updated_at: now,
        };
        t.rooms.insert(room.id, room.clone());
        room
    }

    pub async fn add_enrollment(&self, user_id: UserId) -> Enrollment {
        let mut t = self.tables.lock().await;
        let id = t.next_id();
        let enrollment = Enrollment {
            id,
            user_id,
            name: format!("User {}", user_id),
            cpf: format!("{:011}", user_id),
            phone: "(21) 98999-9999".to_string(),
            address: Some(Address {
                id: t.next_id(),
                cep: "22250-040".to_string(),
                street: "Rua Voluntarios da Patria".to_string(),
                city: "Rio de Janeiro".to_string(),
                state: "RJ".to_string(),
                number: "45".to_string(),
                neighborhood: "Botafogo".to_string(),
                address_detail: None,
            }),
        };
        t.enrollments.insert(id, enrollment.clone());
        enrollment
    }

    pub async fn add_ticket(
        &self,
        enrollment_id: EnrollmentId,
        status: TicketStatus,
        ticket_type: TicketType,
    ) -> Ticket {
        let mut t = self.tables.lock().await;
        let ticket = Ticket {
            id: t.next_id(),
            enrollment_id,
            status,
            ticket_type,
        };
        t.tickets.insert(ticket.id, ticket.clone());
        ticket
    }

    /// Inserts a booking without any capacity check, for seeding fixtures.
    pub async fn insert_booking(&self, user_id: UserId, room_id: RoomId) -> Booking {
        let mut t = self.tables.lock().await;
        let now = Utc::now();
        let booking = Booking {
            id: t.next_id(),
            user_id,
            room_id,
            created_at: now,
            updated_at: now,
        };
        t.bookings.insert(booking.id, booking.clone());
        booking
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn find_booking_by_id(&self, booking_id: BookingId) -> StoreResult<Option<Booking>> {
        let t = self.tables.lock().await;
        Ok(t.bookings.get(&booking_id).cloned())
    }

    async fn find_active_booking_for_user(
        &self,
        user_id: UserId,
    ) -> StoreResult<Option<BookingWithRoom>> {
        let t = self.tables.lock().await;
        let booking = t
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .min_by_key(|b| b.id);

        Ok(booking.and_then(|b| {
            t.rooms.get(&b.room_id).map(|room| BookingWithRoom {
                id: b.id,
                user_id: b.user_id,
                room: room.clone(),
                created_at: b.created_at,
                updated_at: b.updated_at,
            })
        }))
    }

    async fn create_booking_record(
        &self,
        user_id: UserId,
        room_id: RoomId,
    ) -> StoreResult<WriteOutcome<Booking>> {
        let mut t = self.tables.lock().await;
        let Some(capacity) = t.rooms.get(&room_id).map(|r| r.capacity) else {
            return Ok(WriteOutcome::Missing);
        };
        if t.occupancy(room_id) >= i64::from(capacity) {
            return Ok(WriteOutcome::RoomFull);
        }

        let now = Utc::now();
        let booking = Booking {
            id: t.next_id(),
            user_id,
            room_id,
            created_at: now,
            updated_at: now,
        };
        t.bookings.insert(booking.id, booking.clone());
        Ok(WriteOutcome::Written(booking))
    }

    async fn update_booking_room(
        &self,
        booking_id: BookingId,
        room_id: RoomId,
    ) -> StoreResult<WriteOutcome<Booking>> {
        let mut t = self.tables.lock().await;
        let Some(capacity) = t.rooms.get(&room_id).map(|r| r.capacity) else {
            return Ok(WriteOutcome::Missing);
        };
        if !t.bookings.contains_key(&booking_id) {
            return Ok(WriteOutcome::Missing);
        }
        if t.occupancy(room_id) >= i64::from(capacity) {
            return Ok(WriteOutcome::RoomFull);
        }

        let Some(booking) = t.bookings.get_mut(&booking_id) else {
            return Ok(WriteOutcome::Missing);
        };
        booking.room_id = room_id;
        booking.updated_at = Utc::now();
        Ok(WriteOutcome::Written(booking.clone()))
    }

    async fn find_room_by_id(&self, room_id: RoomId) -> StoreResult<Option<Room>> {
        let t = self.tables.lock().await;
        Ok(t.rooms.get(&room_id).cloned())
    }

    async fn count_bookings_for_room(&self, room_id: RoomId) -> StoreResult<i64> {
        let t = self.tables.lock().await;
        Ok(t.occupancy(room_id))
    }

    async fn find_enrollment_by_user_id(
        &self,
        user_id: UserId,
    ) -> StoreResult<Option<Enrollment>> {
        let t = self.tables.lock().await;
        Ok(t.enrollments.values().find(|e| e.user_id == user_id).cloned())
    }

    async fn find_ticket_by_enrollment_id(
        &self,
        enrollment_id: EnrollmentId,
    ) -> StoreResult<Option<Ticket>> {
        let t = self.tables.lock().await;
        Ok(t.tickets.values().find(|tk| tk.enrollment_id == enrollment_id).cloned())
    }
}
