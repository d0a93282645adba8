use async_trait::async_trait;
use crate::models::{
    Booking, BookingId, BookingWithRoom, Enrollment, EnrollmentId, Room, RoomId, Ticket, UserId,
};

pub type StoreError = Box<dyn std::error::Error + Send + Sync>;
pub type StoreResult<T> = Result<T, StoreError>;

/// Result of a capacity-guarded write.
///
/// The store recounts the target room's bookings and writes in one atomic
/// step, so a room can never be pushed past its capacity by two callers that
/// both passed an earlier count.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome<T> {
    Written(T),
    /// The room reached capacity before the write could land.
    RoomFull,
    /// The room (or, for moves, the booking) no longer exists.
    Missing,
}

/// Data access for the booking core.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn find_booking_by_id(&self, booking_id: BookingId) -> StoreResult<Option<Booking>>;

    /// The user's single booking, with its room attached.
    async fn find_active_booking_for_user(
        &self,
        user_id: UserId,
    ) -> StoreResult<Option<BookingWithRoom>>;

    /// Inserts a booking for `user_id` in `room_id` if the room still has a free slot.
    async fn create_booking_record(
        &self,
        user_id: UserId,
        room_id: RoomId,
    ) -> StoreResult<WriteOutcome<Booking>>;

    /// Points `booking_id` at `room_id` if the room still has a free slot.
    /// The moved booking counts towards the target room's occupancy.
    async fn update_booking_room(
        &self,
        booking_id: BookingId,
        room_id: RoomId,
    ) -> StoreResult<WriteOutcome<Booking>>;

    async fn find_room_by_id(&self, room_id: RoomId) -> StoreResult<Option<Room>>;

    async fn count_bookings_for_room(&self, room_id: RoomId) -> StoreResult<i64>;

    /// The user's enrollment, with its address.
    async fn find_enrollment_by_user_id(&self, user_id: UserId)
        -> StoreResult<Option<Enrollment>>;

    /// The enrollment's ticket, with its ticket type.
    async fn find_ticket_by_enrollment_id(
        &self,
        enrollment_id: EnrollmentId,
    ) -> StoreResult<Option<Ticket>>;
}
