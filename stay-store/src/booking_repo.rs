use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use stay_core::models::{
    Address, Booking, BookingId, BookingWithRoom, Enrollment, EnrollmentId, Room, RoomId, Ticket,
    TicketStatus, TicketType, UserId,
};
use stay_core::repository::{BookingStore, StoreResult, WriteOutcome};

/// Postgres-backed booking store.
///
/// Guarded writes lock the target room row (`FOR UPDATE`) before recounting,
/// so concurrent writers into the same room are serialized.
#[derive(Clone)]
pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct BookingRow {
    id: i32,
    user_id: i32,
    room_id: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        Booking {
            id: row.id,
            user_id: row.user_id,
            room_id: row.room_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RoomRow {
    id: i32,
    name: String,
    capacity: i32,
    hotel_id: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RoomRow> for Room {
    fn from(row: RoomRow) -> Self {
        Room {
            id: row.id,
            name: row.name,
            capacity: row.capacity,
            hotel_id: row.hotel_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BookingWithRoomRow {
    id: i32,
    user_id: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    room_id: i32,
    room_name: String,
    room_capacity: i32,
    room_hotel_id: i32,
    room_created_at: DateTime<Utc>,
    room_updated_at: DateTime<Utc>,
}

impl From<BookingWithRoomRow> for BookingWithRoom {
    fn from(row: BookingWithRoomRow) -> Self {
        BookingWithRoom {
            id: row.id,
            user_id: row.user_id,
            room: Room {
                id: row.room_id,
                name: row.room_name,
                capacity: row.room_capacity,
                hotel_id: row.room_hotel_id,
                created_at: row.room_created_at,
                updated_at: row.room_updated_at,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct EnrollmentRow {
    id: i32,
    user_id: i32,
    name: String,
    cpf: String,
    phone: String,
    address_id: Option<i32>,
    cep: Option<String>,
    street: Option<String>,
    city: Option<String>,
    state: Option<String>,
    number: Option<String>,
    neighborhood: Option<String>,
    address_detail: Option<String>,
}

impl From<EnrollmentRow> for Enrollment {
    fn from(row: EnrollmentRow) -> Self {
        // Every address column is NOT NULL, so a present id means a full row.
        let address = row.address_id.map(|id| Address {
            id,
            cep: row.cep.unwrap_or_default(),
            street: row.street.unwrap_or_default(),
            city: row.city.unwrap_or_default(),
            state: row.state.unwrap_or_default(),
            number: row.number.unwrap_or_default(),
            neighborhood: row.neighborhood.unwrap_or_default(),
            address_detail: row.address_detail,
        });

        Enrollment {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            cpf: row.cpf,
            phone: row.phone,
            address,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TicketRow {
    id: i32,
    enrollment_id: i32,
    status: String,
    ticket_type_id: i32,
    ticket_type_name: String,
    price: i32,
    is_remote: bool,
    includes_hotel: bool,
}

impl TryFrom<TicketRow> for Ticket {
    type Error = stay_core::models::UnknownTicketStatus;

    fn try_from(row: TicketRow) -> Result<Self, Self::Error> {
        Ok(Ticket {
            id: row.id,
            enrollment_id: row.enrollment_id,
            status: row.status.parse::<TicketStatus>()?,
            ticket_type: TicketType {
                id: row.ticket_type_id,
                name: row.ticket_type_name,
                price: row.price,
                is_remote: row.is_remote,
                includes_hotel: row.includes_hotel,
            },
        })
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn find_booking_by_id(&self, booking_id: BookingId) -> StoreResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(
            "SELECT id, user_id, room_id, created_at, updated_at FROM bookings WHERE id = $1",
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Booking::from))
    }

    async fn find_active_booking_for_user(
        &self,
        user_id: UserId,
    ) -> StoreResult<Option<BookingWithRoom>> {
        let row = sqlx::query_as::<_, BookingWithRoomRow>(
            r#"
            SELECT b.id, b.user_id, b.created_at, b.updated_at,
                   r.id AS room_id, r.name AS room_name, r.capacity AS room_capacity,
                   r.hotel_id AS room_hotel_id, r.created_at AS room_created_at,
                   r.updated_at AS room_updated_at
            FROM bookings b
            JOIN rooms r ON r.id = b.room_id
            WHERE b.user_id = $1
            ORDER BY b.id
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(BookingWithRoom::from))
    }

    async fn create_booking_record(
        &self,
        user_id: UserId,
        room_id: RoomId,
    ) -> StoreResult<WriteOutcome<Booking>> {
        let mut tx = self.pool.begin().await?;

        let capacity: Option<i32> =
            sqlx::query_scalar("SELECT capacity FROM rooms WHERE id = $1 FOR UPDATE")
                .bind(room_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(capacity) = capacity else {
            return Ok(WriteOutcome::Missing);
        };

        let occupied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE room_id = $1")
            .bind(room_id)
            .fetch_one(&mut *tx)
            .await?;
        if occupied >= i64::from(capacity) {
            return Ok(WriteOutcome::RoomFull);
        }

        let row = sqlx::query_as::<_, BookingRow>(
            r#"
            INSERT INTO bookings (user_id, room_id)
            VALUES ($1, $2)
            RETURNING id, user_id, room_id, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(room_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(WriteOutcome::Written(row.into()))
    }

    async fn update_booking_room(
        &self,
        booking_id: BookingId,
        room_id: RoomId,
    ) -> StoreResult<WriteOutcome<Booking>> {
        let mut tx = self.pool.begin().await?;

        let capacity: Option<i32> =
            sqlx::query_scalar("SELECT capacity FROM rooms WHERE id = $1 FOR UPDATE")
                .bind(room_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(capacity) = capacity else {
            return Ok(WriteOutcome::Missing);
        };

        let exists: Option<i32> =
            sqlx::query_scalar("SELECT id FROM bookings WHERE id = $1 FOR UPDATE")
                .bind(booking_id)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Ok(WriteOutcome::Missing);
        }

        let occupied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE room_id = $1")
            .bind(room_id)
            .fetch_one(&mut *tx)
            .await?;
        if occupied >= i64::from(capacity) {
            return Ok(WriteOutcome::RoomFull);
        }

        let row = sqlx::query_as::<_, BookingRow>(
            r#"
            UPDATE bookings SET room_id = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING id, user_id, room_id, created_at, updated_at
            "#,
        )
        .bind(room_id)
        .bind(booking_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(WriteOutcome::Written(row.into()))
    }

    async fn find_room_by_id(&self, room_id: RoomId) -> StoreResult<Option<Room>> {
        let row = sqlx::query_as::<_, RoomRow>(
            "SELECT id, name, capacity, hotel_id, created_at, updated_at FROM rooms WHERE id = $1",
        )
        .bind(room_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Room::from))
    }

    async fn count_bookings_for_room(&self, room_id: RoomId) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE room_id = $1")
            .bind(room_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn find_enrollment_by_user_id(
        &self,
        user_id: UserId,
    ) -> StoreResult<Option<Enrollment>> {
        let row = sqlx::query_as::<_, EnrollmentRow>(
            r#"
            SELECT e.id, e.user_id, e.name, e.cpf, e.phone,
                   a.id AS address_id, a.cep, a.street, a.city, a.state, a.number,
                   a.neighborhood, a.address_detail
            FROM enrollments e
            LEFT JOIN addresses a ON a.enrollment_id = e.id
            WHERE e.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Enrollment::from))
    }

    async fn find_ticket_by_enrollment_id(
        &self,
        enrollment_id: EnrollmentId,
    ) -> StoreResult<Option<Ticket>> {
        let row = sqlx::query_as::<_, TicketRow>(
            r#"
            SELECT t.id, t.enrollment_id, t.status,
                   tt.id AS ticket_type_id, tt.name AS ticket_type_name, tt.price,
                   tt.is_remote, tt.includes_hotel
            FROM tickets t
            JOIN ticket_types tt ON tt.id = t.ticket_type_id
            WHERE t.enrollment_id = $1
            "#,
        )
        .bind(enrollment_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Ticket::try_from(row)?)),
            None => Ok(None),
        }
    }
}
