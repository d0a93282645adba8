use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

pub type UserId = i32;
pub type RoomId = i32;
pub type BookingId = i32;
pub type EnrollmentId = i32;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Hotel {
    pub id: i32,
    pub name: String,
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub capacity: i32,
    pub hotel_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Room {
    /// True when `occupied` bookings leave no free slot.
    pub fn is_full(&self, occupied: i64) -> bool {
        occupied >= i64::from(self.capacity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: BookingId,
    pub user_id: UserId,
    pub room_id: RoomId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A booking joined with the room it currently occupies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingWithRoom {
    pub id: BookingId,
    pub user_id: UserId,
    pub room: Room,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: i32,
    pub cep: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub number: String,
    pub neighborhood: String,
    pub address_detail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub user_id: UserId,
    pub name: String,
    pub cpf: String,
    pub phone: String,
    pub address: Option<Address>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Reserved,
    Paid,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Reserved => "RESERVED",
            TicketStatus::Paid => "PAID",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown ticket status: {0}")]
pub struct UnknownTicketStatus(pub String);

impl FromStr for TicketStatus {
    type Err = UnknownTicketStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RESERVED" => Ok(TicketStatus::Reserved),
            "PAID" => Ok(TicketStatus::Paid),
            other => Err(UnknownTicketStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TicketType {
    pub id: i32,
    pub name: String,
    pub price: i32,
    pub is_remote: bool,
    pub includes_hotel: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: i32,
    pub enrollment_id: EnrollmentId,
    pub status: TicketStatus,
    pub ticket_type: TicketType,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(capacity: i32) -> Room {
        let now = Utc::now();
        Room {
            id: 1,
            name: "101".to_string(),
            capacity,
            hotel_id: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_room_full_at_capacity() {
        let r = room(2);
        assert!(!r.is_full(0));
        assert!(!r.is_full(1));
        assert!(r.is_full(2));
        assert!(r.is_full(3));
    }

    #[test]
    fn test_zero_capacity_room_is_always_full() {
        assert!(room(0).is_full(0));
    }

    #[test]
    fn test_ticket_status_parsing() {
        assert_eq!("PAID".parse::<TicketStatus>().unwrap(), TicketStatus::Paid);
        assert_eq!("RESERVED".parse::<TicketStatus>().unwrap(), TicketStatus::Reserved);
        assert!("paid".parse::<TicketStatus>().is_err());
    }

    #[test]
    fn test_booking_with_room_serializes_camel_case() {
        let now = Utc::now();
        let booking = BookingWithRoom {
            id: 7,
            user_id: 3,
            room: room(4),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&booking).unwrap();
        assert_eq!(json["userId"], 3);
        assert_eq!(json["room"]["hotelId"], 1);
        assert_eq!(json["room"]["capacity"], 4);
    }
}
