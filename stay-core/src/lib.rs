pub mod models;
pub mod repository;
pub mod service;
pub mod memory;

pub use memory::InMemoryBookingStore;
pub use repository::{BookingStore, StoreError, StoreResult, WriteOutcome};
pub use service::BookingService;

use std::fmt;

/// Records the core can report as missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Booking,
    Room,
    Enrollment,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::Booking => "booking",
            Resource::Room => "room",
            Resource::Enrollment => "enrollment",
        };
        f.write_str(name)
    }
}

/// Business rules that can reject a create or a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConflictReason {
    #[error("room has no vacancies left")]
    RoomFull,
    #[error("user has no ticket")]
    NoTicket,
    #[error("ticket is not paid")]
    TicketNotPaid,
    #[error("ticket type does not include hotel")]
    HotelNotIncluded,
    #[error("ticket type is remote")]
    RemoteTicket,
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("{0} not found")]
    NotFound(Resource),
    #[error("booking rejected: {0}")]
    Conflict(ConflictReason),
    #[error("storage failure: {0}")]
    Store(StoreError),
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        BookingError::Store(err)
    }
}

pub type BookingResult<T> = Result<T, BookingError>;
