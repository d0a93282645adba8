use axum::{
    extract::{Json, Path, State},
    routing::{get, put},
    Extension, Router,
};
use serde::{Deserialize, Serialize};
use stay_core::models::{BookingId, Room, RoomId};

use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub room_id: RoomId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MyBookingResponse {
    pub id: BookingId,
    #[serde(rename = "Room")]
    pub room: Room,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingIdResponse {
    pub booking_id: BookingId,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/booking", get(get_booking).post(create_booking))
        .route("/booking/{booking_id}", put(update_booking))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /booking
async fn get_booking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<MyBookingResponse>, AppError> {
    let booking = state.bookings.get_booking_for_user(user.user_id).await?;

    Ok(Json(MyBookingResponse {
        id: booking.id,
        room: booking.room,
    }))
}

/// POST /booking
async fn create_booking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<BookingRequest>,
) -> Result<Json<BookingIdResponse>, AppError> {
    let booking = state.bookings.create_booking(user.user_id, req.room_id).await?;

    Ok(Json(BookingIdResponse { booking_id: booking.id }))
}

/// PUT /booking/{booking_id}
async fn update_booking(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(booking_id): Path<BookingId>,
    Json(req): Json<BookingRequest>,
) -> Result<Json<BookingIdResponse>, AppError> {
    let booking = state
        .bookings
        .update_booking(user.user_id, req.room_id, booking_id)
        .await?;

    Ok(Json(BookingIdResponse { booking_id: booking.id }))
}
