use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use travelbook_core::{Booking, BookingId};

use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", get(list_bookings))
        .route("/v1/bookings/{booking_id}", get(get_booking))
        .route("/v1/bookings/{booking_id}/cancel", post(cancel_booking))
}

async fn list_bookings(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(state.bookings.list_bookings(&user_id).await?))
}

async fn get_booking(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(booking_id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let booking_id = BookingId::parse(&booking_id)?;
    Ok(Json(state.bookings.get_booking(&user_id, &booking_id).await?))
}

async fn cancel_booking(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(booking_id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let booking_id = BookingId::parse(&booking_id)?;
    Ok(Json(state.bookings.cancel_booking(&user_id, &booking_id).await?))
}
