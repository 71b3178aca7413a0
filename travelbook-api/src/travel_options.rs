use std::convert::Infallible;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;
use tracing::warn;
use travelbook_catalog::TravelOption;
use travelbook_core::Booking;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub seats: i32,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/travel-options", get(list_travel_options))
        .route("/v1/travel-options/{id}", get(get_travel_option))
        .route("/v1/travel-options/{id}/bookings", post(create_booking))
        .route("/v1/travel-options/{id}/stream", get(availability_stream))
}

async fn list_travel_options(State(state): State<AppState>) -> Result<Json<Vec<TravelOption>>, AppError> {
    Ok(Json(state.catalog.list_travel_options().await?))
}

async fn get_travel_option(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<TravelOption>, AppError> {
    let Path(id) = path?;
    Ok(Json(state.catalog.get_travel_option(id).await?))
}

async fn create_booking(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<CreateBookingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let Path(id) = path?;
    let Json(req) = payload?;
    let booking = state.bookings.create_booking(&user_id, id, req.seats).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

/// Server-sent booking events for one travel option
async fn availability_stream(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let Path(id) = path?;
    // 404 up front rather than an empty stream
    state.catalog.get_travel_option(id).await?;

    let rx = state.bookings.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |result| async move {
        match result {
            Ok(event) if event.travel_option_id() == id => {
                match Event::default().event(event.name()).json_data(&event) {
                    Ok(sse) => Some(Ok(sse)),
                    Err(e) => {
                        warn!("Failed to encode booking event: {}", e);
                        None
                    }
                }
            }
            Ok(_) => None,
            Err(e) => {
                warn!("Availability stream for {} fell behind: {}", id, e);
                None
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
