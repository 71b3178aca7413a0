use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::{delete, post, put},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use travelbook_catalog::{NewTravelOption, TravelOption};
use travelbook_core::BookingError;
use travelbook_shared::UserId;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdatePriceRequest {
    pub price: Decimal,
}

#[derive(Debug, Serialize)]
struct RemoveUserResponse {
    user_id: String,
    removed_bookings: usize,
}

// Catalog and account administration
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/travel-options", post(create_travel_option))
        .route("/v1/admin/travel-options/{id}", delete(delete_travel_option))
        .route("/v1/admin/travel-options/{id}/price", put(update_price))
        .route("/v1/admin/users/{user_id}", delete(remove_user))
}

async fn create_travel_option(
    State(state): State<AppState>,
    payload: Result<Json<NewTravelOption>, JsonRejection>,
) -> Result<(StatusCode, Json<TravelOption>), AppError> {
    let Json(input) = payload?;
    let option = state.catalog.register_travel_option(input).await?;
    Ok((StatusCode::CREATED, Json(option)))
}

async fn update_price(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdatePriceRequest>, JsonRejection>,
) -> Result<Json<TravelOption>, AppError> {
    let Path(id) = path?;
    let Json(req) = payload?;
    Ok(Json(state.catalog.update_price(id, req.price).await?))
}

async fn delete_travel_option(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let Path(id) = path?;
    state.catalog.delete_travel_option(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn remove_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<RemoveUserResponse>, AppError> {
    let user_id = UserId::new(user_id).map_err(BookingError::from)?;
    let removed_bookings = state.bookings.remove_user(&user_id).await?;

    Ok(Json(RemoveUserResponse {
        user_id: user_id.to_string(),
        removed_bookings,
    }))
}
