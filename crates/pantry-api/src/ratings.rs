use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use pantry_types::api::{Claims, RateEventRequest, RatingsResponse};

use crate::AppState;
use crate::error::ApiError;

pub async fn rate_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<RateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let event_id = req.event_id;
    let db = state.clone();
    let rating = tokio::task::spawn_blocking(move || {
        db.db
            .add_rating(claims.sub, req.event_id, req.rating, req.description.as_deref())
    })
    .await
    .map_err(ApiError::task)??;

    info!("Rating added for event {event_id} by {}", claims.sub);
    Ok((StatusCode::CREATED, Json(rating)))
}

pub async fn list_ratings(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let ratings = tokio::task::spawn_blocking(move || db.db.ratings_for_event(event_id))
        .await
        .map_err(ApiError::task)??;
    Ok(Json(RatingsResponse { ratings }))
}
