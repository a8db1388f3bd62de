use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use tracing::info;
use uuid::Uuid;

use pantry_db::StoreError;
use pantry_types::api::{
    ActiveEventsResponse, Claims, CreateEventRequest, EventDetailResponse, EventFilterQuery,
    FoodListResponse, HostEventsResponse, MessageResponse, UpdateEventRequest,
};
use pantry_types::filter::{
    DEFAULT_FRESHNESS_WINDOW_MINUTES, apply_filters, is_active, parse_restrictions,
};
use pantry_types::models::EventWithFoods;

use crate::AppState;
use crate::error::ApiError;

pub async fn create_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let created = tokio::task::spawn_blocking(move || db.db.create_event(claims.sub, &req))
        .await
        .map_err(ApiError::task)??;

    info!("Event {} created by {}", created.event.event_id, claims.sub);
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let updated =
        tokio::task::spawn_blocking(move || db.db.update_event(event_id, claims.sub, &req))
            .await
            .map_err(ApiError::task)??;

    info!("Event {event_id} updated by {}", claims.sub);
    Ok(Json(updated))
}

pub async fn delete_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    tokio::task::spawn_blocking(move || db.db.delete_event(event_id, claims.sub))
        .await
        .map_err(ApiError::task)??;

    info!("Event {event_id} deleted by {}", claims.sub);
    Ok(Json(MessageResponse {
        message: "Event deleted".into(),
    }))
}

/// The caller's own postings, for their dashboard.
pub async fn my_events(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let events = tokio::task::spawn_blocking(move || db.db.list_events(Some(claims.sub)))
        .await
        .map_err(ApiError::task)??;
    Ok(Json(events))
}

pub async fn all_events(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let events = tokio::task::spawn_blocking(move || db.db.list_events(None))
        .await
        .map_err(ApiError::task)??;
    Ok(Json(events))
}

/// Full listing narrowed by dietary restrictions and a time filter, all
/// judged at one instant.
pub async fn filtered_events(
    State(state): State<AppState>,
    Query(query): Query<EventFilterQuery>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let events = tokio::task::spawn_blocking(move || db.db.list_events(None))
        .await
        .map_err(ApiError::task)??;

    let restrictions = query
        .dietary_restrictions
        .as_deref()
        .map(parse_restrictions)
        .unwrap_or_default();
    let time_filter = query.time_filter.unwrap_or_default();
    let freshness_window = Duration::minutes(
        query
            .freshness_window
            .unwrap_or(DEFAULT_FRESHNESS_WINDOW_MINUTES),
    );

    let events = apply_filters(events, &restrictions, time_filter, freshness_window, Utc::now());
    Ok(Json(events))
}

pub async fn event_details(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let (event, foods, reservations) =
        tokio::task::spawn_blocking(move || db.db.event_detail(event_id))
            .await
            .map_err(ApiError::task)??;
    Ok(Json(EventDetailResponse {
        event,
        foods,
        reservations,
    }))
}

/// Events whose reservation window contains the current moment.
pub async fn active_events(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let events = tokio::task::spawn_blocking(move || db.db.list_events(None))
        .await
        .map_err(ApiError::task)??;

    let now = Utc::now();
    let events = events
        .into_iter()
        .filter(|e| is_active(now, e.event.start_time, e.event.last_reservation_time))
        .collect();
    Ok(Json(ActiveEventsResponse { events }))
}

pub async fn get_food(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let foods = tokio::task::spawn_blocking(move || db.db.foods_for_event(event_id))
        .await
        .map_err(ApiError::task)??;
    Ok(Json(FoodListResponse { foods }))
}

pub async fn host_latest_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let latest = tokio::task::spawn_blocking(move || db.db.latest_event(claims.sub))
        .await
        .map_err(ApiError::task)??
        .ok_or(StoreError::NotFound("event"))?;
    Ok(Json(latest))
}

/// The caller's events split into currently-running and past buckets.
pub async fn host_events(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let events = tokio::task::spawn_blocking(move || db.db.list_events(Some(claims.sub)))
        .await
        .map_err(ApiError::task)??;

    let now = Utc::now();
    let (active_events, archived_events): (Vec<EventWithFoods>, Vec<EventWithFoods>) = events
        .into_iter()
        .partition(|e| is_active(now, e.event.start_time, e.event.last_reservation_time));
    Ok(Json(HostEventsResponse {
        active_events,
        archived_events,
    }))
}
