use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::info;

use pantry_db::reservations::NewReservation;
use pantry_types::api::{Claims, CreateReservationRequest, UserReservationsResponse};

use crate::AppState;
use crate::error::ApiError;

pub async fn create_reservation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateReservationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let new_reservation = NewReservation {
        user_id: claims.sub,
        event_id: req.event_id,
        food_id: req.food_id,
        quantity: req.quantity,
        pickup_time: req.pickup_time,
        notes: req.notes.unwrap_or_default(),
    };

    let db = state.clone();
    let (reservation, contact) =
        tokio::task::spawn_blocking(move || db.db.reserve(&new_reservation))
            .await
            .map_err(ApiError::task)??;

    info!("Reservation {} created by {}", reservation.res_id, claims.sub);

    // Best-effort notification; the response never waits on SMTP.
    if contact.optin {
        let mailer = state.mailer.clone();
        let food_name = reservation.food_name.clone();
        let reserved_by = reservation.user_name.clone();
        let quantity = reservation.quantity;
        let pickup = reservation.pickup_time.to_rfc3339();
        tokio::spawn(async move {
            mailer
                .send_reservation_notice(
                    &contact.email,
                    &contact.name,
                    &contact.event_name,
                    &food_name,
                    quantity,
                    &reserved_by,
                    &pickup,
                )
                .await;
        });
    }

    Ok((StatusCode::CREATED, Json(reservation)))
}

pub async fn user_reservations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let reservations = tokio::task::spawn_blocking(move || db.db.user_reservations(claims.sub))
        .await
        .map_err(ApiError::task)??;
    Ok(Json(UserReservationsResponse { reservations }))
}
