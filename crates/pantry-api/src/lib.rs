pub mod auth;
pub mod error;
pub mod events;
pub mod middleware;
pub mod ratings;
pub mod reservations;

use std::sync::Arc;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};

use pantry_db::Database;
use pantry_mailer::Mailer;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub mailer: Mailer,
}

/// The full route table. Protected routes sit behind the bearer-token
/// middleware; the rest stay public so the landing page can browse events
/// without an account.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
        .route("/active-events", get(events::active_events))
        .route("/get-food/{event_id}", get(events::get_food))
        .route("/ratings/{event_id}", get(ratings::list_ratings))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/me", get(auth::me))
        .route("/optupdate", post(auth::opt_update))
        .route("/createevent", post(events::create_event))
        .route("/events", get(events::my_events))
        .route("/events/all", get(events::all_events))
        .route("/events/filtered", get(events::filtered_events))
        .route("/events/update/{event_id}", post(events::update_event))
        .route("/events/delete/{event_id}", post(events::delete_event))
        .route("/events/{event_id}", get(events::event_details))
        .route("/host-latest-event", get(events::host_latest_event))
        .route("/host/events", get(events::host_events))
        .route("/createreservation", post(reservations::create_reservation))
        .route("/user/reservations", get(reservations::user_reservations))
        .route("/rate-event", post(ratings::rate_event))
        .layer(from_fn_with_state(state.clone(), middleware::require_auth))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}
