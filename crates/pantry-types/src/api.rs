use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::filter::TimeFilter;
use crate::models::{
    Event, EventWithFoods, FoodItem, Location, Rating, Reservation, ReservationWithEvent, Role,
    User,
};

// -- JWT Claims --

/// JWT claims shared between token issuance (auth handlers) and the REST
/// middleware. Canonical definition lives here in pantry-types to eliminate
/// duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub name: String,
    pub purpose: TokenPurpose,
    pub exp: usize,
}

/// Session tokens and password-reset tokens share a signing secret; the
/// purpose claim keeps one from standing in for the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    Session,
    PasswordReset,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: User,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct OptinResponse {
    pub optin: bool,
}

// -- Events --

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub location: Location,
    pub foods: Vec<NewFoodItem>,
}

#[derive(Debug, Deserialize)]
pub struct NewFoodItem {
    pub name: String,
    pub quantity: i64,
    #[serde(default)]
    pub dietary_tags: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEventRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub foods: Vec<FoodUpdate>,
    #[serde(default)]
    pub reservations: Vec<ReservationUpdate>,
}

/// One food entry in an event update. With a `food_id` it overwrites the
/// existing item's quantity (or deletes it at quantity <= 0); without one it
/// adds a new item, in which case `food_name` is required.
#[derive(Debug, Deserialize)]
pub struct FoodUpdate {
    #[serde(default)]
    pub food_id: Option<Uuid>,
    #[serde(default)]
    pub food_name: Option<String>,
    pub quantity: i64,
    #[serde(default)]
    pub dietary_tags: Option<String>,
}

/// One reservation entry in an event update. Quantity <= 0 zeroes the
/// reservation: its stock is credited back and the record deleted. Positive
/// quantities are ignored, since hosts cannot resize a reservation.
#[derive(Debug, Deserialize)]
pub struct ReservationUpdate {
    pub res_id: Uuid,
    pub quantity: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventFilterQuery {
    #[serde(default)]
    pub dietary_restrictions: Option<String>,
    #[serde(default)]
    pub time_filter: Option<TimeFilter>,
    /// Minutes; only meaningful for the `fresh_food` filter.
    #[serde(default)]
    pub freshness_window: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ActiveEventsResponse {
    pub events: Vec<EventWithFoods>,
}

#[derive(Debug, Serialize)]
pub struct FoodListResponse {
    pub foods: Vec<FoodItem>,
}

#[derive(Debug, Serialize)]
pub struct EventDetailResponse {
    pub event: Event,
    pub foods: Vec<FoodItem>,
    pub reservations: Vec<Reservation>,
}

#[derive(Debug, Serialize)]
pub struct HostEventsResponse {
    pub active_events: Vec<EventWithFoods>,
    pub archived_events: Vec<EventWithFoods>,
}

// -- Reservations --

#[derive(Debug, Deserialize)]
pub struct CreateReservationRequest {
    pub food_id: Uuid,
    pub event_id: Uuid,
    pub quantity: i64,
    pub pickup_time: DateTime<Utc>,
    #[serde(default, alias = "note")]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserReservationsResponse {
    pub reservations: Vec<ReservationWithEvent>,
}

// -- Ratings --

#[derive(Debug, Deserialize)]
pub struct RateEventRequest {
    pub event_id: Uuid,
    pub rating: f64,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RatingsResponse {
    pub ratings: Vec<Rating>,
}
