//! Database row types — these map directly to SQLite rows.
//! Distinct from pantry-types API models to keep the DB layer independent.

use chrono::{DateTime, NaiveDateTime, Utc};
use uuid::Uuid;

use pantry_types::models::{Event, FoodItem, Location, Rating, Reservation, Role, User};

use crate::error::StoreError;

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: String,
    pub optin: bool,
    pub created_at: String,
}

impl UserRow {
    pub fn into_user(self) -> Result<User, StoreError> {
        Ok(User {
            user_id: parse_id(&self.id)?,
            email: self.email,
            name: self.name,
            role: Role::parse(&self.role)
                .ok_or_else(|| StoreError::Persistence(format!("unknown role: {}", self.role)))?,
            optin: self.optin,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

pub struct EventRow {
    pub id: String,
    pub creator_id: String,
    pub name: String,
    pub description: String,
    pub start_time: String,
    pub last_reservation_time: String,
    pub location_lat: f64,
    pub location_lng: f64,
    pub location_address: String,
    pub created_at: String,
}

impl EventRow {
    pub fn into_event(self) -> Result<Event, StoreError> {
        Ok(Event {
            event_id: parse_id(&self.id)?,
            creator_id: parse_id(&self.creator_id)?,
            name: self.name,
            description: self.description,
            start_time: parse_ts(&self.start_time)?,
            last_reservation_time: parse_ts(&self.last_reservation_time)?,
            location: Location {
                lat: self.location_lat,
                lng: self.location_lng,
                address: self.location_address,
            },
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

pub struct FoodRow {
    pub id: String,
    pub event_id: String,
    pub food_name: String,
    pub quantity: i64,
    pub dietary_tags: String,
}

impl FoodRow {
    pub fn into_food(self) -> Result<FoodItem, StoreError> {
        Ok(FoodItem {
            food_id: parse_id(&self.id)?,
            event_id: parse_id(&self.event_id)?,
            food_name: self.food_name,
            quantity: self.quantity,
            dietary_tags: self.dietary_tags,
        })
    }
}

pub struct ReservationRow {
    pub id: String,
    pub user_id: String,
    pub event_id: String,
    pub food_id: String,
    pub food_name: String,
    pub user_name: String,
    pub quantity: i64,
    pub pickup_time: String,
    pub notes: String,
    pub created_at: String,
}

impl ReservationRow {
    pub fn into_reservation(self) -> Result<Reservation, StoreError> {
        Ok(Reservation {
            res_id: parse_id(&self.id)?,
            user_id: parse_id(&self.user_id)?,
            event_id: parse_id(&self.event_id)?,
            food_id: parse_id(&self.food_id)?,
            food_name: self.food_name,
            user_name: self.user_name,
            quantity: self.quantity,
            pickup_time: parse_ts(&self.pickup_time)?,
            notes: self.notes,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

pub struct RatingRow {
    pub id: String,
    pub event_id: String,
    pub user_id: String,
    pub rating: f64,
    pub description: Option<String>,
    pub created_at: String,
}

impl RatingRow {
    pub fn into_rating(self) -> Result<Rating, StoreError> {
        Ok(Rating {
            rating_id: parse_id(&self.id)?,
            event_id: parse_id(&self.event_id)?,
            user_id: parse_id(&self.user_id)?,
            rating: self.rating,
            description: self.description,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

pub(crate) fn parse_id(raw: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(raw).map_err(|_| StoreError::Persistence(format!("malformed id: {raw}")))
}

/// Rows written by this crate carry RFC 3339 timestamps; the space-separated
/// form covers columns filled by SQLite's own datetime() default.
pub(crate) fn parse_ts(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|_| StoreError::Persistence(format!("malformed timestamp: {raw}")))
}

pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}
