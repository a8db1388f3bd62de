use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    RegularUser,
    EventCreator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::RegularUser => "regular_user",
            Role::EventCreator => "event_creator",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "regular_user" => Some(Role::RegularUser),
            "event_creator" => Some(Role::EventCreator),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub optin: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_id: Uuid,
    pub creator_id: Uuid,
    pub name: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub last_reservation_time: DateTime<Utc>,
    pub location: Location,
    pub created_at: DateTime<Utc>,
}

/// A quantity-bearing line item belonging to one event. Quantity never goes
/// negative, and an item debited to zero is deleted rather than kept around.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodItem {
    pub food_id: Uuid,
    pub event_id: Uuid,
    pub food_name: String,
    pub quantity: i64,
    pub dietary_tags: String,
}

/// A user's claim on a quantity of one food item. `food_name` and
/// `user_name` are snapshots taken at creation time, so the record stays
/// readable after the food item is deleted for reaching zero stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub res_id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub food_id: Uuid,
    pub food_name: String,
    pub user_name: String,
    pub quantity: i64,
    pub pickup_time: DateTime<Utc>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rating {
    pub rating_id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub rating: f64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventWithFoods {
    #[serde(flatten)]
    pub event: Event,
    pub foods: Vec<FoodItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationWithEvent {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub event: Event,
}
