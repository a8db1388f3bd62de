//! Shared seed helpers for the storage tests.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use pantry_types::api::{CreateEventRequest, NewFoodItem};
use pantry_types::models::{EventWithFoods, Location, Role};

use crate::Database;
use crate::users::NewUser;

pub(crate) fn test_db() -> Database {
    Database::open_in_memory().unwrap()
}

/// Seeds a user whose name is the local part of the email.
pub(crate) fn seed_user(db: &Database, email: &str) -> Uuid {
    let id = Uuid::new_v4();
    let name = email.split('@').next().unwrap();
    db.create_user(&NewUser {
        id,
        email,
        password_hash: "not-a-real-hash",
        name,
        role: Role::RegularUser,
    })
    .unwrap();
    id
}

/// An event running from half an hour ago until two hours from now.
pub(crate) fn window() -> (DateTime<Utc>, DateTime<Utc>) {
    let now = Utc::now();
    (now - Duration::minutes(30), now + Duration::hours(2))
}

pub(crate) fn event_request(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    foods: Vec<NewFoodItem>,
) -> CreateEventRequest {
    CreateEventRequest {
        name: "Leftover Pizza".into(),
        description: "Swing by while it lasts".into(),
        start,
        end,
        location: Location {
            lat: 42.35,
            lng: -71.1,
            address: "665 Commonwealth Ave".into(),
        },
        foods,
    }
}

pub(crate) fn seed_event(db: &Database, creator: Uuid, foods: Vec<NewFoodItem>) -> EventWithFoods {
    let (start, end) = window();
    db.create_event(creator, &event_request(start, end, foods))
        .unwrap()
}

pub(crate) fn food(name: &str, quantity: i64, tags: &str) -> NewFoodItem {
    NewFoodItem {
        name: name.into(),
        quantity,
        dietary_tags: if tags.is_empty() {
            None
        } else {
            Some(tags.into())
        },
    }
}
