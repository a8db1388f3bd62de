use rusqlite::{OptionalExtension, Row};
use uuid::Uuid;

use pantry_types::models::Rating;

use crate::Database;
use crate::error::StoreError;
use crate::events;
use crate::models::{RatingRow, now_rfc3339};

impl Database {
    /// Records a rating. Only users holding a reservation for the event may
    /// rate it; ratings are append-only, so repeat ratings simply accumulate.
    pub fn add_rating(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        rating: f64,
        description: Option<&str>,
    ) -> Result<Rating, StoreError> {
        if !(0.0..=5.0).contains(&rating) {
            return Err(StoreError::InvalidInput(
                "rating must be between 0 and 5".into(),
            ));
        }

        let rating_id = Uuid::new_v4();
        self.with_tx(|tx| {
            if events::query_event(tx, &event_id.to_string())?.is_none() {
                return Err(StoreError::NotFound("event"));
            }
            let attended = tx
                .query_row(
                    "SELECT 1 FROM reservations WHERE user_id = ?1 AND event_id = ?2 LIMIT 1",
                    rusqlite::params![user_id.to_string(), event_id.to_string()],
                    |_| Ok(()),
                )
                .optional()?;
            if attended.is_none() {
                return Err(StoreError::Forbidden("only attendees can rate an event"));
            }

            tx.execute(
                "INSERT INTO ratings (id, event_id, user_id, rating, description, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    rating_id.to_string(),
                    event_id.to_string(),
                    user_id.to_string(),
                    rating,
                    description,
                    now_rfc3339(),
                ],
            )?;

            let row = tx.query_row(
                "SELECT id, event_id, user_id, rating, description, created_at
                 FROM ratings WHERE id = ?1",
                [rating_id.to_string()],
                rating_from_row,
            )?;
            row.into_rating()
        })
    }

    /// Ratings for an event, newest first.
    pub fn ratings_for_event(&self, event_id: Uuid) -> Result<Vec<Rating>, StoreError> {
        let eid = event_id.to_string();
        self.with_conn(|conn| {
            if events::query_event(conn, &eid)?.is_none() {
                return Err(StoreError::NotFound("event"));
            }
            let mut stmt = conn.prepare(
                "SELECT id, event_id, user_id, rating, description, created_at
                 FROM ratings WHERE event_id = ?1 ORDER BY created_at DESC, rowid DESC",
            )?;
            let rows = stmt
                .query_map([&eid], rating_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter().map(RatingRow::into_rating).collect()
        })
    }
}

fn rating_from_row(row: &Row) -> rusqlite::Result<RatingRow> {
    Ok(RatingRow {
        id: row.get(0)?,
        event_id: row.get(1)?,
        user_id: row.get(2)?,
        rating: row.get(3)?,
        description: row.get(4)?,
        created_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reservations::NewReservation;
    use crate::testutil::{food, seed_event, seed_user, test_db};
    use chrono::{Duration, Utc};
    use pantry_types::models::EventWithFoods;

    fn reserve(db: &Database, user: Uuid, event: &EventWithFoods, quantity: i64) {
        db.reserve(&NewReservation {
            user_id: user,
            event_id: event.event.event_id,
            food_id: event.foods[0].food_id,
            quantity,
            pickup_time: Utc::now() + Duration::minutes(30),
            notes: String::new(),
        })
        .unwrap();
    }

    #[test]
    fn rating_requires_a_reservation() {
        let db = test_db();
        let host = seed_user(&db, "host@bu.edu");
        let diner = seed_user(&db, "diner@bu.edu");
        let event = seed_event(&db, host, vec![food("pizza", 10, "")]);
        let eid = event.event.event_id;

        let err = db.add_rating(diner, eid, 4.0, None).unwrap_err();
        assert!(matches!(err, StoreError::Forbidden(_)));

        reserve(&db, diner, &event, 2);
        let rating = db.add_rating(diner, eid, 4.0, Some("great pizza")).unwrap();
        assert_eq!(rating.rating, 4.0);

        let listed = db.ratings_for_event(eid).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].description.as_deref(), Some("great pizza"));
    }

    #[test]
    fn rating_must_be_between_zero_and_five() {
        let db = test_db();
        let host = seed_user(&db, "host@bu.edu");
        let diner = seed_user(&db, "diner@bu.edu");
        let event = seed_event(&db, host, vec![food("pizza", 10, "")]);
        reserve(&db, diner, &event, 1);

        let eid = event.event.event_id;
        assert!(matches!(
            db.add_rating(diner, eid, 5.5, None).unwrap_err(),
            StoreError::InvalidInput(_)
        ));
        assert!(matches!(
            db.add_rating(diner, eid, -0.5, None).unwrap_err(),
            StoreError::InvalidInput(_)
        ));

        // Half-star values are fine.
        let rating = db.add_rating(diner, eid, 4.5, None).unwrap();
        assert_eq!(rating.rating, 4.5);
    }

    #[test]
    fn ratings_come_newest_first() {
        let db = test_db();
        let host = seed_user(&db, "host@bu.edu");
        let diner = seed_user(&db, "diner@bu.edu");
        let event = seed_event(&db, host, vec![food("pizza", 10, "")]);
        reserve(&db, diner, &event, 1);

        let eid = event.event.event_id;
        db.add_rating(diner, eid, 3.0, Some("first")).unwrap();
        db.add_rating(diner, eid, 5.0, Some("second")).unwrap();

        let listed = db.ratings_for_event(eid).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].description.as_deref(), Some("second"));
        assert_eq!(listed[1].description.as_deref(), Some("first"));
    }

    #[test]
    fn rating_a_missing_event_is_not_found() {
        let db = test_db();
        let diner = seed_user(&db, "diner@bu.edu");
        let err = db.add_rating(diner, Uuid::new_v4(), 4.0, None).unwrap_err();
        assert!(matches!(err, StoreError::NotFound("event")));
    }

    #[test]
    fn listing_ratings_for_a_missing_event_is_not_found() {
        let db = test_db();
        let err = db.ratings_for_event(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound("event")));
    }
}
