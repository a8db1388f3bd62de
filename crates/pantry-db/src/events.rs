use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use uuid::Uuid;

use pantry_types::api::{CreateEventRequest, UpdateEventRequest};
use pantry_types::filter::normalize_tags;
use pantry_types::models::{Event, EventWithFoods, FoodItem, Reservation};

use crate::Database;
use crate::error::StoreError;
use crate::models::{EventRow, FoodRow, now_rfc3339, parse_ts};
use crate::reservations;

impl Database {
    /// Inserts the event and all of its food items in one transaction.
    pub fn create_event(
        &self,
        creator_id: Uuid,
        req: &CreateEventRequest,
    ) -> Result<EventWithFoods, StoreError> {
        if req.name.trim().is_empty() {
            return Err(StoreError::InvalidInput("event name must not be empty".into()));
        }
        validate_window(req.start, req.end)?;
        for item in &req.foods {
            validate_new_food(&item.name, item.quantity)?;
        }

        let event_id = Uuid::new_v4();
        self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO events (id, creator_id, name, description, start_time,
                                     last_reservation_time, location_lat, location_lng,
                                     location_address, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                rusqlite::params![
                    event_id.to_string(),
                    creator_id.to_string(),
                    req.name.trim(),
                    req.description,
                    req.start.to_rfc3339(),
                    req.end.to_rfc3339(),
                    req.location.lat,
                    req.location.lng,
                    req.location.address,
                    now_rfc3339(),
                ],
            )?;

            for item in &req.foods {
                insert_food_item(
                    tx,
                    &event_id.to_string(),
                    &item.name,
                    item.quantity,
                    item.dietary_tags.as_deref().unwrap_or(""),
                )?;
            }

            event_with_foods(tx, &event_id.to_string())
        })
    }

    /// Applies field updates, food overwrites/deletions/additions, and
    /// reservation zeroings in one transaction.
    pub fn update_event(
        &self,
        event_id: Uuid,
        caller_id: Uuid,
        req: &UpdateEventRequest,
    ) -> Result<EventWithFoods, StoreError> {
        let eid = event_id.to_string();
        self.with_tx(|tx| {
            let current = query_event(tx, &eid)?.ok_or(StoreError::NotFound("event"))?;
            if current.creator_id != caller_id.to_string() {
                return Err(StoreError::Forbidden(
                    "only the event creator can modify this event",
                ));
            }

            // The window is validated against the values that will be stored.
            let start = match req.start {
                Some(s) => s,
                None => parse_ts(&current.start_time)?,
            };
            let end = match req.end {
                Some(e) => e,
                None => parse_ts(&current.last_reservation_time)?,
            };
            validate_window(start, end)?;

            if let Some(name) = &req.name {
                if name.trim().is_empty() {
                    return Err(StoreError::InvalidInput("event name must not be empty".into()));
                }
                tx.execute(
                    "UPDATE events SET name = ?1 WHERE id = ?2",
                    rusqlite::params![name.trim(), eid],
                )?;
            }
            if let Some(description) = &req.description {
                tx.execute(
                    "UPDATE events SET description = ?1 WHERE id = ?2",
                    rusqlite::params![description, eid],
                )?;
            }
            tx.execute(
                "UPDATE events SET start_time = ?1, last_reservation_time = ?2 WHERE id = ?3",
                rusqlite::params![start.to_rfc3339(), end.to_rfc3339(), eid],
            )?;
            if let Some(location) = &req.location {
                tx.execute(
                    "UPDATE events SET location_lat = ?1, location_lng = ?2, location_address = ?3
                     WHERE id = ?4",
                    rusqlite::params![location.lat, location.lng, location.address, eid],
                )?;
            }

            for item in &req.foods {
                match item.food_id {
                    Some(fid) if item.quantity <= 0 => {
                        tx.execute(
                            "DELETE FROM food_items WHERE id = ?1 AND event_id = ?2",
                            rusqlite::params![fid.to_string(), eid],
                        )?;
                    }
                    Some(fid) => {
                        let changed = tx.execute(
                            "UPDATE food_items SET quantity = ?1 WHERE id = ?2 AND event_id = ?3",
                            rusqlite::params![item.quantity, fid.to_string(), eid],
                        )?;
                        if changed == 0 {
                            return Err(StoreError::NotFound("food item"));
                        }
                        if let Some(tags) = &item.dietary_tags {
                            tx.execute(
                                "UPDATE food_items SET dietary_tags = ?1 WHERE id = ?2",
                                rusqlite::params![normalize_tags(tags), fid.to_string()],
                            )?;
                        }
                    }
                    None => {
                        let name = item.food_name.as_deref().unwrap_or("");
                        validate_new_food(name, item.quantity)?;
                        insert_food_item(
                            tx,
                            &eid,
                            name,
                            item.quantity,
                            item.dietary_tags.as_deref().unwrap_or(""),
                        )?;
                    }
                }
            }

            for entry in &req.reservations {
                if entry.quantity <= 0 {
                    reservations::zero_reservation(tx, &eid, &entry.res_id.to_string())?;
                }
            }

            event_with_foods(tx, &eid)
        })
    }

    pub fn delete_event(&self, event_id: Uuid, caller_id: Uuid) -> Result<(), StoreError> {
        let eid = event_id.to_string();
        self.with_tx(|tx| {
            let current = query_event(tx, &eid)?.ok_or(StoreError::NotFound("event"))?;
            if current.creator_id != caller_id.to_string() {
                return Err(StoreError::Forbidden(
                    "only the event creator can delete this event",
                ));
            }
            // Food items, reservations and ratings cascade.
            tx.execute("DELETE FROM events WHERE id = ?1", [&eid])?;
            Ok(())
        })
    }

    /// All events, or only those owned by `creator`, newest first, with
    /// their food items attached.
    pub fn list_events(&self, creator: Option<Uuid>) -> Result<Vec<EventWithFoods>, StoreError> {
        self.with_conn(|conn| {
            let rows = match creator {
                Some(creator_id) => query_event_rows(
                    conn,
                    "WHERE creator_id = ?1 ORDER BY created_at DESC, rowid DESC",
                    &[&creator_id.to_string()],
                )?,
                None => query_event_rows(conn, "ORDER BY created_at DESC, rowid DESC", &[])?,
            };
            attach_foods(conn, rows)
        })
    }

    /// The caller's most recently created event, if any.
    pub fn latest_event(&self, creator_id: Uuid) -> Result<Option<EventWithFoods>, StoreError> {
        self.with_conn(|conn| {
            let rows = query_event_rows(
                conn,
                "WHERE creator_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT 1",
                &[&creator_id.to_string()],
            )?;
            Ok(attach_foods(conn, rows)?.into_iter().next())
        })
    }

    pub fn event_with_foods(&self, event_id: Uuid) -> Result<EventWithFoods, StoreError> {
        self.with_conn(|conn| event_with_foods(conn, &event_id.to_string()))
    }

    /// One event plus its foods and reservations, for the host detail view.
    pub fn event_detail(
        &self,
        event_id: Uuid,
    ) -> Result<(Event, Vec<FoodItem>, Vec<Reservation>), StoreError> {
        let eid = event_id.to_string();
        self.with_conn(|conn| {
            let event = query_event(conn, &eid)?
                .ok_or(StoreError::NotFound("event"))?
                .into_event()?;
            let foods = query_foods_for_event(conn, &eid)?;
            let reservations = reservations::query_reservations_for_event(conn, &eid)?;
            Ok((event, foods, reservations))
        })
    }

    pub fn foods_for_event(&self, event_id: Uuid) -> Result<Vec<FoodItem>, StoreError> {
        let eid = event_id.to_string();
        self.with_conn(|conn| {
            if query_event(conn, &eid)?.is_none() {
                return Err(StoreError::NotFound("event"));
            }
            query_foods_for_event(conn, &eid)
        })
    }
}

fn validate_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), StoreError> {
    if end <= start {
        return Err(StoreError::InvalidInput(
            "last reservation time must be after the start time".into(),
        ));
    }
    Ok(())
}

fn validate_new_food(name: &str, quantity: i64) -> Result<(), StoreError> {
    if name.trim().is_empty() {
        return Err(StoreError::InvalidInput("food name must not be empty".into()));
    }
    if quantity <= 0 {
        return Err(StoreError::InvalidInput("food quantity must be positive".into()));
    }
    Ok(())
}

fn insert_food_item(
    conn: &Connection,
    event_id: &str,
    name: &str,
    quantity: i64,
    tags: &str,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO food_items (id, event_id, food_name, quantity, dietary_tags, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            Uuid::new_v4().to_string(),
            event_id,
            name.trim(),
            quantity,
            normalize_tags(tags),
            now_rfc3339(),
        ],
    )?;
    Ok(())
}

pub(crate) fn query_event(
    conn: &Connection,
    event_id: &str,
) -> Result<Option<EventRow>, StoreError> {
    let row = conn
        .query_row(
            "SELECT id, creator_id, name, description, start_time, last_reservation_time,
                    location_lat, location_lng, location_address, created_at
             FROM events WHERE id = ?1",
            [event_id],
            |row| event_from_row_at(row, 0),
        )
        .optional()
        .map_err(StoreError::from)?;
    Ok(row)
}

fn query_event_rows(
    conn: &Connection,
    tail: &str,
    params: &[&dyn rusqlite::types::ToSql],
) -> Result<Vec<EventRow>, StoreError> {
    let sql = format!(
        "SELECT id, creator_id, name, description, start_time, last_reservation_time,
                location_lat, location_lng, location_address, created_at
         FROM events {tail}"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params, |row| event_from_row_at(row, 0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub(crate) fn event_from_row_at(row: &Row, at: usize) -> rusqlite::Result<EventRow> {
    Ok(EventRow {
        id: row.get(at)?,
        creator_id: row.get(at + 1)?,
        name: row.get(at + 2)?,
        description: row.get(at + 3)?,
        start_time: row.get(at + 4)?,
        last_reservation_time: row.get(at + 5)?,
        location_lat: row.get(at + 6)?,
        location_lng: row.get(at + 7)?,
        location_address: row.get(at + 8)?,
        created_at: row.get(at + 9)?,
    })
}

fn food_from_row(row: &Row) -> rusqlite::Result<FoodRow> {
    Ok(FoodRow {
        id: row.get(0)?,
        event_id: row.get(1)?,
        food_name: row.get(2)?,
        quantity: row.get(3)?,
        dietary_tags: row.get(4)?,
    })
}

/// Food items in insertion order (rowid preserves it across same-second inserts).
pub(crate) fn query_foods_for_event(
    conn: &Connection,
    event_id: &str,
) -> Result<Vec<FoodItem>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, event_id, food_name, quantity, dietary_tags
         FROM food_items WHERE event_id = ?1 ORDER BY rowid",
    )?;
    let rows = stmt
        .query_map([event_id], food_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(FoodRow::into_food).collect()
}

fn event_with_foods(conn: &Connection, event_id: &str) -> Result<EventWithFoods, StoreError> {
    let event = query_event(conn, event_id)?
        .ok_or(StoreError::NotFound("event"))?
        .into_event()?;
    let foods = query_foods_for_event(conn, event_id)?;
    Ok(EventWithFoods { event, foods })
}

/// Batch-fetch food items for a set of events to avoid per-event queries.
fn attach_foods(conn: &Connection, rows: Vec<EventRow>) -> Result<Vec<EventWithFoods>, StoreError> {
    if rows.is_empty() {
        return Ok(vec![]);
    }

    let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
    let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "SELECT id, event_id, food_name, quantity, dietary_tags
         FROM food_items WHERE event_id IN ({}) ORDER BY rowid",
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::types::ToSql> =
        ids.iter().map(|id| id as &dyn rusqlite::types::ToSql).collect();
    let food_rows = stmt
        .query_map(params.as_slice(), food_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let mut by_event: HashMap<String, Vec<FoodItem>> = HashMap::new();
    for row in food_rows {
        let event_id = row.event_id.clone();
        by_event.entry(event_id).or_default().push(row.into_food()?);
    }

    rows.into_iter()
        .map(|row| {
            let foods = by_event.remove(&row.id).unwrap_or_default();
            Ok(EventWithFoods {
                event: row.into_event()?,
                foods,
            })
        })
        .collect()
}
