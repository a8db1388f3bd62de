use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use uuid::Uuid;

use pantry_types::models::{Reservation, ReservationWithEvent};

use crate::Database;
use crate::error::StoreError;
use crate::models::{ReservationRow, now_rfc3339};
use crate::{events, inventory};

/// Everything needed to insert a reservation. Food and user names are
/// snapshotted from the current rows, not taken from the caller.
pub struct NewReservation {
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub food_id: Uuid,
    pub quantity: i64,
    pub pickup_time: DateTime<Utc>,
    pub notes: String,
}

/// Who to notify once a reservation has committed.
#[derive(Debug)]
pub struct CreatorContact {
    pub email: String,
    pub name: String,
    pub optin: bool,
    pub event_name: String,
}

impl Database {
    /// Inserts the reservation and debits stock in one transaction, so a
    /// failed debit leaves no record behind.
    pub fn reserve(
        &self,
        req: &NewReservation,
    ) -> Result<(Reservation, CreatorContact), StoreError> {
        if req.quantity <= 0 {
            return Err(StoreError::InvalidInput(
                "reservation quantity must be positive".into(),
            ));
        }

        let res_id = Uuid::new_v4();
        self.with_tx(|tx| {
            let user_name: String = tx
                .query_row(
                    "SELECT name FROM users WHERE id = ?1",
                    [req.user_id.to_string()],
                    |row| row.get(0),
                )
                .optional()?
                .ok_or(StoreError::NotFound("user"))?;
            let event = events::query_event(tx, &req.event_id.to_string())?
                .ok_or(StoreError::NotFound("event"))?;
            // A zero-stock item is deleted outright, so a missing row means
            // nothing is left to reserve.
            let food_name: String = tx
                .query_row(
                    "SELECT food_name FROM food_items WHERE id = ?1 AND event_id = ?2",
                    rusqlite::params![req.food_id.to_string(), req.event_id.to_string()],
                    |row| row.get(0),
                )
                .optional()?
                .ok_or(StoreError::InsufficientStock)?;

            tx.execute(
                "INSERT INTO reservations (id, user_id, event_id, food_id, food_name,
                                           user_name, quantity, pickup_time, notes, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                rusqlite::params![
                    res_id.to_string(),
                    req.user_id.to_string(),
                    req.event_id.to_string(),
                    req.food_id.to_string(),
                    food_name,
                    user_name,
                    req.quantity,
                    req.pickup_time.to_rfc3339(),
                    req.notes,
                    now_rfc3339(),
                ],
            )?;
            inventory::debit(tx, &req.food_id.to_string(), req.quantity)?;

            let reservation = query_reservation(tx, &res_id.to_string())?
                .ok_or(StoreError::NotFound("reservation"))?
                .into_reservation()?;
            let contact = tx.query_row(
                "SELECT email, name, optin FROM users WHERE id = ?1",
                [&event.creator_id],
                |row| {
                    Ok(CreatorContact {
                        email: row.get(0)?,
                        name: row.get(1)?,
                        optin: row.get(2)?,
                        event_name: event.name.clone(),
                    })
                },
            )?;
            Ok((reservation, contact))
        })
    }

    /// The caller's reservations, newest first, each with its parent event.
    pub fn user_reservations(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ReservationWithEvent>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT r.id, r.user_id, r.event_id, r.food_id, r.food_name, r.user_name,
                        r.quantity, r.pickup_time, r.notes, r.created_at,
                        e.id, e.creator_id, e.name, e.description, e.start_time,
                        e.last_reservation_time, e.location_lat, e.location_lng,
                        e.location_address, e.created_at
                 FROM reservations r
                 JOIN events e ON e.id = r.event_id
                 WHERE r.user_id = ?1
                 ORDER BY r.created_at DESC, r.rowid DESC",
            )?;
            let rows = stmt
                .query_map([user_id.to_string()], |row| {
                    Ok((
                        reservation_from_row_at(row, 0)?,
                        events::event_from_row_at(row, 10)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter()
                .map(|(res, event)| {
                    Ok(ReservationWithEvent {
                        reservation: res.into_reservation()?,
                        event: event.into_event()?,
                    })
                })
                .collect()
        })
    }
}

/// Cancels a reservation by crediting its quantity back to stock and deleting
/// the row. Scoped to the event so a host cannot zero another event's
/// reservation through their own update.
pub(crate) fn zero_reservation(
    conn: &Connection,
    event_id: &str,
    res_id: &str,
) -> Result<(), StoreError> {
    let (food_id, food_name, quantity) = conn
        .query_row(
            "SELECT food_id, food_name, quantity FROM reservations
             WHERE id = ?1 AND event_id = ?2",
            rusqlite::params![res_id, event_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            },
        )
        .optional()?
        .ok_or(StoreError::NotFound("reservation"))?;

    inventory::credit(conn, event_id, &food_id, &food_name, quantity)?;
    conn.execute("DELETE FROM reservations WHERE id = ?1", [res_id])?;
    Ok(())
}

pub(crate) fn query_reservations_for_event(
    conn: &Connection,
    event_id: &str,
) -> Result<Vec<Reservation>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, event_id, food_id, food_name, user_name, quantity,
                pickup_time, notes, created_at
         FROM reservations WHERE event_id = ?1 ORDER BY created_at DESC, rowid DESC",
    )?;
    let rows = stmt
        .query_map([event_id], |row| reservation_from_row_at(row, 0))?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(ReservationRow::into_reservation).collect()
}

fn query_reservation(
    conn: &Connection,
    res_id: &str,
) -> Result<Option<ReservationRow>, StoreError> {
    let row = conn
        .query_row(
            "SELECT id, user_id, event_id, food_id, food_name, user_name, quantity,
                    pickup_time, notes, created_at
             FROM reservations WHERE id = ?1",
            [res_id],
            |row| reservation_from_row_at(row, 0),
        )
        .optional()
        .map_err(StoreError::from)?;
    Ok(row)
}

fn reservation_from_row_at(row: &Row, at: usize) -> rusqlite::Result<ReservationRow> {
    Ok(ReservationRow {
        id: row.get(at)?,
        user_id: row.get(at + 1)?,
        event_id: row.get(at + 2)?,
        food_id: row.get(at + 3)?,
        food_name: row.get(at + 4)?,
        user_name: row.get(at + 5)?,
        quantity: row.get(at + 6)?,
        pickup_time: row.get(at + 7)?,
        notes: row.get(at + 8)?,
        created_at: row.get(at + 9)?,
    })
}
