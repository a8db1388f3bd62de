use rusqlite::Connection;
use tracing::info;

use crate::error::StoreError;

pub fn run(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            name        TEXT NOT NULL,
            role        TEXT NOT NULL,
            optin       INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS events (
            id                     TEXT PRIMARY KEY,
            creator_id             TEXT NOT NULL REFERENCES users(id),
            name                   TEXT NOT NULL,
            description            TEXT NOT NULL DEFAULT '',
            start_time             TEXT NOT NULL,
            last_reservation_time  TEXT NOT NULL,
            location_lat           REAL NOT NULL,
            location_lng           REAL NOT NULL,
            location_address       TEXT NOT NULL,
            created_at             TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_events_creator
            ON events(creator_id, created_at);

        CREATE TABLE IF NOT EXISTS food_items (
            id           TEXT PRIMARY KEY,
            event_id     TEXT NOT NULL REFERENCES events(id) ON DELETE CASCADE,
            food_name    TEXT NOT NULL,
            quantity     INTEGER NOT NULL CHECK (quantity >= 0),
            dietary_tags TEXT NOT NULL DEFAULT '',
            created_at   TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_food_items_event
            ON food_items(event_id);

        -- reservations.food_id carries no FOREIGN KEY: zero-stock food rows
        -- are deleted while their reservations remain, with the name
        -- snapshotted alongside.
        CREATE TABLE IF NOT EXISTS reservations (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            event_id    TEXT NOT NULL REFERENCES events(id) ON DELETE CASCADE,
            food_id     TEXT NOT NULL,
            food_name   TEXT NOT NULL,
            user_name   TEXT NOT NULL,
            quantity    INTEGER NOT NULL CHECK (quantity > 0),
            pickup_time TEXT NOT NULL,
            notes       TEXT NOT NULL DEFAULT '',
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_reservations_user
            ON reservations(user_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_reservations_event
            ON reservations(event_id);

        CREATE TABLE IF NOT EXISTS ratings (
            id          TEXT PRIMARY KEY,
            event_id    TEXT NOT NULL REFERENCES events(id) ON DELETE CASCADE,
            user_id     TEXT NOT NULL REFERENCES users(id),
            rating      REAL NOT NULL CHECK (rating >= 0 AND rating <= 5),
            description TEXT,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_ratings_event
            ON ratings(event_id);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
