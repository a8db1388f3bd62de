use rusqlite::Connection;

use crate::error::StoreError;
use crate::models::now_rfc3339;

/// Removes `amount` servings from a food item. The decrement is guarded by
/// `quantity >= amount` in the WHERE clause, so stock can never go negative
/// no matter how calls interleave; an item left at zero is deleted outright.
/// A fully reserved item has no row at all, so zero affected rows always
/// reads as sold out.
pub(crate) fn debit(conn: &Connection, food_id: &str, amount: i64) -> Result<(), StoreError> {
    if amount <= 0 {
        return Err(StoreError::InvalidInput(
            "reservation quantity must be positive".into(),
        ));
    }

    let changed = conn.execute(
        "UPDATE food_items SET quantity = quantity - ?1 WHERE id = ?2 AND quantity >= ?1",
        rusqlite::params![amount, food_id],
    )?;
    if changed == 0 {
        return Err(StoreError::InsufficientStock);
    }

    conn.execute(
        "DELETE FROM food_items WHERE id = ?1 AND quantity = 0",
        [food_id],
    )?;
    Ok(())
}

/// Returns `amount` servings to a food item. A fully-reserved item has been
/// deleted, so the row is recreated under the same id with the snapshot name
/// and the credited amount as its entire stock.
pub(crate) fn credit(
    conn: &Connection,
    event_id: &str,
    food_id: &str,
    food_name: &str,
    amount: i64,
) -> Result<(), StoreError> {
    if amount <= 0 {
        return Err(StoreError::InvalidInput("credit amount must be positive".into()));
    }

    let changed = conn.execute(
        "UPDATE food_items SET quantity = quantity + ?1 WHERE id = ?2",
        rusqlite::params![amount, food_id],
    )?;
    if changed == 0 {
        conn.execute(
            "INSERT INTO food_items (id, event_id, food_name, quantity, dietary_tags, created_at)
             VALUES (?1, ?2, ?3, ?4, '', ?5)",
            rusqlite::params![food_id, event_id, food_name, amount, now_rfc3339()],
        )?;
    }
    Ok(())
}
