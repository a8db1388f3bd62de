use rusqlite::{Connection, OptionalExtension, Row};
use uuid::Uuid;

use pantry_types::models::Role;

use crate::Database;
use crate::error::StoreError;
use crate::models::{UserRow, now_rfc3339};

pub struct NewUser<'a> {
    pub id: Uuid,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub name: &'a str,
    pub role: Role,
}

impl Database {
    pub fn create_user(&self, user: &NewUser) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            match conn.execute(
                "INSERT INTO users (id, email, password, name, role, optin, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
                rusqlite::params![
                    user.id.to_string(),
                    user.email,
                    user.password_hash,
                    user.name,
                    user.role.as_str(),
                    now_rfc3339(),
                ],
            ) {
                Ok(_) => Ok(()),
                Err(e)
                    if e.sqlite_error_code() == Some(rusqlite::ErrorCode::ConstraintViolation) =>
                {
                    Err(StoreError::Conflict("an account with this email"))
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>, StoreError> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: Uuid) -> Result<Option<UserRow>, StoreError> {
        self.with_conn(|conn| query_user(conn, "id", &id.to_string()))
    }

    pub fn set_password(&self, user_id: Uuid, password_hash: &str) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET password = ?1 WHERE id = ?2",
                rusqlite::params![password_hash, user_id.to_string()],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound("user"));
            }
            Ok(())
        })
    }

    /// Flips the email-notification flag and returns the new value.
    pub fn toggle_optin(&self, user_id: Uuid) -> Result<bool, StoreError> {
        self.with_tx(|tx| {
            let changed = tx.execute(
                "UPDATE users SET optin = NOT optin WHERE id = ?1",
                [user_id.to_string()],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound("user"));
            }
            let optin = tx.query_row(
                "SELECT optin FROM users WHERE id = ?1",
                [user_id.to_string()],
                |row| row.get(0),
            )?;
            Ok(optin)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>, StoreError> {
    let sql = format!(
        "SELECT id, email, password, name, role, optin, created_at FROM users WHERE {column} = ?1"
    );
    let row = conn
        .query_row(&sql, [value], user_from_row)
        .optional()
        .map_err(StoreError::from)?;
    Ok(row)
}

fn user_from_row(row: &Row) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        password: row.get(2)?,
        name: row.get(3)?,
        role: row.get(4)?,
        optin: row.get(5)?,
        created_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{seed_user, test_db};

    #[test]
    fn duplicate_email_is_a_conflict() {
        let db = test_db();
        seed_user(&db, "amy@bu.edu");

        let err = db
            .create_user(&NewUser {
                id: Uuid::new_v4(),
                email: "amy@bu.edu",
                password_hash: "hash",
                name: "Amy Again",
                role: Role::RegularUser,
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn toggle_optin_flips_the_flag() {
        let db = test_db();
        let user_id = seed_user(&db, "ben@bu.edu");

        assert!(!db.get_user_by_id(user_id).unwrap().unwrap().optin);
        assert!(db.toggle_optin(user_id).unwrap());
        assert!(db.get_user_by_id(user_id).unwrap().unwrap().optin);
        assert!(!db.toggle_optin(user_id).unwrap());
    }

    #[test]
    fn set_password_for_missing_user_is_not_found() {
        let db = test_db();
        let err = db.set_password(Uuid::new_v4(), "hash").unwrap_err();
        assert!(matches!(err, StoreError::NotFound("user")));
    }

    #[test]
    fn lookup_by_email_returns_stored_fields() {
        let db = test_db();
        let user_id = seed_user(&db, "cal@bu.edu");

        let row = db.get_user_by_email("cal@bu.edu").unwrap().unwrap();
        assert_eq!(row.id, user_id.to_string());
        assert_eq!(row.name, "cal");
        let user = row.into_user().unwrap();
        assert_eq!(user.role, Role::RegularUser);
    }
}
