//! CRUD operations for [`User`] records.

use brainflow_shared::{User, UserSettings};
use rusqlite::{params, ErrorCode, OptionalExtension};

use crate::database::{from_sql_json, from_sql_time, not_found, to_sql_time, Database};
use crate::error::{Result, StoreError};

const USER_COLUMNS: &str =
    "id, email, name, hashed_password, settings, created_at, updated_at";

impl Database {
    /// Insert a new user. A taken email (any case) is a [`StoreError::Conflict`].
    pub fn create_user(&self, user: &User) -> Result<()> {
        let settings = serde_json::to_string(&user.settings)?;
        self.conn()
            .execute(
                "INSERT INTO users
                     (id, email, name, hashed_password, settings, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    user.id,
                    user.email,
                    user.name,
                    user.hashed_password,
                    settings,
                    to_sql_time(&user.created_at),
                    to_sql_time(&user.updated_at),
                ],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(ref err, _)
                    if err.code == ErrorCode::ConstraintViolation =>
                {
                    StoreError::Conflict(format!("email already registered: {}", user.email))
                }
                other => StoreError::Sqlite(other),
            })?;
        Ok(())
    }

    /// Fetch a single user by id.
    pub fn get_user(&self, id: &str) -> Result<User> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                row_to_user,
            )
            .map_err(not_found)
    }

    /// Fetch a user by email, compared case-insensitively.
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1 COLLATE NOCASE"),
                params![email],
                row_to_user,
            )
            .optional()?)
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let settings_raw: String = row.get(4)?;
    let created_raw: String = row.get(5)?;
    let updated_raw: String = row.get(6)?;

    let settings: UserSettings = from_sql_json(4, &settings_raw)?;

    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        hashed_password: row.get(3)?,
        settings,
        created_at: from_sql_time(5, &created_raw)?,
        updated_at: from_sql_time(6, &updated_raw)?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;

    pub(crate) fn sample_user(id: &str, email: &str) -> User {
        let now = Utc::now();
        User {
            id: id.to_string(),
            email: email.to_string(),
            name: "Sample".to_string(),
            hashed_password: "00$00".to_string(),
            settings: UserSettings::default(),
            created_at: now,
            updated_at: now,
        }
    }

    fn open() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("users.db")).unwrap();
        (dir, db)
    }

    #[test]
    fn create_and_fetch() {
        let (_dir, db) = open();
        let user = sample_user("user_1", "ada@example.com");
        db.create_user(&user).unwrap();

        let loaded = db.get_user("user_1").unwrap();
        assert_eq!(loaded.email, "ada@example.com");
        assert_eq!(loaded.settings, UserSettings::default());
    }

    #[test]
    fn email_lookup_ignores_case() {
        let (_dir, db) = open();
        db.create_user(&sample_user("user_1", "Ada@Example.com"))
            .unwrap();
        let found = db.find_user_by_email("ada@example.COM").unwrap();
        assert_eq!(found.map(|u| u.id).as_deref(), Some("user_1"));
        assert!(db.find_user_by_email("bob@example.com").unwrap().is_none());
    }

    #[test]
    fn duplicate_email_conflicts() {
        let (_dir, db) = open();
        db.create_user(&sample_user("user_1", "ada@example.com"))
            .unwrap();
        let err = db
            .create_user(&sample_user("user_2", "ADA@example.com"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn missing_user_not_found() {
        let (_dir, db) = open();
        assert!(matches!(db.get_user("nope"), Err(StoreError::NotFound)));
    }
}
