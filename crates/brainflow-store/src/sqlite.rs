//! [`DocumentStore`] over SQLite.
//!
//! `rusqlite` is synchronous, so every call runs on tokio's blocking pool
//! with the connection behind a mutex.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use brainflow_shared::{Outline, OutlineSummary, User};

use crate::database::Database;
use crate::document::DocumentStore;
use crate::error::{Result, StoreError};

#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<Mutex<Option<Database>>>,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(Some(db))),
        }
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        Ok(Self::new(Database::open_at(path)?))
    }

    /// Open the database in the platform data directory.
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(Database::new()?))
    }

    async fn with_db<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let guard = db.lock().map_err(|_| StoreError::Closed)?;
            let db = guard.as_ref().ok_or(StoreError::Closed)?;
            f(db)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

fn optional<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(StoreError::NotFound) => Ok(None),
        Err(e) => Err(e),
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn health(&self) -> Result<()> {
        self.with_db(|db| db.ping()).await
    }

    async fn create_user(&self, user: &User) -> Result<()> {
        let user = user.clone();
        self.with_db(move |db| db.create_user(&user)).await
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let id = id.to_string();
        self.with_db(move |db| optional(db.get_user(&id))).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.to_string();
        self.with_db(move |db| db.find_user_by_email(&email)).await
    }

    async fn create_outline(&self, outline: &Outline) -> Result<()> {
        let outline = outline.clone();
        self.with_db(move |db| db.create_outline(&outline)).await
    }

    async fn get_outline(&self, id: &str, owner: &str) -> Result<Option<Outline>> {
        let id = id.to_string();
        let owner = owner.to_string();
        self.with_db(move |db| {
            Ok(optional(db.get_outline(&id))?.filter(|outline| outline.user_id == owner))
        })
        .await
    }

    async fn list_outlines(&self, owner: &str) -> Result<Vec<OutlineSummary>> {
        let owner = owner.to_string();
        self.with_db(move |db| db.list_outlines_for_user(&owner))
            .await
    }

    async fn replace_outline(&self, outline: &Outline) -> Result<()> {
        let outline = outline.clone();
        self.with_db(move |db| db.replace_outline(&outline)).await
    }

    async fn delete_outline(&self, id: &str, owner: &str) -> Result<bool> {
        let id = id.to_string();
        let owner = owner.to_string();
        self.with_db(move |db| db.delete_outline(&id, &owner))
            .await
    }

    async fn close(&self) -> Result<()> {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let mut guard = db.lock().map_err(|_| StoreError::Closed)?;
            if guard.take().is_some() {
                tracing::info!("database closed");
            }
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}
