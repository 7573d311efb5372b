//! In-process [`DocumentStore`]. Nothing survives a restart.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use brainflow_shared::{Outline, OutlineSummary, User};
use tokio::sync::RwLock;

use crate::document::DocumentStore;
use crate::error::{Result, StoreError};

#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, User>>,
    outlines: RwLock<HashMap<String, Outline>>,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn health(&self) -> Result<()> {
        self.ensure_open()
    }

    async fn create_user(&self, user: &User) -> Result<()> {
        self.ensure_open()?;
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|existing| existing.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(StoreError::Conflict(format!(
                "email already registered: {}",
                user.email
            )));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        self.ensure_open()?;
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.ensure_open()?;
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create_outline(&self, outline: &Outline) -> Result<()> {
        self.ensure_open()?;
        let mut outlines = self.outlines.write().await;
        if outlines.contains_key(&outline.id) {
            return Err(StoreError::Conflict(format!(
                "outline already exists: {}",
                outline.id
            )));
        }
        outlines.insert(outline.id.clone(), outline.clone());
        Ok(())
    }

    async fn get_outline(&self, id: &str, owner: &str) -> Result<Option<Outline>> {
        self.ensure_open()?;
        Ok(self
            .outlines
            .read()
            .await
            .get(id)
            .filter(|outline| outline.user_id == owner)
            .cloned())
    }

    async fn list_outlines(&self, owner: &str) -> Result<Vec<OutlineSummary>> {
        self.ensure_open()?;
        let outlines = self.outlines.read().await;
        let mut listed: Vec<OutlineSummary> = outlines
            .values()
            .filter(|outline| outline.user_id == owner)
            .map(Outline::summary)
            .collect();
        listed.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(listed)
    }

    async fn replace_outline(&self, outline: &Outline) -> Result<()> {
        self.ensure_open()?;
        let mut outlines = self.outlines.write().await;
        match outlines.get_mut(&outline.id) {
            Some(existing) if existing.user_id == outline.user_id => {
                *existing = outline.clone();
                existing.item_count = existing.items.len();
                Ok(())
            }
            _ => Err(StoreError::NotFound),
        }
    }

    async fn delete_outline(&self, id: &str, owner: &str) -> Result<bool> {
        self.ensure_open()?;
        let mut outlines = self.outlines.write().await;
        if outlines.get(id).is_some_and(|outline| outline.user_id == owner) {
            outlines.remove(id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::tests::sample_user;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let store = MemoryStore::new();
        store
            .create_user(&sample_user("user_1", "ada@example.com"))
            .await
            .unwrap();
        let err = store
            .create_user(&sample_user("user_2", "Ada@Example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert!(store
            .get_user_by_email("ADA@example.com")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn outlines_scoped_and_sorted() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut old = Outline::new("o1".into(), "Old".into(), "u1".into(), now);
        old.updated_at = now - Duration::minutes(5);
        store.create_outline(&old).await.unwrap();
        store
            .create_outline(&Outline::new("o2".into(), "New".into(), "u1".into(), now))
            .await
            .unwrap();
        store
            .create_outline(&Outline::new("o3".into(), "Other".into(), "u2".into(), now))
            .await
            .unwrap();

        let listed = store.list_outlines("u1").await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["o2", "o1"]);
        assert!(store.get_outline("o3", "u1").await.unwrap().is_none());
        assert!(!store.delete_outline("o3", "u1").await.unwrap());
    }

    #[tokio::test]
    async fn replace_missing_is_not_found() {
        let store = MemoryStore::new();
        let outline = Outline::new("o1".into(), "T".into(), "u1".into(), Utc::now());
        assert!(matches!(
            store.replace_outline(&outline).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn close_rejects_later_calls() {
        let store = MemoryStore::new();
        store.close().await.unwrap();
        assert!(matches!(store.health().await, Err(StoreError::Closed)));
    }
}
