//! The storage seam the server is written against.

use async_trait::async_trait;
use brainflow_shared::{Outline, OutlineSummary, User};

use crate::error::Result;

/// Document-oriented persistence for users and outlines.
///
/// Outline reads are scoped by owner: a document owned by someone else is
/// reported exactly like a missing one.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name for logs and the health endpoint.
    fn backend(&self) -> &'static str;

    async fn health(&self) -> Result<()>;

    /// Insert a user. Fails with `Conflict` when the email is taken.
    async fn create_user(&self, user: &User) -> Result<()>;
    async fn get_user(&self, id: &str) -> Result<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn create_outline(&self, outline: &Outline) -> Result<()>;
    async fn get_outline(&self, id: &str, owner: &str) -> Result<Option<Outline>>;
    /// Summaries, most recently updated first.
    async fn list_outlines(&self, owner: &str) -> Result<Vec<OutlineSummary>>;
    /// Overwrite a whole document. Fails with `NotFound` when it is gone.
    async fn replace_outline(&self, outline: &Outline) -> Result<()>;
    async fn delete_outline(&self, id: &str, owner: &str) -> Result<bool>;

    /// Release resources. Later calls fail with `Closed`.
    async fn close(&self) -> Result<()>;
}
