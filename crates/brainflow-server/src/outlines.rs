//! Outline operations: load the owner's document, run a tree edit, write the
//! whole document back.
//!
//! Nothing here locks across requests. Two concurrent writers to the same
//! outline race and the later replace wins.

use std::sync::Arc;

use brainflow_assist::command::VoiceCommand;
use brainflow_shared::batch::{apply_batch, BatchOperation};
use brainflow_shared::ids::{new_item_id, new_outline_id};
use brainflow_shared::template::{
    apply_template, expand_under, flatten, TemplateNode, TemplateRequest,
};
use brainflow_shared::{tree, Formatting, Item, ItemNode, ItemUpdate, Outline, OutlineSummary};
use brainflow_store::DocumentStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ServerError;

type Result<T> = std::result::Result<T, ServerError>;

/// Body of `POST /outlines/{id}/items`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    #[serde(default, alias = "text")]
    pub content: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub formatting: Option<Formatting>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub success: bool,
    pub items: Vec<ItemNode>,
    pub errors: Vec<String>,
}

#[derive(Clone)]
pub struct OutlineService {
    store: Arc<dyn DocumentStore>,
}

impl OutlineService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    async fn load(&self, owner: &str, id: &str) -> Result<Outline> {
        self.store
            .get_outline(id, owner)
            .await?
            .ok_or_else(ServerError::outline_not_found)
    }

    /// Fetch, edit, stamp and replace. An error from `edit` leaves the stored
    /// document untouched.
    async fn mutate<T, F>(&self, owner: &str, id: &str, edit: F) -> Result<T>
    where
        F: FnOnce(&mut Outline, DateTime<Utc>) -> Result<T>,
    {
        let mut outline = self.load(owner, id).await?;
        let now = Utc::now();
        let result = edit(&mut outline, now)?;
        outline.touch(now);
        self.store.replace_outline(&outline).await?;
        Ok(result)
    }

    // -- Outlines --

    pub async fn list(&self, owner: &str) -> Result<Vec<OutlineSummary>> {
        Ok(self.store.list_outlines(owner).await?)
    }

    pub async fn create(&self, owner: &str, title: &str) -> Result<OutlineSummary> {
        let title = validate_title(title)?;
        let outline = Outline::new(new_outline_id(), title, owner.to_string(), Utc::now());
        self.store.create_outline(&outline).await?;
        info!(outline = %outline.id, user = %owner, "outline created");
        Ok(outline.summary())
    }

    pub async fn summary(&self, owner: &str, id: &str) -> Result<OutlineSummary> {
        Ok(self.load(owner, id).await?.summary())
    }

    pub async fn rename(&self, owner: &str, id: &str, title: &str) -> Result<OutlineSummary> {
        let title = validate_title(title)?;
        let mut outline = self.load(owner, id).await?;
        outline.title = title;
        outline.touch(Utc::now());
        self.store.replace_outline(&outline).await?;
        Ok(outline.summary())
    }

    pub async fn delete(&self, owner: &str, id: &str) -> Result<()> {
        if !self.store.delete_outline(id, owner).await? {
            return Err(ServerError::outline_not_found());
        }
        info!(outline = %id, user = %owner, "outline deleted");
        Ok(())
    }

    /// Current flat items, for read-only consumers such as the generator.
    pub async fn snapshot(&self, owner: &str, id: &str) -> Result<Vec<Item>> {
        Ok(self.load(owner, id).await?.items)
    }

    // -- Items --

    pub async fn hierarchy(&self, owner: &str, id: &str) -> Result<Vec<ItemNode>> {
        let outline = self.load(owner, id).await?;
        Ok(tree::build_hierarchy(&outline.items))
    }

    pub async fn item(&self, owner: &str, id: &str, item_id: &str) -> Result<Item> {
        let outline = self.load(owner, id).await?;
        tree::find(&outline.items, item_id)
            .cloned()
            .ok_or_else(ServerError::item_not_found)
    }

    pub async fn create_item(&self, owner: &str, id: &str, new: NewItem) -> Result<Item> {
        self.mutate(owner, id, |outline, now| {
            let parent_id = new.parent_id.filter(|p| !p.is_empty());
            let mut item = Item::new(new_item_id(), &outline.id, new.content, parent_id, 0, now);
            item.style = new.style;
            item.formatting = new.formatting;
            Ok(tree::insert_item(&mut outline.items, item, None)?)
        })
        .await
    }

    pub async fn update_item(
        &self,
        owner: &str,
        id: &str,
        item_id: &str,
        update: &ItemUpdate,
    ) -> Result<Item> {
        self.mutate(owner, id, |outline, now| {
            Ok(tree::update_item(&mut outline.items, item_id, update, now)?)
        })
        .await
    }

    /// Delete an item with its subtree. Returns how many items went.
    pub async fn delete_item(&self, owner: &str, id: &str, item_id: &str) -> Result<usize> {
        let removed = self
            .mutate(owner, id, |outline, _| {
                tree::remove_subtree(&mut outline.items, item_id)
                    .map_err(|_| ServerError::item_not_found())
            })
            .await?;
        debug!(outline = %id, item = %item_id, removed, "item subtree deleted");
        Ok(removed)
    }

    pub async fn indent(&self, owner: &str, id: &str, item_id: &str) -> Result<Item> {
        self.mutate(owner, id, |outline, now| {
            ensure_item(outline, item_id)?;
            tree::indent(&mut outline.items, item_id, now)
                .ok_or_else(|| ServerError::BadRequest("Cannot indent this item".into()))
        })
        .await
    }

    pub async fn outdent(&self, owner: &str, id: &str, item_id: &str) -> Result<Item> {
        self.mutate(owner, id, |outline, now| {
            ensure_item(outline, item_id)?;
            tree::outdent(&mut outline.items, item_id, now)
                .ok_or_else(|| ServerError::BadRequest("Cannot outdent this item".into()))
        })
        .await
    }

    /// Apply every operation it can; the document is saved even when some
    /// fail.
    pub async fn batch(
        &self,
        owner: &str,
        id: &str,
        operations: &[BatchOperation],
    ) -> Result<BatchOutcome> {
        self.mutate(owner, id, |outline, now| {
            let report = apply_batch(&mut outline.items, &outline.id, operations, now, new_item_id);
            info!(
                outline = %outline.id,
                operations = operations.len(),
                failed = report.errors.len(),
                created = report.created.len(),
                "batch applied"
            );
            Ok(BatchOutcome {
                success: report.success(),
                items: tree::build_hierarchy(&outline.items),
                errors: report.errors,
            })
        })
        .await
    }

    pub async fn template(
        &self,
        owner: &str,
        id: &str,
        request: &TemplateRequest,
    ) -> Result<Vec<ItemNode>> {
        self.mutate(owner, id, |outline, now| {
            let outline_id = outline.id.clone();
            Ok(apply_template(&mut outline.items, &outline_id, request, now, new_item_id)?)
        })
        .await
    }

    /// Append nested nodes under `parent_id` and return the new items flat,
    /// parents before children.
    pub async fn add_nodes(
        &self,
        owner: &str,
        id: &str,
        nodes: &[TemplateNode],
        parent_id: Option<&str>,
    ) -> Result<Vec<Item>> {
        self.mutate(owner, id, |outline, now| {
            let outline_id = outline.id.clone();
            let created = expand_under(
                &mut outline.items,
                &outline_id,
                nodes,
                parent_id,
                now,
                new_item_id,
            )?;
            Ok(flatten(created))
        })
        .await
    }

    /// Apply a spoken command. The document is only written back when at
    /// least one item changed.
    pub async fn voice_command(
        &self,
        owner: &str,
        id: &str,
        command: &VoiceCommand,
    ) -> Result<usize> {
        let mut outline = self.load(owner, id).await?;
        let now = Utc::now();
        let outline_id = outline.id.clone();
        let modified = command.apply(&mut outline.items, &outline_id, now, new_item_id);
        if modified == 0 {
            debug!(outline = %outline_id, ?command, "voice command changed nothing");
            return Ok(0);
        }

        outline.touch(now);
        self.store.replace_outline(&outline).await?;
        info!(outline = %outline_id, ?command, modified, "voice command applied");
        Ok(modified)
    }
}

fn validate_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ServerError::BadRequest("Title cannot be empty".into()));
    }
    Ok(title.to_string())
}

fn ensure_item(outline: &Outline, item_id: &str) -> Result<()> {
    tree::find(&outline.items, item_id)
        .map(|_| ())
        .ok_or_else(ServerError::item_not_found)
}
