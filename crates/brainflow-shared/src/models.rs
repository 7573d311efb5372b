//! Document types persisted by the store and returned over HTTP.
//!
//! Field names serialize as camelCase so stored documents and API payloads
//! share one shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Opaque key/value bag attached to an item. Never inspected server-side.
pub type Formatting = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// One node of outline content, stored flat with a parent pointer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Server-generated, immutable.
    pub id: String,
    #[serde(default)]
    pub content: String,
    /// `None` for root items. An empty string in stored data also means root.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub outline_id: String,
    /// Sibling sequence; unique only among items sharing a parent.
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub formatting: Option<Formatting>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    pub fn new(
        id: String,
        outline_id: &str,
        content: String,
        parent_id: Option<String>,
        order: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            content,
            parent_id,
            outline_id: outline_id.to_string(),
            order,
            style: None,
            formatting: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn is_child_of(&self, parent_id: Option<&str>) -> bool {
        self.parent_id.as_deref() == parent_id
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

pub(crate) fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

/// An item with its rendered children, as returned by the hierarchy view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemNode {
    #[serde(flatten)]
    pub item: Item,
    #[serde(default)]
    pub children: Vec<ItemNode>,
}

impl ItemNode {
    pub fn leaf(item: Item) -> Self {
        Self {
            item,
            children: Vec::new(),
        }
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(ItemNode::count).sum::<usize>()
    }
}

/// Partial item update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemUpdate {
    #[serde(default, alias = "text")]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub formatting: Option<Formatting>,
}

// ---------------------------------------------------------------------------
// Outline
// ---------------------------------------------------------------------------

/// A whole outline document: metadata plus the flat item list it owns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Outline {
    pub id: String,
    pub title: String,
    pub user_id: String,
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub item_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Outline {
    pub fn new(id: String, title: String, user_id: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title,
            user_id,
            items: Vec::new(),
            item_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Recompute derived fields after the item list changed.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.item_count = self.items.len();
        self.updated_at = now;
    }

    pub fn summary(&self) -> OutlineSummary {
        OutlineSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            user_id: self.user_id.clone(),
            item_count: self.items.len(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Outline metadata without the item list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OutlineSummary {
    pub id: String,
    pub title: String,
    pub user_id: String,
    pub item_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub theme: String,
    pub font_size: u32,
    pub auto_save: bool,
    #[serde(default)]
    pub shortcuts: serde_json::Map<String, serde_json::Value>,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            theme: "light".to_string(),
            font_size: 16,
            auto_save: true,
            shortcuts: serde_json::Map::new(),
        }
    }
}

/// A registered account. The owner key for outlines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    /// `salt_hex$hash_hex`, see [`crate::password`].
    pub hashed_password: String,
    #[serde(default)]
    pub settings: UserSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            settings: self.settings.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// The user as exposed to clients (no password hash).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub settings: UserSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_wire_shape() {
        let now = Utc::now();
        let item = Item::new("item_1".into(), "outline_1", "Hello".into(), None, 0, now);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["id"], "item_1");
        assert_eq!(json["outlineId"], "outline_1");
        assert!(json["parentId"].is_null());
        assert_eq!(json["order"], 0);
    }

    #[test]
    fn test_empty_parent_reads_as_root() {
        let raw = r#"{"id":"a","content":"x","parentId":"","order":3,
            "createdAt":"2024-01-01T00:00:00Z","updatedAt":"2024-01-01T00:00:00Z"}"#;
        let item: Item = serde_json::from_str(raw).unwrap();
        assert!(item.is_root());
        assert_eq!(item.order, 3);
    }

    #[test]
    fn test_node_flattens_item_fields() {
        let now = Utc::now();
        let mut node = ItemNode::leaf(Item::new("p".into(), "o", "P".into(), None, 0, now));
        node.children.push(ItemNode::leaf(Item::new(
            "c".into(),
            "o",
            "C".into(),
            Some("p".into()),
            0,
            now,
        )));
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["id"], "p");
        assert_eq!(json["children"][0]["parentId"], "p");
        assert_eq!(node.count(), 2);
    }

    #[test]
    fn test_update_accepts_text_alias() {
        let update: ItemUpdate = serde_json::from_str(r#"{"text":"new"}"#).unwrap();
        assert_eq!(update.content.as_deref(), Some("new"));
        assert!(update.parent_id.is_none());
    }

    #[test]
    fn test_profile_hides_hash() {
        let now = Utc::now();
        let user = User {
            id: "user_1".into(),
            email: "a@example.com".into(),
            name: "A".into(),
            hashed_password: "salt$hash".into(),
            settings: UserSettings::default(),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(user.profile()).unwrap();
        assert!(json.get("hashedPassword").is_none());
        assert_eq!(json["settings"]["fontSize"], 16);
    }
}
