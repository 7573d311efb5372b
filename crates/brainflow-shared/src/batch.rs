//! Non-atomic batches of item operations.
//!
//! Operations run in order against one working copy of the item list. A
//! failing operation is reported as a message and the rest still run, so a
//! batch can partially succeed.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EditError;
use crate::models::{empty_as_none, Formatting, Item, ItemUpdate};
use crate::tree;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationType {
    Create,
    Update,
    Delete,
    Move,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationType::Create => "CREATE",
            OperationType::Update => "UPDATE",
            OperationType::Delete => "DELETE",
            OperationType::Move => "MOVE",
        };
        f.write_str(name)
    }
}

/// Item payload carried by CREATE and UPDATE.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemFields {
    #[serde(default, alias = "text")]
    pub content: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub formatting: Option<Formatting>,
}

/// One operation of a batch request.
///
/// Fields are optional on the wire so that a malformed operation fails on its
/// own instead of rejecting the whole batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchOperation {
    #[serde(rename = "type")]
    pub kind: OperationType,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub position: Option<i64>,
    #[serde(default)]
    pub data: Option<ItemFields>,
}

impl BatchOperation {
    fn target(&self) -> Result<&str, EditError> {
        self.id.as_deref().ok_or(EditError::MissingField("id"))
    }
}

/// What happened while applying a batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    /// One message per failed operation, in input order.
    pub errors: Vec<String>,
    /// Ids of the items created by CREATE operations.
    pub created: Vec<String>,
}

impl BatchReport {
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Apply `operations` in order. `next_id` allocates ids for created items.
pub fn apply_batch<F>(
    items: &mut Vec<Item>,
    outline_id: &str,
    operations: &[BatchOperation],
    now: DateTime<Utc>,
    mut next_id: F,
) -> BatchReport
where
    F: FnMut() -> String,
{
    let mut report = BatchReport::default();

    for (index, op) in operations.iter().enumerate() {
        match apply_one(items, outline_id, op, now, &mut next_id) {
            Ok(Some(created)) => report.created.push(created),
            Ok(None) => {}
            Err(e) => report.errors.push(format!(
                "Operation {} ({} {}) failed: {}",
                index + 1,
                op.kind,
                op.id.as_deref().unwrap_or("-"),
                e
            )),
        }
    }

    report
}

fn apply_one<F>(
    items: &mut Vec<Item>,
    outline_id: &str,
    op: &BatchOperation,
    now: DateTime<Utc>,
    next_id: &mut F,
) -> Result<Option<String>, EditError>
where
    F: FnMut() -> String,
{
    let fields = op.data.clone().unwrap_or_default();

    match op.kind {
        OperationType::Create => {
            let mut item = Item::new(
                next_id(),
                outline_id,
                fields.content.unwrap_or_default(),
                op.parent_id.clone(),
                0,
                now,
            );
            item.style = fields.style;
            item.formatting = fields.formatting;
            let created = tree::insert_item(items, item, op.position)?;
            Ok(Some(created.id))
        }
        OperationType::Update => {
            let update = ItemUpdate {
                content: fields.content,
                parent_id: op.parent_id.clone(),
                order: op.position,
                style: fields.style,
                formatting: fields.formatting,
            };
            tree::update_item(items, op.target()?, &update, now)?;
            Ok(None)
        }
        OperationType::Delete => {
            tree::remove_subtree(items, op.target()?)?;
            Ok(None)
        }
        OperationType::Move => {
            tree::move_item(
                items,
                op.target()?,
                op.parent_id.as_deref(),
                op.position,
                now,
            )?;
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::tests::make_item;
    use crate::tree::{build_hierarchy, find};

    fn counter() -> impl FnMut() -> String {
        let mut n = 0;
        move || {
            n += 1;
            format!("new_{n}")
        }
    }

    fn op(json: &str) -> BatchOperation {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_parse_wire_operation() {
        let parsed = op(r#"{"type":"CREATE","parentId":"a","data":{"text":"hi"}}"#);
        assert_eq!(parsed.kind, OperationType::Create);
        assert_eq!(parsed.parent_id.as_deref(), Some("a"));
        assert_eq!(parsed.data.unwrap().content.as_deref(), Some("hi"));
    }

    #[test]
    fn test_partial_failure_continues() {
        let mut items = vec![make_item("a", None, 0), make_item("b", None, 1)];
        let ops = vec![
            op(r#"{"type":"UPDATE","id":"a","data":{"content":"first"}}"#),
            op(r#"{"type":"UPDATE","id":"missing","data":{"content":"lost"}}"#),
            op(r#"{"type":"DELETE","id":"b"}"#),
        ];
        let report = apply_batch(&mut items, "o", &ops, Utc::now(), counter());

        assert!(!report.success());
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("missing"));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].content, "first");
    }

    #[test]
    fn test_create_orders() {
        let mut items = vec![make_item("a", None, 0)];
        let ops = vec![
            op(r#"{"type":"CREATE","data":{"content":"appended"}}"#),
            op(r#"{"type":"CREATE","parentId":"a","position":4,"data":{"text":"child"}}"#),
            op(r#"{"type":"CREATE","parentId":"a","data":{"text":"second child"}}"#),
        ];
        let report = apply_batch(&mut items, "o", &ops, Utc::now(), counter());

        assert!(report.success());
        assert_eq!(report.created, vec!["new_1", "new_2", "new_3"]);
        assert_eq!(find(&items, "new_1").unwrap().order, 1);
        assert_eq!(find(&items, "new_2").unwrap().order, 4);
        assert_eq!(find(&items, "new_3").unwrap().order, 1);
        assert_eq!(find(&items, "new_3").unwrap().outline_id, "o");
    }

    #[test]
    fn test_later_ops_see_earlier_results() {
        let mut items = vec![make_item("a", None, 0), make_item("b", Some("a"), 0)];
        let ops = vec![
            op(r#"{"type":"MOVE","id":"b","parentId":null,"position":1}"#),
            op(r#"{"type":"DELETE","id":"a"}"#),
        ];
        let report = apply_batch(&mut items, "o", &ops, Utc::now(), counter());

        assert!(report.success());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "b");
        assert!(items[0].is_root());
    }

    #[test]
    fn test_missing_id_is_reported() {
        let mut items = vec![make_item("a", None, 0)];
        let ops = vec![op(r#"{"type":"DELETE"}"#)];
        let report = apply_batch(&mut items, "o", &ops, Utc::now(), counter());
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("Missing field: id"));
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_move_under_own_child_rejected() {
        let mut items = vec![make_item("a", None, 0), make_item("b", Some("a"), 0)];
        let ops = vec![op(r#"{"type":"MOVE","id":"a","parentId":"b"}"#)];
        let report = apply_batch(&mut items, "o", &ops, Utc::now(), counter());
        assert!(!report.success());
        assert_eq!(build_hierarchy(&items).len(), 1);
    }
}
