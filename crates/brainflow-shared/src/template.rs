//! Template expansion: materialize a nested node list as new items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::MAX_TREE_DEPTH;
use crate::error::EditError;
use crate::models::{Formatting, Item, ItemNode};
use crate::tree;

/// One node of a template, with its children inline.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateNode {
    #[serde(default, alias = "text")]
    pub content: String,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub formatting: Option<Formatting>,
    #[serde(default)]
    pub children: Vec<TemplateNode>,
}

impl TemplateNode {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRequest {
    #[serde(default)]
    pub items: Vec<TemplateNode>,
    #[serde(default)]
    pub clear_existing: bool,
}

/// Apply a template request at the root level of an outline.
///
/// Every node, top-level ones included, takes its index among its template
/// siblings as `order`.
pub fn apply_template<F>(
    items: &mut Vec<Item>,
    outline_id: &str,
    request: &TemplateRequest,
    now: DateTime<Utc>,
    mut next_id: F,
) -> Result<Vec<ItemNode>, EditError>
where
    F: FnMut() -> String,
{
    if request.clear_existing {
        items.clear();
    }
    Ok(expand_from(items, outline_id, &request.items, None, 0, now, &mut next_id))
}

/// Append `nodes` under `parent_id` (`None` = root).
///
/// Top-level nodes are numbered after the parent's existing children; nested
/// nodes take their index among template siblings. Nodes nested deeper than
/// [`MAX_TREE_DEPTH`] are dropped.
pub fn expand_under<F>(
    items: &mut Vec<Item>,
    outline_id: &str,
    nodes: &[TemplateNode],
    parent_id: Option<&str>,
    now: DateTime<Utc>,
    mut next_id: F,
) -> Result<Vec<ItemNode>, EditError>
where
    F: FnMut() -> String,
{
    if let Some(parent) = parent_id {
        if tree::find(items, parent).is_none() {
            return Err(EditError::ParentNotFound(parent.to_string()));
        }
    }

    let offset = tree::sibling_count(items, parent_id) as i64;
    Ok(expand_from(items, outline_id, nodes, parent_id, offset, now, &mut next_id))
}

fn expand_from<F>(
    items: &mut Vec<Item>,
    outline_id: &str,
    nodes: &[TemplateNode],
    parent_id: Option<&str>,
    first_order: i64,
    now: DateTime<Utc>,
    next_id: &mut F,
) -> Vec<ItemNode>
where
    F: FnMut() -> String,
{
    let mut created = Vec::with_capacity(nodes.len());
    for (index, node) in nodes.iter().enumerate() {
        created.push(materialize(
            items,
            outline_id,
            node,
            parent_id.map(str::to_string),
            first_order.saturating_add(index as i64),
            1,
            now,
            next_id,
        ));
    }
    created
}

#[allow(clippy::too_many_arguments)]
fn materialize<F>(
    items: &mut Vec<Item>,
    outline_id: &str,
    node: &TemplateNode,
    parent_id: Option<String>,
    order: i64,
    depth: usize,
    now: DateTime<Utc>,
    next_id: &mut F,
) -> ItemNode
where
    F: FnMut() -> String,
{
    let mut item = Item::new(
        next_id(),
        outline_id,
        node.content.clone(),
        parent_id,
        order,
        now,
    );
    item.style = node.style.clone();
    item.formatting = node.formatting.clone();
    items.push(item.clone());

    let mut rendered = ItemNode::leaf(item);
    if depth >= MAX_TREE_DEPTH {
        return rendered;
    }
    for (index, child) in node.children.iter().enumerate() {
        let child = materialize(
            items,
            outline_id,
            child,
            Some(rendered.item.id.clone()),
            index as i64,
            depth + 1,
            now,
            next_id,
        );
        rendered.children.push(child);
    }
    rendered
}

/// Turn a leveled sequence into nested nodes. Each entry hangs under the
/// most recent earlier entry with a lower level, else at the top.
pub fn nest_by_level<I>(entries: I) -> Vec<TemplateNode>
where
    I: IntoIterator<Item = (String, usize)>,
{
    let mut roots = Vec::new();
    let mut open: Vec<(usize, TemplateNode)> = Vec::new();

    for (content, level) in entries {
        close_until(&mut open, &mut roots, level);
        open.push((level, TemplateNode::text(content)));
    }
    close_until(&mut open, &mut roots, 0);
    roots
}

fn close_until(open: &mut Vec<(usize, TemplateNode)>, roots: &mut Vec<TemplateNode>, level: usize) {
    while open.last().is_some_and(|(top, _)| *top >= level) {
        let Some((_, node)) = open.pop() else { break };
        match open.last_mut() {
            Some((_, parent)) => parent.children.push(node),
            None => roots.push(node),
        }
    }
}

/// Flatten rendered nodes back into items, parents before children.
pub fn flatten(nodes: Vec<ItemNode>) -> Vec<Item> {
    let mut out = Vec::new();
    let mut stack: Vec<ItemNode> = nodes.into_iter().rev().collect();
    while let Some(node) = stack.pop() {
        stack.extend(node.children.into_iter().rev());
        out.push(node.item);
    }
    out
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
            format!("t{n}")
        }
    }

    fn brainlift() -> Vec<TemplateNode> {
        serde_json::from_str(
            r#"[
                {"text": "Title", "style": "header", "children": [{"text": "Untitled"}]},
                {"content": "Purpose", "children": [{"text": "a"}, {"text": "b"}]}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_expand_links_new_parents() {
        let mut items = Vec::new();
        let created = expand_under(&mut items, "o", &brainlift(), None, Utc::now(), counter())
            .unwrap();

        assert_eq!(created.len(), 2);
        assert_eq!(items.len(), 5);
        assert_eq!(created[0].item.style.as_deref(), Some("header"));
        assert_eq!(created[1].children[1].item.order, 1);
        assert_eq!(
            created[1].children[0].item.parent_id.as_deref(),
            Some(created[1].item.id.as_str())
        );
        assert_eq!(build_hierarchy(&items), created);
    }

    #[test]
    fn test_expand_under_appends_after_existing() {
        let mut items = vec![make_item("a", None, 0), make_item("b", None, 1)];
        let created = expand_under(&mut items, "o", &brainlift(), None, Utc::now(), counter())
            .unwrap();
        assert_eq!(created[0].item.order, 2);
        assert_eq!(created[1].item.order, 3);
        assert_eq!(created[0].children[0].item.order, 0);
    }

    #[test]
    fn test_template_orders_ignore_existing_roots() {
        let mut items = vec![make_item("a", None, 0), make_item("b", None, 1)];
        let request = TemplateRequest {
            items: vec![TemplateNode::text("x"), TemplateNode::text("y")],
            clear_existing: false,
        };
        let created = apply_template(&mut items, "o", &request, Utc::now(), counter()).unwrap();
        let orders: Vec<i64> = created.iter().map(|n| n.item.order).collect();
        assert_eq!(orders, vec![0, 1]);
        assert_eq!(items.len(), 4);
        assert_eq!(find(&items, "a").unwrap().order, 0);
    }

    #[test]
    fn test_clear_existing() {
        let mut items = vec![make_item("a", None, 0)];
        let request = TemplateRequest {
            items: brainlift(),
            clear_existing: true,
        };
        let created = apply_template(&mut items, "o", &request, Utc::now(), counter()).unwrap();
        assert!(find(&items, "a").is_none());
        assert_eq!(created[0].item.order, 0);
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let mut items = vec![make_item("a", None, 0)];
        let err = expand_under(&mut items, "o", &brainlift(), Some("nope"), Utc::now(), counter())
            .unwrap_err();
        assert_eq!(err, EditError::ParentNotFound("nope".into()));
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_nest_by_level() {
        let nodes = nest_by_level(vec![
            ("Groceries".to_string(), 0),
            ("milk".to_string(), 1),
            ("whole".to_string(), 2),
            ("eggs".to_string(), 1),
            ("Chores".to_string(), 0),
        ]);
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].children.len(), 2);
        assert_eq!(nodes[0].children[0].children[0].content, "whole");
        assert_eq!(nodes[1].content, "Chores");
    }

    #[test]
    fn test_nest_leading_deep_level_is_top() {
        let nodes = nest_by_level(vec![("deep".to_string(), 2), ("shallow".to_string(), 1)]);
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn test_flatten_parents_first() {
        let mut items = Vec::new();
        let created = expand_under(&mut items, "o", &brainlift(), None, Utc::now(), counter())
            .unwrap();
        let flat = flatten(created);
        let ids: Vec<&str> = flat.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t2", "t3", "t4", "t5"]);
    }
}
