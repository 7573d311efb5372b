//! Tree engine over an outline's flat item list.
//!
//! The flat list is the source of truth. Rendering never fails: items whose
//! parent chain is broken, cyclic, or deeper than [`MAX_TREE_DEPTH`] are left
//! out of the hierarchy. Structural edits work in place on a list the caller
//! owns for the duration of the call.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};

use crate::constants::MAX_TREE_DEPTH;
use crate::error::EditError;
use crate::models::{Item, ItemNode, ItemUpdate};

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Build the hierarchical view of a flat item list.
///
/// Roots and every sibling list are sorted by `order`; equal orders keep
/// their input sequence. When two items share an id only the first is used.
pub fn build_hierarchy(items: &[Item]) -> Vec<ItemNode> {
    let index = index_by_id(items);
    let depths = resolve_depths(items, &index);

    let mut children: HashMap<Option<&str>, Vec<&Item>> = HashMap::new();
    for (item, depth) in items.iter().zip(&depths) {
        if depth.is_some() {
            children
                .entry(item.parent_id.as_deref())
                .or_default()
                .push(item);
        }
    }
    for siblings in children.values_mut() {
        siblings.sort_by_key(|item| item.order);
    }

    attach(None, 0, &children)
}

fn attach<'a>(
    parent: Option<&'a str>,
    depth: usize,
    children: &HashMap<Option<&'a str>, Vec<&'a Item>>,
) -> Vec<ItemNode> {
    if depth >= MAX_TREE_DEPTH {
        return Vec::new();
    }
    let Some(siblings) = children.get(&parent) else {
        return Vec::new();
    };
    siblings
        .iter()
        .map(|item| ItemNode {
            item: (*item).clone(),
            children: attach(Some(item.id.as_str()), depth + 1, children),
        })
        .collect()
}

/// First position of every id.
fn index_by_id(items: &[Item]) -> HashMap<&str, usize> {
    let mut index = HashMap::with_capacity(items.len());
    for (pos, item) in items.iter().enumerate() {
        index.entry(item.id.as_str()).or_insert(pos);
    }
    index
}

#[derive(Clone, Copy)]
enum Visit {
    Unvisited,
    OnPath,
    Done(Option<usize>),
}

/// Depth of every item in the rendered tree, `None` when it is excluded.
///
/// Walks each parent chain iteratively, memoizing results, so a long or
/// cyclic chain costs no stack.
fn resolve_depths(items: &[Item], index: &HashMap<&str, usize>) -> Vec<Option<usize>> {
    let mut visit = vec![Visit::Unvisited; items.len()];

    for start in 0..items.len() {
        if !matches!(visit[start], Visit::Unvisited) {
            continue;
        }
        if index.get(items[start].id.as_str()) != Some(&start) {
            // shadowed duplicate id
            visit[start] = Visit::Done(None);
            continue;
        }

        let mut path = Vec::new();
        let mut cursor = start;
        // depth of the last node pushed onto `path`, if it is reachable
        let top_depth = loop {
            match visit[cursor] {
                Visit::Done(depth) => break depth.map(|d| d + 1),
                Visit::OnPath => break None,
                Visit::Unvisited => {}
            }
            visit[cursor] = Visit::OnPath;
            path.push(cursor);

            match items[cursor].parent_id.as_deref() {
                None => break Some(0),
                Some(parent_id) => match index.get(parent_id) {
                    Some(&parent) => cursor = parent,
                    None => break None,
                },
            }
        };

        let mut depth = top_depth;
        for &node in path.iter().rev() {
            let resolved = depth.filter(|d| *d < MAX_TREE_DEPTH);
            visit[node] = Visit::Done(resolved);
            depth = resolved.map(|d| d + 1);
        }
    }

    visit
        .into_iter()
        .map(|v| match v {
            Visit::Done(depth) => depth,
            _ => None,
        })
        .collect()
}

/// Count the nodes of a rendered hierarchy.
pub fn count_nodes(nodes: &[ItemNode]) -> usize {
    nodes.iter().map(ItemNode::count).sum()
}

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

pub fn find<'a>(items: &'a [Item], id: &str) -> Option<&'a Item> {
    items.iter().find(|item| item.id == id)
}

fn position_of(items: &[Item], id: &str) -> Option<usize> {
    items.iter().position(|item| item.id == id)
}

/// Number of items directly under `parent_id` (`None` = root level).
pub fn sibling_count(items: &[Item], parent_id: Option<&str>) -> usize {
    items.iter().filter(|item| item.is_child_of(parent_id)).count()
}

/// The target id plus the ids of all its descendants.
pub fn collect_subtree_ids(items: &[Item], root_id: &str) -> HashSet<String> {
    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    for item in items {
        if let Some(parent) = item.parent_id.as_deref() {
            children.entry(parent).or_default().push(item.id.as_str());
        }
    }

    let mut found = HashSet::new();
    found.insert(root_id.to_string());
    let mut queue = VecDeque::from([root_id]);
    while let Some(current) = queue.pop_front() {
        for &child in children.get(current).into_iter().flatten() {
            if found.insert(child.to_string()) {
                queue.push_back(child);
            }
        }
    }
    found
}

/// Check that `parent_id` can hold `item_id` without creating a cycle.
fn check_parent(items: &[Item], item_id: &str, parent_id: &str) -> Result<(), EditError> {
    if find(items, parent_id).is_none() {
        return Err(EditError::ParentNotFound(parent_id.to_string()));
    }
    if collect_subtree_ids(items, item_id).contains(parent_id) {
        return Err(EditError::WouldCycle {
            item: item_id.to_string(),
            parent: parent_id.to_string(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Edits
// ---------------------------------------------------------------------------

/// Append a new item. `order` becomes `position` when given, otherwise the
/// current number of siblings under the item's parent.
pub fn insert_item(
    items: &mut Vec<Item>,
    mut item: Item,
    position: Option<i64>,
) -> Result<Item, EditError> {
    if let Some(parent) = item.parent_id.as_deref() {
        if find(items, parent).is_none() {
            return Err(EditError::ParentNotFound(parent.to_string()));
        }
    }
    item.order =
        position.unwrap_or_else(|| sibling_count(items, item.parent_id.as_deref()) as i64);
    items.push(item.clone());
    Ok(item)
}

/// Apply the fields present in `update` to one item.
pub fn update_item(
    items: &mut [Item],
    id: &str,
    update: &ItemUpdate,
    now: DateTime<Utc>,
) -> Result<Item, EditError> {
    let pos = position_of(items, id).ok_or_else(|| EditError::ItemNotFound(id.to_string()))?;
    if let Some(parent) = update.parent_id.as_deref() {
        check_parent(items, id, parent)?;
    }

    let item = &mut items[pos];
    if let Some(content) = &update.content {
        item.content = content.clone();
    }
    if let Some(parent) = &update.parent_id {
        item.parent_id = Some(parent.clone());
    }
    if let Some(order) = update.order {
        item.order = order;
    }
    if let Some(style) = &update.style {
        item.style = Some(style.clone());
    }
    if let Some(formatting) = &update.formatting {
        item.formatting = Some(formatting.clone());
    }
    item.touch(now);
    Ok(item.clone())
}

/// Reparent an item. Sibling orders are not renumbered; a given `order` is
/// trusted as-is.
pub fn move_item(
    items: &mut [Item],
    id: &str,
    parent_id: Option<&str>,
    order: Option<i64>,
    now: DateTime<Utc>,
) -> Result<Item, EditError> {
    let pos = position_of(items, id).ok_or_else(|| EditError::ItemNotFound(id.to_string()))?;
    if let Some(parent) = parent_id {
        check_parent(items, id, parent)?;
    }

    let item = &mut items[pos];
    item.parent_id = parent_id.map(str::to_string);
    if let Some(order) = order {
        item.order = order;
    }
    item.touch(now);
    Ok(item.clone())
}

/// Remove an item and its whole subtree. Returns how many items were removed.
pub fn remove_subtree(items: &mut Vec<Item>, id: &str) -> Result<usize, EditError> {
    if find(items, id).is_none() {
        return Err(EditError::ItemNotFound(id.to_string()));
    }
    let doomed = collect_subtree_ids(items, id);
    let before = items.len();
    items.retain(|item| !doomed.contains(&item.id));
    Ok(before - items.len())
}

/// Make an item the first child of its preceding sibling.
///
/// Returns `None`, leaving the list untouched, when the item is unknown or
/// has no sibling with a lower `order`.
pub fn indent(items: &mut [Item], id: &str, now: DateTime<Utc>) -> Option<Item> {
    let target = position_of(items, id)?;
    let parent = items[target].parent_id.clone();
    let order = items[target].order;

    // `max_by_key` keeps the last of equal maxima, i.e. the latest in list order
    let previous = items
        .iter()
        .enumerate()
        .filter(|(pos, item)| {
            *pos != target && item.parent_id == parent && item.order < order
        })
        .max_by_key(|(_, item)| item.order)
        .map(|(pos, _)| pos)?;
    let new_parent = items[previous].id.clone();

    let mut existing: Vec<usize> = items
        .iter()
        .enumerate()
        .filter(|(pos, item)| *pos != target && item.is_child_of(Some(new_parent.as_str())))
        .map(|(pos, _)| pos)
        .collect();
    existing.sort_by_key(|&pos| items[pos].order);
    for (rank, &pos) in existing.iter().enumerate() {
        let renumbered = rank as i64 + 1;
        if items[pos].order != renumbered {
            items[pos].order = renumbered;
            items[pos].touch(now);
        }
    }

    let item = &mut items[target];
    item.parent_id = Some(new_parent);
    item.order = 0;
    item.touch(now);
    Some(item.clone())
}

/// Promote an item to sit right after its parent.
///
/// Returns `None`, leaving the list untouched, when the item is unknown, is
/// already a root, or its parent cannot be resolved.
pub fn outdent(items: &mut [Item], id: &str, now: DateTime<Utc>) -> Option<Item> {
    let target = position_of(items, id)?;
    let parent_id = items[target].parent_id.clone()?;
    let parent = position_of(items, &parent_id)?;
    let parent_order = items[parent].order;
    let grandparent = items[parent].parent_id.clone();

    if grandparent.as_deref() == Some(id) {
        // two-node cycle; promoting would make the item its own parent
        return None;
    }

    let new_order = match grandparent.as_deref() {
        Some(grandparent_id) => {
            let shifted = |pos: usize, item: &Item| {
                pos != target && item.is_child_of(Some(grandparent_id)) && item.order > parent_order
            };
            // a sibling already at i64::MAX has nowhere to shift to
            let new_order = parent_order.checked_add(1)?;
            if items
                .iter()
                .enumerate()
                .any(|(pos, item)| shifted(pos, item) && item.order == i64::MAX)
            {
                return None;
            }
            for (pos, item) in items.iter_mut().enumerate() {
                if shifted(pos, &*item) {
                    item.order += 1;
                    item.touch(now);
                }
            }
            new_order
        }
        None => items
            .iter()
            .enumerate()
            .filter(|(pos, item)| *pos != target && item.is_root())
            .count() as i64,
    };

    let item = &mut items[target];
    item.parent_id = grandparent;
    item.order = new_order;
    item.touch(now);
    Some(item.clone())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn make_item(id: &str, parent: Option<&str>, order: i64) -> Item {
        let epoch = DateTime::<Utc>::from_timestamp(0, 0).unwrap();
        Item::new(
            id.to_string(),
            "outline_test",
            format!("Item {id}"),
            parent.map(str::to_string),
            order,
            epoch,
        )
    }

    fn ids(nodes: &[ItemNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.item.id.as_str()).collect()
    }

    fn nested() -> Vec<Item> {
        vec![
            make_item("item_1", None, 0),
            make_item("item_1_1", Some("item_1"), 0),
            make_item("item_1_2", Some("item_1"), 1),
            make_item("item_1_2_1", Some("item_1_2"), 0),
            make_item("item_1_2_2", Some("item_1_2"), 1),
            make_item("item_1_3", Some("item_1"), 2),
        ]
    }

    #[test]
    fn test_build_nested_hierarchy() {
        let tree = build_hierarchy(&nested());
        assert_eq!(ids(&tree), vec!["item_1"]);
        assert_eq!(
            ids(&tree[0].children),
            vec!["item_1_1", "item_1_2", "item_1_3"]
        );
        assert_eq!(
            ids(&tree[0].children[1].children),
            vec!["item_1_2_1", "item_1_2_2"]
        );
        assert!(tree[0].children[0].children.is_empty());
    }

    #[test]
    fn test_build_is_idempotent() {
        let items = nested();
        assert_eq!(build_hierarchy(&items), build_hierarchy(&items));
    }

    #[test]
    fn test_build_is_complete() {
        let items = nested();
        assert_eq!(count_nodes(&build_hierarchy(&items)), items.len());
    }

    #[test]
    fn test_build_empty() {
        assert!(build_hierarchy(&[]).is_empty());
    }

    #[test]
    fn test_two_node_cycle_renders_nothing() {
        let items = vec![make_item("a", Some("b"), 0), make_item("b", Some("a"), 0)];
        assert!(build_hierarchy(&items).is_empty());
    }

    #[test]
    fn test_self_reference_renders_nothing() {
        let items = vec![make_item("a", Some("a"), 0)];
        assert!(build_hierarchy(&items).is_empty());
    }

    #[test]
    fn test_chain_into_cycle_is_excluded() {
        let items = vec![
            make_item("root", None, 0),
            make_item("a", Some("b"), 0),
            make_item("b", Some("a"), 0),
            make_item("c", Some("a"), 0),
        ];
        let tree = build_hierarchy(&items);
        assert_eq!(ids(&tree), vec!["root"]);
        assert_eq!(count_nodes(&tree), 1);
    }

    #[test]
    fn test_siblings_sorted_by_order() {
        let items = vec![
            make_item("root", None, 0),
            make_item("child3", Some("root"), 2),
            make_item("child1", Some("root"), 0),
            make_item("child2", Some("root"), 1),
        ];
        let tree = build_hierarchy(&items);
        assert_eq!(
            ids(&tree[0].children),
            vec!["child1", "child2", "child3"]
        );
    }

    #[test]
    fn test_equal_orders_keep_input_sequence() {
        let items = vec![
            make_item("x", None, 1),
            make_item("y", None, 0),
            make_item("z", None, 1),
        ];
        assert_eq!(ids(&build_hierarchy(&items)), vec!["y", "x", "z"]);
    }

    #[test]
    fn test_orphan_excluded_siblings_kept() {
        let items = vec![
            make_item("root", None, 0),
            make_item("kid", Some("root"), 0),
            make_item("orphan", Some("non_existent"), 0),
            make_item("orphan_kid", Some("orphan"), 0),
        ];
        let tree = build_hierarchy(&items);
        assert_eq!(ids(&tree), vec!["root"]);
        assert_eq!(ids(&tree[0].children), vec!["kid"]);
        assert_eq!(count_nodes(&tree), 2);
    }

    #[test]
    fn test_duplicate_id_rendered_once() {
        let items = vec![make_item("a", None, 0), make_item("a", None, 1)];
        assert_eq!(count_nodes(&build_hierarchy(&items)), 1);
    }

    #[test]
    fn test_depth_is_bounded() {
        let mut items = vec![make_item("n0", None, 0)];
        for depth in 1..(MAX_TREE_DEPTH + 20) {
            let parent = format!("n{}", depth - 1);
            items.push(make_item(&format!("n{depth}"), Some(&parent), 0));
        }
        let tree = build_hierarchy(&items);
        assert_eq!(count_nodes(&tree), MAX_TREE_DEPTH);
    }

    #[test]
    fn test_collect_subtree() {
        let items = nested();
        let found = collect_subtree_ids(&items, "item_1_2");
        let expected: HashSet<String> = ["item_1_2", "item_1_2_1", "item_1_2_2"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_collect_subtree_survives_cycle() {
        let items = vec![make_item("a", Some("b"), 0), make_item("b", Some("a"), 0)];
        assert_eq!(collect_subtree_ids(&items, "a").len(), 2);
    }

    #[test]
    fn test_remove_subtree_keeps_siblings() {
        let mut items = vec![
            make_item("x", None, 0),
            make_item("y", Some("x"), 0),
            make_item("z", Some("y"), 0),
            make_item("sibling", None, 1),
        ];
        assert_eq!(remove_subtree(&mut items, "x"), Ok(3));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "sibling");
        assert_eq!(items[0].order, 1);
    }

    #[test]
    fn test_remove_unknown_item() {
        let mut items = nested();
        assert_eq!(
            remove_subtree(&mut items, "nope"),
            Err(EditError::ItemNotFound("nope".into()))
        );
        assert_eq!(items.len(), 6);
    }

    #[test]
    fn test_indent_first_sibling_not_possible() {
        let mut items = vec![make_item("a", None, 0), make_item("b", None, 1)];
        let before = items.clone();
        assert!(indent(&mut items, "a", Utc::now()).is_none());
        assert_eq!(items, before);
    }

    #[test]
    fn test_indent_under_previous_sibling() {
        let mut items = vec![make_item("a", None, 0), make_item("b", None, 1)];
        let now = Utc::now();
        let moved = indent(&mut items, "b", now).unwrap();
        assert_eq!(moved.parent_id.as_deref(), Some("a"));
        assert_eq!(moved.order, 0);
        assert_eq!(moved.updated_at, now);
        assert_eq!(items[1], moved);
    }

    #[test]
    fn test_indent_renumbers_existing_children() {
        let mut items = vec![
            make_item("a", None, 0),
            make_item("a2", Some("a"), 5),
            make_item("a1", Some("a"), 2),
            make_item("b", None, 1),
        ];
        indent(&mut items, "b", Utc::now()).unwrap();
        let tree = build_hierarchy(&items);
        assert_eq!(ids(&tree[0].children), vec!["b", "a1", "a2"]);
        assert_eq!(find(&items, "a1").unwrap().order, 1);
        assert_eq!(find(&items, "a2").unwrap().order, 2);
    }

    #[test]
    fn test_indent_picks_nearest_lower_order() {
        let mut items = vec![
            make_item("a", None, 0),
            make_item("c", None, 4),
            make_item("b", None, 2),
        ];
        let moved = indent(&mut items, "c", Utc::now()).unwrap();
        assert_eq!(moved.parent_id.as_deref(), Some("b"));
    }

    #[test]
    fn test_indent_unknown_item() {
        let mut items = nested();
        assert!(indent(&mut items, "ghost", Utc::now()).is_none());
    }

    #[test]
    fn test_outdent_root_not_possible() {
        let mut items = vec![make_item("a", None, 0)];
        let before = items.clone();
        assert!(outdent(&mut items, "a", Utc::now()).is_none());
        assert_eq!(items, before);
    }

    #[test]
    fn test_outdent_to_root_appends() {
        let mut items = vec![make_item("a", None, 0), make_item("b", Some("a"), 0)];
        let moved = outdent(&mut items, "b", Utc::now()).unwrap();
        assert!(moved.parent_id.is_none());
        assert_eq!(moved.order, 1);
        assert_eq!(ids(&build_hierarchy(&items)), vec!["a", "b"]);
    }

    #[test]
    fn test_outdent_makes_room_after_parent() {
        let mut items = vec![
            make_item("root", None, 0),
            make_item("p", Some("root"), 0),
            make_item("q", Some("root"), 1),
            make_item("kid", Some("p"), 0),
        ];
        let moved = outdent(&mut items, "kid", Utc::now()).unwrap();
        assert_eq!(moved.parent_id.as_deref(), Some("root"));
        assert_eq!(moved.order, 1);
        assert_eq!(find(&items, "q").unwrap().order, 2);
        assert_eq!(find(&items, "p").unwrap().order, 0);
        let tree = build_hierarchy(&items);
        assert_eq!(ids(&tree[0].children), vec!["p", "kid", "q"]);
    }

    #[test]
    fn test_outdent_refuses_order_overflow() {
        let mut items = vec![
            make_item("g", None, 0),
            make_item("p", Some("g"), 0),
            make_item("q", Some("g"), i64::MAX),
            make_item("kid", Some("p"), 0),
        ];
        let before = items.clone();
        assert!(outdent(&mut items, "kid", Utc::now()).is_none());
        assert_eq!(items, before);

        let mut items = vec![
            make_item("g", None, 0),
            make_item("p", Some("g"), i64::MAX),
            make_item("kid", Some("p"), 0),
        ];
        assert!(outdent(&mut items, "kid", Utc::now()).is_none());
        assert_eq!(find(&items, "kid").unwrap().parent_id.as_deref(), Some("p"));
    }

    #[test]
    fn test_outdent_with_missing_parent() {
        let mut items = vec![make_item("orphan", Some("gone"), 0)];
        assert!(outdent(&mut items, "orphan", Utc::now()).is_none());
    }

    #[test]
    fn test_update_rejects_cycle() {
        let mut items = nested();
        let update = ItemUpdate {
            parent_id: Some("item_1_2_1".into()),
            ..Default::default()
        };
        let err = update_item(&mut items, "item_1_2", &update, Utc::now()).unwrap_err();
        assert!(matches!(err, EditError::WouldCycle { .. }));
        assert_eq!(find(&items, "item_1_2").unwrap().parent_id.as_deref(), Some("item_1"));
    }

    #[test]
    fn test_update_is_partial() {
        let mut items = nested();
        let update = ItemUpdate {
            content: Some("Renamed".into()),
            style: Some("header".into()),
            ..Default::default()
        };
        let updated = update_item(&mut items, "item_1_3", &update, Utc::now()).unwrap();
        assert_eq!(updated.content, "Renamed");
        assert_eq!(updated.style.as_deref(), Some("header"));
        assert_eq!(updated.order, 2);
        assert_eq!(updated.parent_id.as_deref(), Some("item_1"));
    }

    #[test]
    fn test_move_to_root_keeps_sibling_orders() {
        let mut items = nested();
        let moved = move_item(&mut items, "item_1_2", None, Some(7), Utc::now()).unwrap();
        assert!(moved.is_root());
        assert_eq!(moved.order, 7);
        assert_eq!(find(&items, "item_1_3").unwrap().order, 2);
    }

    #[test]
    fn test_insert_appends_after_siblings() {
        let mut items = nested();
        let new = make_item("new", Some("item_1"), 0);
        let inserted = insert_item(&mut items, new, None).unwrap();
        assert_eq!(inserted.order, 3);

        let stray = make_item("stray", Some("missing"), 0);
        assert_eq!(
            insert_item(&mut items, stray, None),
            Err(EditError::ParentNotFound("missing".into()))
        );
        assert_eq!(items.len(), 7);
    }
}
