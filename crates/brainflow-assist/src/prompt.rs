use brainflow_shared::tree::build_hierarchy;
use brainflow_shared::{Item, ItemNode};

use crate::action::{ActionType, LlmActionRequest, TargetSection};

pub const ACTION_SYSTEM: &str = "You are an assistant helping write Brainlift documents: \
structured outlines with the sections Title, Owner, Purpose, SPOV (DOK 4), Insights (DOK 3), \
Knowledge Tree (DOK 2), Evidence & Facts (DOK 1) and Expert Advisory Council. \
Answer with a single JSON object and nothing else.";

pub const STRUCTURE_SYSTEM: &str =
    "You are a helpful assistant that structures text into hierarchical outlines.";

/// Render an item list as an indented bullet list.
pub fn render_outline(items: &[Item]) -> String {
    fn walk(nodes: &[ItemNode], depth: usize, out: &mut String) {
        for node in nodes {
            out.push_str(&"  ".repeat(depth));
            out.push_str("- ");
            out.push_str(&node.item.content);
            out.push('\n');
            walk(&node.children, depth + 1, out);
        }
    }

    let mut out = String::new();
    walk(&build_hierarchy(items), 0, &mut out);
    out
}

fn response_contract(kind: ActionType) -> &'static str {
    match kind {
        ActionType::Create => {
            r#"Respond as {"items": [{"text": "...", "children": [...]}], "suggestions": ["..."]}."#
        }
        ActionType::Edit => {
            r#"Respond as {"content": "replacement text", "suggestions": ["..."]}."#
        }
        ActionType::Research => {
            r#"Respond as {"content": "summary", "citations": [{"text": "...", "source": "...", "url": null}], "suggestions": ["..."]}."#
        }
    }
}

pub fn action_prompt(
    request: &LlmActionRequest,
    target: Option<&TargetSection>,
    snapshot: &[Item],
) -> String {
    let mut prompt = format!("Action: {}\n", request.kind.as_str());
    if let Some(target) = target {
        prompt.push_str(&format!("Target section: {}\n", target.section));
    }
    if let Some(current) = request.current_content.as_deref() {
        prompt.push_str(&format!("Current content: {current}\n"));
    }
    if !snapshot.is_empty() {
        prompt.push_str("\nCurrent outline:\n");
        prompt.push_str(&render_outline(snapshot));
    }
    prompt.push_str(&format!("\nRequest: {}\n\n", request.user_prompt));
    prompt.push_str(response_contract(request.kind));
    prompt
}

pub fn structure_prompt(text: &str) -> String {
    format!(
        "Convert the following text into a hierarchical outline structure. \
         Create main topics and subtopics based on the content. \
         Return a JSON array where each item has 'content' (the text) and 'level' \
         (0 for main topics, 1 for subtopics, etc).\n\n\
         Text to structure:\n{text}\n\n\
         Return only the JSON array, no other text."
    )
}

pub fn improve_prompt(text: &str) -> String {
    structure_prompt(&format!("Improve and reorganize this outline:\n{text}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sections::default_brainlift;
    use chrono::Utc;

    #[test]
    fn test_render_nested() {
        let rendered = render_outline(&default_brainlift(Utc::now()));
        assert!(rendered.starts_with("- [Title]: [Subtitle]\n"));
        assert!(rendered.contains("\n  - Out of scope:\n"));
    }

    #[test]
    fn test_action_prompt_carries_context() {
        let request = LlmActionRequest {
            kind: ActionType::Edit,
            user_prompt: "make it punchier".into(),
            target_id: None,
            parent_id: None,
            section: None,
            current_content: Some("old text".into()),
        };
        let target = TargetSection {
            section: "purpose".into(),
            item_id: None,
        };
        let prompt = action_prompt(&request, Some(&target), &default_brainlift(Utc::now()));
        assert!(prompt.contains("Target section: purpose"));
        assert!(prompt.contains("Current content: old text"));
        assert!(prompt.contains("- Expert Advisory Council"));
        assert!(prompt.contains(r#""content": "replacement text""#));
    }
}
