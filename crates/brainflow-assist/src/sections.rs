//! The Brainlift document template and keyword-based section detection.

use brainflow_shared::Item;
use chrono::{DateTime, Utc};

use crate::action::{LlmActionRequest, TargetSection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Title,
    Owner,
    Purpose,
    Spov,
    Insights,
    KnowledgeTree,
    Evidence,
    ExpertCouncil,
}

// Checked in this order; the first section with a matching keyword wins.
const SECTIONS: [Section; 8] = [
    Section::Spov,
    Section::Insights,
    Section::KnowledgeTree,
    Section::Evidence,
    Section::ExpertCouncil,
    Section::Purpose,
    Section::Owner,
    Section::Title,
];

impl Section {
    pub fn key(self) -> &'static str {
        match self {
            Section::Title => "title",
            Section::Owner => "owner",
            Section::Purpose => "purpose",
            Section::Spov => "spov",
            Section::Insights => "insights",
            Section::KnowledgeTree => "knowledge_tree",
            Section::Evidence => "evidence",
            Section::ExpertCouncil => "expert_council",
        }
    }

    fn keywords(self) -> &'static [&'static str] {
        match self {
            Section::Title => &["title"],
            Section::Owner => &["owner"],
            Section::Purpose => &["purpose", "out of scope", "initiative"],
            Section::Spov => &["spov", "dok 4", "dok4"],
            Section::Insights => &["insight", "dok3", "dok 3"],
            Section::KnowledgeTree => &["knowledge tree", "dok2", "dok 2"],
            Section::Evidence => &["evidence", "facts", "dok1", "dok 1"],
            Section::ExpertCouncil => &["expert", "advisory"],
        }
    }

    /// Parse an explicit section name (`"spov"`, `"Knowledge Tree"`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.trim().to_lowercase().replace(['-', ' '], "_");
        SECTIONS
            .into_iter()
            .find(|section| section.key() == normalized)
            .or_else(|| Self::detect(name))
    }

    /// First section whose keywords occur in `text`.
    pub fn detect(text: &str) -> Option<Self> {
        let lower = text.to_lowercase();
        SECTIONS.into_iter().find(|section| {
            section
                .keywords()
                .iter()
                .any(|keyword| lower.contains(keyword))
        })
    }
}

/// Map each Brainlift section to the root item that heads it.
pub fn locate_sections(snapshot: &[Item]) -> Vec<(Section, String)> {
    let mut found: Vec<(Section, String)> = Vec::new();
    let mut roots: Vec<&Item> = snapshot.iter().filter(|item| item.is_root()).collect();
    roots.sort_by_key(|item| item.order);

    for item in roots {
        if let Some(section) = Section::detect(&item.content) {
            if !found.iter().any(|(known, _)| *known == section) {
                found.push((section, item.id.clone()));
            }
        }
    }
    found
}

/// Work out which section an action is aimed at: the explicit `section`
/// field first, then keywords in the prompt.
pub fn resolve_target(request: &LlmActionRequest, snapshot: &[Item]) -> Option<TargetSection> {
    let section = request
        .section
        .as_deref()
        .and_then(Section::from_name)
        .or_else(|| Section::detect(&request.user_prompt))?;

    let item_id = locate_sections(snapshot)
        .into_iter()
        .find(|(known, _)| *known == section)
        .map(|(_, id)| id);

    Some(TargetSection {
        section: section.key().to_string(),
        item_id,
    })
}

/// Follow-up prompts offered for a section.
pub fn suggestions_for(section: Option<&str>) -> Vec<String> {
    let list: &[&str] = match section {
        Some("spov") => &[
            "Create an SPOV about customer retention",
            "Add evidence for market opportunity",
            "Define implementation strategy",
        ],
        Some("purpose") => &[
            "Clarify the decision to be made",
            "Add timeline and stakeholders",
            "Define success criteria",
        ],
        _ => &[
            "Help me structure this better",
            "Add more detail",
            "Research best practices",
        ],
    };
    list.iter().map(|s| s.to_string()).collect()
}

/// The empty Brainlift outline used when no real outline is available.
pub fn default_brainlift(now: DateTime<Utc>) -> Vec<Item> {
    const ROWS: [(&str, &str, Option<&str>, i64); 10] = [
        ("1", "[Title]: [Subtitle]", None, 0),
        ("2", "Owner", None, 1),
        ("3", "Purpose", None, 2),
        ("4", "Out of scope:", Some("3"), 0),
        ("5", "Initiative Overview:", Some("3"), 1),
        ("6", "SPOV DOK 4", None, 3),
        ("7", "DOK3 - Insights", None, 4),
        ("8", "DOK2 - Knowledge Tree", None, 5),
        ("9", "DOK1 - Evidence & Facts", None, 6),
        ("10", "Expert Advisory Council", None, 7),
    ];

    ROWS.iter()
        .map(|(id, content, parent, order)| {
            Item::new(
                id.to_string(),
                "brainlift",
                content.to_string(),
                parent.map(str::to_string),
                *order,
                now,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionType;

    fn request(prompt: &str, section: Option<&str>) -> LlmActionRequest {
        LlmActionRequest {
            kind: ActionType::Create,
            user_prompt: prompt.into(),
            target_id: None,
            parent_id: None,
            section: section.map(str::to_string),
            current_content: None,
        }
    }

    #[test]
    fn test_locate_default_sections() {
        let located = locate_sections(&default_brainlift(Utc::now()));
        let lookup = |section| {
            located
                .iter()
                .find(|(s, _)| *s == section)
                .map(|(_, id)| id.as_str())
        };
        assert_eq!(lookup(Section::Title), Some("1"));
        assert_eq!(lookup(Section::Purpose), Some("3"));
        assert_eq!(lookup(Section::Spov), Some("6"));
        assert_eq!(lookup(Section::Insights), Some("7"));
        assert_eq!(lookup(Section::KnowledgeTree), Some("8"));
        assert_eq!(lookup(Section::Evidence), Some("9"));
        assert_eq!(lookup(Section::ExpertCouncil), Some("10"));
    }

    #[test]
    fn test_prompt_keywords_pick_section() {
        let snapshot = default_brainlift(Utc::now());
        let target =
            resolve_target(&request("Write an SPOV on churn", None), &snapshot).unwrap();
        assert_eq!(target.section, "spov");
        assert_eq!(target.item_id.as_deref(), Some("6"));
    }

    #[test]
    fn test_explicit_section_wins() {
        let snapshot = default_brainlift(Utc::now());
        let target = resolve_target(
            &request("Write an SPOV on churn", Some("Knowledge Tree")),
            &snapshot,
        )
        .unwrap();
        assert_eq!(target.section, "knowledge_tree");
        assert_eq!(target.item_id.as_deref(), Some("8"));
    }

    #[test]
    fn test_section_missing_from_outline() {
        let target = resolve_target(&request("add evidence", None), &[]).unwrap();
        assert_eq!(target.section, "evidence");
        assert!(target.item_id.is_none());
    }

    #[test]
    fn test_no_section() {
        assert!(resolve_target(&request("hello there", None), &[]).is_none());
    }

    #[test]
    fn test_suggestions_default_to_general() {
        assert_eq!(suggestions_for(Some("spov")).len(), 3);
        assert_eq!(suggestions_for(None), suggestions_for(Some("nonsense")));
        assert_eq!(suggestions_for(None)[0], "Help me structure this better");
    }
}
