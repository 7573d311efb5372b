//! Spoken edit commands: "delete groceries", "add call mom",
//! "change monday to tuesday".

use std::sync::OnceLock;

use brainflow_shared::tree::{collect_subtree_ids, insert_item};
use brainflow_shared::Item;
use chrono::{DateTime, Utc};
use regex::{NoExpand, Regex, RegexBuilder};

const STOP_WORDS: [&str; 5] = ["delete", "remove", "the", "a", "an"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceCommand {
    /// Remove every item whose content contains the keyword, with subtrees.
    Delete { keyword: String },
    /// Append a root item.
    Add { content: String },
    /// Replace text in every item, ignoring case.
    Change { from: String, to: String },
    Unrecognized,
}

struct Patterns {
    delete: Regex,
    add: Regex,
    change: Regex,
    word: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let build = |pattern: &str| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .expect("static regex")
        };
        Patterns {
            delete: build(r"\b(delete|remove)\b"),
            add: build(r"\b(?:add|insert)\s+(.+)"),
            change: build(r"\b(?:change|update|modify)\s+(.+?)\s+to\s+(.+)"),
            word: build(r"\b\w+\b"),
        }
    })
}

impl VoiceCommand {
    pub fn parse(command: &str) -> Self {
        let p = patterns();
        let command = command.trim();

        if p.delete.is_match(command) {
            let lower = command.to_lowercase();
            return p
                .word
                .find_iter(&lower)
                .map(|m| m.as_str())
                .find(|word| !STOP_WORDS.contains(word))
                .map(|keyword| VoiceCommand::Delete {
                    keyword: keyword.to_string(),
                })
                .unwrap_or(VoiceCommand::Unrecognized);
        }

        if let Some(caps) = p.add.captures(command) {
            return VoiceCommand::Add {
                content: capitalize(caps[1].trim()),
            };
        }

        if let Some(caps) = p.change.captures(command) {
            return VoiceCommand::Change {
                from: caps[1].trim().to_string(),
                to: caps[2].trim().to_string(),
            };
        }

        VoiceCommand::Unrecognized
    }

    /// Apply to an outline's items. Returns how many items were touched.
    pub fn apply<F>(
        &self,
        items: &mut Vec<Item>,
        outline_id: &str,
        now: DateTime<Utc>,
        next_id: F,
    ) -> usize
    where
        F: FnOnce() -> String,
    {
        match self {
            VoiceCommand::Delete { keyword } => {
                let mut doomed = std::collections::HashSet::new();
                for item in items.iter() {
                    if item.content.to_lowercase().contains(keyword.as_str()) {
                        doomed.extend(collect_subtree_ids(items, &item.id));
                    }
                }
                let before = items.len();
                items.retain(|item| !doomed.contains(&item.id));
                before - items.len()
            }
            VoiceCommand::Add { content } => {
                let item = Item::new(next_id(), outline_id, content.clone(), None, 0, now);
                // Root inserts have no parent to resolve
                usize::from(insert_item(items, item, None).is_ok())
            }
            VoiceCommand::Change { from, to } => {
                let Ok(pattern) = RegexBuilder::new(&regex::escape(from))
                    .case_insensitive(true)
                    .build()
                else {
                    return 0;
                };
                let mut changed = 0;
                for item in items.iter_mut() {
                    if pattern.is_match(&item.content) {
                        item.content = pattern
                            .replace_all(&item.content, NoExpand(to))
                            .into_owned();
                        item.touch(now);
                        changed += 1;
                    }
                }
                changed
            }
            VoiceCommand::Unrecognized => 0,
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
