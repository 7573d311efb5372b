//! Deterministic stand-in content used when the generator is unavailable.
//!
//! Selection is by keyword in the prompt, so the same request always yields
//! the same answer.

use crate::action::{
    ActionResult, ActionType, Citation, CreateResult, EditResult, GeneratedItem,
    LlmActionRequest, ResearchResult,
};
use crate::voice::Transcript;

const TRANSCRIPTS: [&str; 4] = [
    "Today I need to finish the project proposal, review the budget documents, and schedule a meeting with the team",
    "The main features we need are user authentication, real-time sync, and voice input with AI structuring",
    "Meeting notes: discussed quarterly goals, need to increase revenue by 20%, focus on customer retention",
    "Shopping list: milk, bread, eggs, coffee, fruits including apples and bananas, vegetables",
];

fn strings(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn excerpt(prompt: &str) -> String {
    prompt.chars().take(50).collect()
}

fn mentions(prompt: &str, words: &[&str]) -> bool {
    words.iter().any(|word| prompt.contains(word))
}

pub fn action_result(request: &LlmActionRequest) -> ActionResult {
    let prompt = request.user_prompt.to_lowercase();
    match request.kind {
        ActionType::Create if mentions(&prompt, &["spov", "retention", "churn"]) => {
            ActionResult::Create(spov_strategy())
        }
        ActionType::Create => ActionResult::Create(CreateResult {
            items: vec![GeneratedItem::leaf(format!(
                "New content for: {}",
                excerpt(&request.user_prompt)
            ))],
            target_section: None,
            suggestions: strings(&["Tell me more about what you need"]),
        }),
        ActionType::Edit if mentions(&prompt, &["purpose", "pricing"]) => {
            ActionResult::Edit(EditResult {
                content: "To determine whether to maintain our current per-seat pricing model or \
                          transition to usage-based pricing by Q2 2024, based on competitive \
                          analysis and customer feedback from our enterprise segment"
                    .to_string(),
                suggestions: strings(&[
                    "Add specific decision criteria",
                    "Include key stakeholders who need to approve",
                    "Define what success looks like",
                ]),
            })
        }
        ActionType::Edit => ActionResult::Edit(EditResult {
            content: format!("Edited content based on: {}", excerpt(&request.user_prompt)),
            suggestions: strings(&["Would you like me to add more detail?"]),
        }),
        ActionType::Research if mentions(&prompt, &["market", "pricing", "saas"]) => {
            ActionResult::Research(market_research())
        }
        ActionType::Research => ActionResult::Research(ResearchResult {
            content: "Research findings:".to_string(),
            citations: vec![Citation {
                text: format!("Research result for: {}", excerpt(&request.user_prompt)),
                source: "Example Source".to_string(),
                url: None,
            }],
            suggestions: strings(&["Would you like more specific information?"]),
        }),
    }
}

fn spov_strategy() -> CreateResult {
    CreateResult {
        items: vec![GeneratedItem::branch(
            "AI-Driven Customer Retention Strategy",
            vec![
                GeneratedItem::branch(
                    "Description:",
                    vec![GeneratedItem::leaf(
                        "Implement predictive analytics to identify at-risk customers 30 days before churn",
                    )],
                ),
                GeneratedItem::branch(
                    "Evidence:",
                    vec![
                        GeneratedItem::leaf(
                            "Companies using predictive churn models see 20-25% reduction in attrition",
                        ),
                        GeneratedItem::leaf("Early intervention increases retention success rate by 3x"),
                        GeneratedItem::leaf("Average ROI of $5 for every $1 spent on retention"),
                    ],
                ),
                GeneratedItem::branch(
                    "Implementation Levers:",
                    vec![
                        GeneratedItem::leaf("Deploy ML model on 24 months of customer behavior data"),
                        GeneratedItem::leaf("Create automated intervention workflows"),
                        GeneratedItem::leaf("Establish real-time alerting system"),
                    ],
                ),
            ],
        )],
        target_section: None,
        suggestions: strings(&[
            "Would you like to add specific metrics for measuring success?",
            "Should we include a timeline for implementation?",
            "Do you want to add risk factors to consider?",
        ]),
    }
}

fn market_research() -> ResearchResult {
    ResearchResult {
        content: "Based on current market analysis:".to_string(),
        citations: vec![
            Citation {
                text: "61% of SaaS companies have adopted or are transitioning to usage-based pricing"
                    .to_string(),
                source: "OpenView Partners State of SaaS Pricing 2024".to_string(),
                url: Some("https://example.com/report".to_string()),
            },
            Citation {
                text: "Enterprise buyers show 2.3x preference for predictable per-seat costs"
                    .to_string(),
                source: "Gartner SaaS Buying Behavior Survey".to_string(),
                url: Some("https://example.com/gartner".to_string()),
            },
        ],
        suggestions: strings(&[
            "Would you like me to research competitor pricing models?",
            "Should I analyze your current customer usage patterns?",
        ]),
    }
}

/// A sample transcript picked by audio length.
pub fn transcript(audio_len: usize) -> Transcript {
    Transcript::new(TRANSCRIPTS[audio_len % TRANSCRIPTS.len()], audio_len)
}
