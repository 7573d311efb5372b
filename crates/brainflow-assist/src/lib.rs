//! # brainflow-assist
//!
//! Content generation for BrainFlow: LLM-drafted outline content for the
//! Brainlift sections, voice transcription, and turning free text into
//! leveled outline items.
//!
//! Every entry point goes through [`AssistService`], which bounds upstream
//! calls with a timeout and applies the configured [`FallbackPolicy`] when
//! the generator is missing or misbehaves.

pub mod action;
pub mod canned;
pub mod command;
pub mod generator;
pub mod llm;
pub mod prompt;
pub mod sections;
pub mod voice;

mod error;

pub use action::{ActionResult, ActionType, LlmActionRequest, LlmActionResponse};
pub use error::AssistError;
pub use generator::{AssistConfig, AssistService, ContentGenerator, FallbackPolicy};
pub use voice::{StructuredItem, Transcriber, Transcript};
