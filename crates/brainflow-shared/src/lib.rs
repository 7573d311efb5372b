//! # brainflow-shared
//!
//! Data model and pure outline logic shared by every BrainFlow crate.
//!
//! The tree engine ([`tree`], [`batch`], [`template`]) works on the flat
//! item list stored inside an outline document. It performs no I/O: callers
//! load the list, hand it over together with a clock value and an id source,
//! and persist whatever comes back.

pub mod batch;
pub mod constants;
pub mod error;
pub mod ids;
pub mod models;
pub mod password;
pub mod session;
pub mod template;
pub mod tree;

pub use error::{EditError, SharedError, TokenError};
pub use models::*;
