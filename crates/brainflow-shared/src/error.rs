use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Password hash error: {0}")]
    PasswordHash(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenError {
    #[error("Malformed token")]
    Malformed,

    #[error("Invalid token signature")]
    BadSignature,

    #[error("Token expired")]
    Expired,

    #[error("Invalid token type: expected {expected}")]
    WrongKind { expected: &'static str },
}

/// Structural edits rejected by the tree engine.
///
/// Indent and outdent do not use this type: their "not possible" outcome is
/// a `None` result, not an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Parent item not found: {0}")]
    ParentNotFound(String),

    #[error("Cannot place item {item} under its own subtree ({parent})")]
    WouldCycle { item: String, parent: String },

    #[error("Missing field: {0}")]
    MissingField(&'static str),
}
