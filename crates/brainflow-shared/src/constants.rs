/// Application name
pub const APP_NAME: &str = "BrainFlow";

/// API prefix mounted by the HTTP server
pub const API_PREFIX: &str = "/api/v1";

/// Deepest nesting level the tree engine will render or materialize
pub const MAX_TREE_DEPTH: usize = 100;

/// Access token lifetime in minutes
pub const ACCESS_TOKEN_MINUTES: i64 = 15;

/// Refresh token lifetime in days
pub const REFRESH_TOKEN_DAYS: i64 = 7;

/// Password salt size in bytes
pub const SALT_SIZE: usize = 16;

/// Ed25519 signing seed size in bytes
pub const SIGNING_SEED_SIZE: usize = 32;

/// Id prefixes, one per document kind
pub const ITEM_ID_PREFIX: &str = "item";
pub const OUTLINE_ID_PREFIX: &str = "outline";
pub const USER_ID_PREFIX: &str = "user";

/// Key derivation context for password hashing (BLAKE3)
pub const KDF_CONTEXT_PASSWORD: &str = "brainflow-password-v1";

/// Default HTTP API port
pub const DEFAULT_HTTP_PORT: u16 = 8000;
