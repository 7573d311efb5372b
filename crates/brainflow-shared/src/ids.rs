//! Server-side id generation.
//!
//! Ids have the shape `<prefix>_<unix-micros>_<8 hex chars>`. The random
//! suffix keeps ids unique when a batch or template expansion creates many
//! items within the same microsecond.

use chrono::Utc;
use uuid::Uuid;

use crate::constants::{ITEM_ID_PREFIX, OUTLINE_ID_PREFIX, USER_ID_PREFIX};

pub fn generate_id(prefix: &str) -> String {
    let micros = Utc::now().timestamp_micros();
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{prefix}_{micros}_{}", &suffix[..8])
}

pub fn new_item_id() -> String {
    generate_id(ITEM_ID_PREFIX)
}

pub fn new_outline_id() -> String {
    generate_id(OUTLINE_ID_PREFIX)
}

pub fn new_user_id() -> String {
    generate_id(USER_ID_PREFIX)
}
