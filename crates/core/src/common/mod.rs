pub mod id;
pub mod time;
pub mod validate;

use serde::{Deserialize, Serialize};

/// # Summary
/// Offset pagination shared by list queries.
///
/// # Invariants
/// - `limit` is clamped to `1..=MAX_PAGE_LIMIT` by [`Page::new`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

pub const MAX_PAGE_LIMIT: u32 = 200;

impl Page {
    pub fn new(limit: Option<u32>, offset: Option<u32>, default_limit: u32) -> Self {
        Self {
            limit: limit.unwrap_or(default_limit).clamp(1, MAX_PAGE_LIMIT),
            offset: offset.unwrap_or(0),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None, 50)
    }
}
