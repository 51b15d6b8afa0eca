use serde::{Deserialize, Serialize};

// Rate-limit snapshot parsed from REST response headers.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct RateMeta {
    pub remaining: Option<i64>,
    pub used: Option<i64>,
    pub reset_at: Option<String>,
}

impl RateMeta {
    pub fn is_low(&self, threshold: i64) -> bool {
        matches!(self.remaining, Some(r) if r < threshold)
    }
}
