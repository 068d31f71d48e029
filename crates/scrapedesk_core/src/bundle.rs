use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Team identifier stamped on every result bundle.
pub const TEAM_ID: &str = "aline123";

/// Downloadable result: every collected item, in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultBundle {
    pub team_id: String,
    pub items: Vec<Value>,
}

impl ResultBundle {
    pub fn new(items: Vec<Value>) -> Self {
        Self {
            team_id: TEAM_ID.to_string(),
            items,
        }
    }

    /// Two-space indented JSON text, as offered for download.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
