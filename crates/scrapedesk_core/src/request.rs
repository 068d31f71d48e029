use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Client-to-server event that starts a scrape.
pub const SCRAPE_REQUEST_EVENT: &str = "scrape_request";

const FALLBACK_PDF_NAME: &str = "upload.pdf";

/// Payload of the `scrape_request` event.
///
/// Optional fields are left out of the JSON entirely when unset, so a plain URL
/// submission serializes to `{"urls": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeRequest {
    pub urls: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_id: Option<String>,
    /// Server-side headless browser fallback; the server treats a missing key
    /// as enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_selenium: Option<bool>,
}

impl ScrapeRequest {
    pub fn to_payload(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// A PDF picked in the form. Only the location is held here; reading the bytes
/// is the uploader's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfSelection {
    path: PathBuf,
}

impl PdfSelection {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name sent in the multipart part.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| FALLBACK_PDF_NAME.to_string())
    }
}
