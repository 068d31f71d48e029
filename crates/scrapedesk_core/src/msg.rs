use serde_json::Value;

use crate::{PdfSelection, SubmissionId, UploadError};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User edited the URL text field.
    UrlsChanged(String),
    /// User picked (or cleared) the PDF file.
    PdfSelected(Option<PdfSelection>),
    /// User toggled the server-side browser fallback. `None` leaves the
    /// server default in place.
    BrowserFallbackChanged(Option<bool>),
    /// User submitted the form.
    Submitted,
    /// Transport reported the session as established.
    SessionConnected { submission: SubmissionId },
    /// The PDF upload finished.
    PdfUploaded {
        submission: SubmissionId,
        result: Result<String, UploadError>,
    },
    /// Server `log_message` event.
    LogMessage {
        submission: SubmissionId,
        text: String,
    },
    /// Server `json_item` event; the record is passed through untouched.
    JsonItem {
        submission: SubmissionId,
        item: Value,
    },
    /// Server `scrape_complete` event carrying the final status line.
    ScrapeComplete {
        submission: SubmissionId,
        status: String,
    },
    /// The result file was written and can be offered for download.
    DownloadReady {
        submission: SubmissionId,
        location: String,
    },
    /// The result file could not be written.
    DownloadFailed {
        submission: SubmissionId,
        reason: String,
    },
    /// Session closed by either side.
    Disconnected { submission: SubmissionId },
    /// Session could not be established.
    ConnectFailed {
        submission: SubmissionId,
        reason: String,
    },
    /// Render tick while waiting on the engine.
    Tick,
}
