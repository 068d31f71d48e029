use std::fmt;

use serde_json::Value;

pub type SubmissionId = u64;

/// Events the server pushes over an established session.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    LogMessage(String),
    JsonItem(Value),
    ScrapeComplete(String),
}

impl ServerEvent {
    /// Maps a named Socket.IO event onto the events this client understands.
    /// Unknown names and log events without text yield `None`.
    pub(crate) fn from_event(name: &str, args: Vec<Value>) -> Option<Self> {
        let first = args.into_iter().next();
        match name {
            "log_message" => first.as_ref().and_then(data_text).map(ServerEvent::LogMessage),
            "json_item" => Some(ServerEvent::JsonItem(first.unwrap_or(Value::Null))),
            "scrape_complete" => Some(ServerEvent::ScrapeComplete(
                first.as_ref().and_then(data_text).unwrap_or_default(),
            )),
            _ => None,
        }
    }
}

fn data_text(payload: &Value) -> Option<String> {
    match payload.get("data")? {
        Value::String(text) => Some(text.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Connected {
        submission: SubmissionId,
    },
    ConnectFailed {
        submission: SubmissionId,
        reason: String,
    },
    Server {
        submission: SubmissionId,
        event: ServerEvent,
    },
    Disconnected {
        submission: SubmissionId,
        reason: String,
    },
    Uploaded {
        submission: SubmissionId,
        result: Result<String, UploadFailure>,
    },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFailure {
    pub kind: UploadFailureKind,
    pub message: String,
}

impl UploadFailure {
    pub(crate) fn new(kind: UploadFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for UploadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for UploadFailure {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadFailureKind {
    ReadFile,
    /// Server answered without a `pdf_id`; `status` is the HTTP status.
    Rejected { status: u16 },
    MissingPdfId,
    InvalidResponse,
    Timeout,
    Network,
}

impl fmt::Display for UploadFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadFailureKind::ReadFile => write!(f, "read file"),
            UploadFailureKind::Rejected { status } => write!(f, "rejected with http status {status}"),
            UploadFailureKind::MissingPdfId => write!(f, "missing pdf_id"),
            UploadFailureKind::InvalidResponse => write!(f, "invalid response"),
            UploadFailureKind::Timeout => write!(f, "timeout"),
            UploadFailureKind::Network => write!(f, "network error"),
        }
    }
}
