use serde_json::Value;

use crate::view_model::AppViewModel;
use crate::{PdfSelection, ScrapeRequest, ValidationError};

pub type SubmissionId = u64;

/// Current contents of the submit form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormInput {
    pub urls: String,
    pub pdf: Option<PdfSelection>,
    pub use_selenium: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Connecting,
    UploadingPdf,
    Streaming,
    Completed,
    Disconnected,
    ConnectionFailed,
    UploadFailed,
    Rejected(ValidationError),
}

impl Phase {
    /// Phases in which server events are still expected.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            Phase::Connecting | Phase::UploadingPdf | Phase::Streaming
        )
    }

    pub fn is_terminal(self) -> bool {
        !self.is_active() && self != Phase::Idle
    }
}

/// Everything owned by one submission. Replaced wholesale by the next one.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeSession {
    id: SubmissionId,
    phase: Phase,
    urls: String,
    pdf: Option<PdfSelection>,
    use_selenium: Option<bool>,
    transcript: Vec<String>,
    items: Vec<Value>,
    json_preview: Option<String>,
    download: Option<String>,
    /// True from the moment a session is requested until the transport reports
    /// either a disconnect or a connect failure.
    transport_live: bool,
}

impl ScrapeSession {
    pub(crate) fn new(id: SubmissionId, form: &FormInput) -> Self {
        Self {
            id,
            phase: Phase::Idle,
            urls: form.urls.trim().to_string(),
            pdf: form.pdf.clone(),
            use_selenium: form.use_selenium,
            transcript: Vec::new(),
            items: Vec::new(),
            json_preview: None,
            download: None,
            transport_live: false,
        }
    }

    pub fn id(&self) -> SubmissionId {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn json_preview(&self) -> Option<&str> {
        self.json_preview.as_deref()
    }

    pub fn download(&self) -> Option<&str> {
        self.download.as_deref()
    }

    pub fn transport_live(&self) -> bool {
        self.transport_live
    }

    pub(crate) fn urls(&self) -> &str {
        &self.urls
    }

    pub(crate) fn pdf(&self) -> Option<&PdfSelection> {
        self.pdf.as_ref()
    }

    pub(crate) fn request(&self, pdf_id: Option<String>) -> ScrapeRequest {
        ScrapeRequest {
            urls: self.urls.clone(),
            pdf_id,
            use_selenium: self.use_selenium,
        }
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub(crate) fn push_line(&mut self, line: impl Into<String>) {
        self.transcript.push(line.into());
    }

    pub(crate) fn push_item(&mut self, item: Value) {
        self.items.push(item);
    }

    pub(crate) fn set_json_preview(&mut self, text: String) {
        self.json_preview = Some(text);
    }

    pub(crate) fn set_download(&mut self, location: String) {
        self.download = Some(location);
    }

    pub(crate) fn open_transport(&mut self) {
        self.transport_live = true;
    }

    pub(crate) fn close_transport(&mut self) {
        self.transport_live = false;
    }

    fn settled(&self) -> bool {
        self.phase.is_terminal() && !self.transport_live
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    form: FormInput,
    session: Option<ScrapeSession>,
    last_submission: SubmissionId,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn form(&self) -> &FormInput {
        &self.form
    }

    pub fn session(&self) -> Option<&ScrapeSession> {
        self.session.as_ref()
    }

    pub fn view(&self) -> AppViewModel {
        match &self.session {
            Some(session) => AppViewModel {
                submission: Some(session.id),
                phase: session.phase,
                transcript: session.transcript.clone(),
                item_count: session.items.len(),
                json_preview: session.json_preview.clone(),
                download: session.download.clone(),
                settled: session.settled(),
                dirty: self.dirty,
            },
            None => AppViewModel {
                dirty: self.dirty,
                ..AppViewModel::default()
            },
        }
    }

    /// Returns whether the view changed since the last call, and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn form_mut(&mut self) -> &mut FormInput {
        &mut self.form
    }

    pub(crate) fn next_submission_id(&mut self) -> SubmissionId {
        self.last_submission += 1;
        self.last_submission
    }

    pub(crate) fn replace_session(&mut self, session: ScrapeSession) -> Option<ScrapeSession> {
        self.session.replace(session)
    }

    /// The current session, but only if `submission` still names it. Events
    /// from replaced submissions resolve to `None`.
    pub(crate) fn session_for(&mut self, submission: SubmissionId) -> Option<&mut ScrapeSession> {
        self.session
            .as_mut()
            .filter(|session| session.id == submission)
    }
}
