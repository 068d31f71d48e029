use crate::{Phase, SubmissionId};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub submission: Option<SubmissionId>,
    pub phase: Phase,
    pub transcript: Vec<String>,
    pub item_count: usize,
    /// Raw result text, shown once the session completes with items.
    pub json_preview: Option<String>,
    /// Where the result can be downloaded from; `Some` reveals the control.
    pub download: Option<String>,
    /// Terminal phase reached and the transport has gone quiet.
    pub settled: bool,
    pub dirty: bool,
}
