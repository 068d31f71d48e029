use serde_json::Value;

use crate::{
    AppState, Effect, Msg, Phase, ResultBundle, ScrapeSession, SubmissionId, UploadError,
    ValidationError,
};

const CONNECTING: &str = "Connecting to server...";
const CONNECTED: &str = "Connection established. Starting scrape...";
const NO_ITEMS: &str = "No items were found to download.";
const DISCONNECTED: &str = "Disconnected from server.";

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::UrlsChanged(text) => {
            state.form_mut().urls = text;
            Vec::new()
        }
        Msg::PdfSelected(pdf) => {
            state.form_mut().pdf = pdf;
            Vec::new()
        }
        Msg::BrowserFallbackChanged(flag) => {
            state.form_mut().use_selenium = flag;
            Vec::new()
        }
        Msg::Submitted => submit(&mut state),
        Msg::SessionConnected { submission } => on_connected(&mut state, submission),
        Msg::PdfUploaded { submission, result } => on_uploaded(&mut state, submission, result),
        Msg::LogMessage { submission, text } => {
            if let Some(session) = live_session(&mut state, submission) {
                session.push_line(text);
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::JsonItem { submission, item } => {
            // Items are only counted here; the view refreshes on the next
            // transcript change. The bundle is fixed once the scrape completes.
            if let Some(session) = live_session(&mut state, submission) {
                if session.phase().is_active() {
                    session.push_item(item);
                }
            }
            Vec::new()
        }
        Msg::ScrapeComplete { submission, status } => on_complete(&mut state, submission, status),
        Msg::DownloadReady {
            submission,
            location,
        } => {
            if let Some(session) = state.session_for(submission) {
                session.set_download(location);
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::DownloadFailed { submission, reason } => {
            if let Some(session) = state.session_for(submission) {
                session.push_line(format!("Could not save results: {reason}"));
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::Disconnected { submission } => {
            if let Some(session) = live_session(&mut state, submission) {
                session.push_line(DISCONNECTED);
                session.close_transport();
                if session.phase().is_active() {
                    session.set_phase(Phase::Disconnected);
                }
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::ConnectFailed { submission, reason } => {
            if let Some(session) = live_session(&mut state, submission) {
                session.push_line(format!(
                    "Connection failed: {reason}. Please check the server and refresh the page."
                ));
                session.close_transport();
                if session.phase().is_active() {
                    session.set_phase(Phase::ConnectionFailed);
                }
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::Tick => Vec::new(),
    };

    (state, effects)
}

fn submit(state: &mut AppState) -> Vec<Effect> {
    let submission = state.next_submission_id();
    let mut session = ScrapeSession::new(submission, state.form());
    let mut effects = Vec::new();

    match validate(session.urls(), session.pdf().is_some()) {
        Err(err) => {
            session.push_line(err.to_string());
            session.set_phase(Phase::Rejected(err));
        }
        Ok(()) => {
            session.push_line(CONNECTING);
            session.set_phase(Phase::Connecting);
            session.open_transport();
            effects.push(Effect::OpenSession { submission });
        }
    }

    if let Some(previous) = state.replace_session(session) {
        if previous.transport_live() {
            effects.insert(
                0,
                Effect::CloseSession {
                    submission: previous.id(),
                },
            );
        }
    }
    state.mark_dirty();
    effects
}

fn validate(urls: &str, has_pdf: bool) -> Result<(), ValidationError> {
    match (urls.is_empty(), has_pdf) {
        (true, false) => Err(ValidationError::MissingInput),
        (false, true) => Err(ValidationError::ConflictingInput),
        _ => Ok(()),
    }
}

fn on_connected(state: &mut AppState, submission: SubmissionId) -> Vec<Effect> {
    let Some(session) = live_session(state, submission) else {
        return Vec::new();
    };
    if session.phase() != Phase::Connecting {
        return Vec::new();
    }

    session.push_line(CONNECTED);
    let effect = match session.pdf().cloned() {
        // The scrape request needs the server-side id, so it waits for the upload.
        Some(pdf) => {
            session.set_phase(Phase::UploadingPdf);
            Effect::UploadPdf { submission, pdf }
        }
        None => {
            session.set_phase(Phase::Streaming);
            Effect::EmitScrapeRequest {
                submission,
                request: session.request(None),
            }
        }
    };
    state.mark_dirty();
    vec![effect]
}

fn on_uploaded(
    state: &mut AppState,
    submission: SubmissionId,
    result: Result<String, UploadError>,
) -> Vec<Effect> {
    let Some(session) = live_session(state, submission) else {
        return Vec::new();
    };
    if session.phase() != Phase::UploadingPdf {
        return Vec::new();
    }

    match result {
        Ok(pdf_id) => {
            session.set_phase(Phase::Streaming);
            let request = session.request(Some(pdf_id));
            state.mark_dirty();
            vec![Effect::EmitScrapeRequest {
                submission,
                request,
            }]
        }
        Err(err) => {
            session.push_line(format!("Error uploading PDF: {err}"));
            session.set_phase(Phase::UploadFailed);
            state.mark_dirty();
            vec![Effect::CloseSession { submission }]
        }
    }
}

fn on_complete(state: &mut AppState, submission: SubmissionId, status: String) -> Vec<Effect> {
    let Some(session) = live_session(state, submission) else {
        return Vec::new();
    };
    if !session.phase().is_active() {
        return Vec::new();
    }

    session.push_line(status);
    session.set_phase(Phase::Completed);

    let mut effects = Vec::with_capacity(2);
    if session.items().is_empty() {
        session.push_line(NO_ITEMS);
    } else {
        let items: Vec<Value> = session.items().to_vec();
        match ResultBundle::new(items).to_pretty_json() {
            Ok(contents) => {
                session.set_json_preview(contents.clone());
                effects.push(Effect::OfferDownload {
                    submission,
                    contents,
                });
            }
            Err(err) => session.push_line(format!("Could not assemble results: {err}")),
        }
    }
    effects.push(Effect::CloseSession { submission });
    state.mark_dirty();
    effects
}

fn live_session(state: &mut AppState, submission: SubmissionId) -> Option<&mut ScrapeSession> {
    state
        .session_for(submission)
        .filter(|session| session.transport_live())
}
