use std::sync::mpsc;

use scrapedesk_core::{Effect, Msg, UploadError, SCRAPE_REQUEST_EVENT};
use scrapedesk_engine::{
    DownloadStore, EngineEvent, EngineHandle, EventSink, ServerEvent, UploadFailure,
    UploadFailureKind,
};
use scrapedesk_logging::{desk_debug, desk_error, desk_info, desk_warn};

/// Carries out the effects produced by `update`.
pub struct EffectRunner {
    engine: EngineHandle,
    store: DownloadStore,
    msg_tx: mpsc::Sender<Msg>,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, store: DownloadStore, msg_tx: mpsc::Sender<Msg>) -> Self {
        Self {
            engine,
            store,
            msg_tx,
        }
    }

    pub fn run(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::OpenSession { submission } => {
                    desk_info!("OpenSession submission={}", submission);
                    self.engine.open_session(submission);
                }
                Effect::UploadPdf { submission, pdf } => {
                    desk_info!(
                        "UploadPdf submission={} path={:?}",
                        submission,
                        pdf.path()
                    );
                    self.engine
                        .upload_pdf(submission, pdf.path().to_path_buf(), pdf.file_name());
                }
                Effect::EmitScrapeRequest {
                    submission,
                    request,
                } => match request.to_payload() {
                    Ok(payload) => {
                        desk_info!(
                            "EmitScrapeRequest submission={} urls_len={} pdf_id={:?}",
                            submission,
                            request.urls.len(),
                            request.pdf_id
                        );
                        self.engine.emit(submission, SCRAPE_REQUEST_EVENT, payload);
                    }
                    Err(err) => {
                        desk_error!("Could not encode scrape request: {}", err);
                        self.engine.close_session(submission);
                    }
                },
                Effect::CloseSession { submission } => {
                    self.engine.close_session(submission);
                }
                Effect::OfferDownload {
                    submission,
                    contents,
                } => {
                    let msg = match self.store.write(&contents) {
                        Ok(path) => Msg::DownloadReady {
                            submission,
                            location: path.display().to_string(),
                        },
                        Err(err) => {
                            desk_warn!("Saving results failed: {}", err);
                            Msg::DownloadFailed {
                                submission,
                                reason: err.to_string(),
                            }
                        }
                    };
                    let _ = self.msg_tx.send(msg);
                }
            }
        }
    }
}

/// Feeds engine events back into the update loop as messages.
pub struct MsgSink {
    msg_tx: mpsc::Sender<Msg>,
}

impl MsgSink {
    pub fn new(msg_tx: mpsc::Sender<Msg>) -> Self {
        Self { msg_tx }
    }
}

impl EventSink for MsgSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.msg_tx.send(map_engine_event(event));
    }
}

fn map_engine_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::Connected { submission } => Msg::SessionConnected { submission },
        EngineEvent::ConnectFailed { submission, reason } => {
            Msg::ConnectFailed { submission, reason }
        }
        EngineEvent::Server { submission, event } => match event {
            ServerEvent::LogMessage(text) => Msg::LogMessage { submission, text },
            ServerEvent::JsonItem(item) => Msg::JsonItem { submission, item },
            ServerEvent::ScrapeComplete(status) => Msg::ScrapeComplete { submission, status },
        },
        EngineEvent::Disconnected { submission, reason } => {
            desk_debug!("Session submission={} ended: {}", submission, reason);
            Msg::Disconnected { submission }
        }
        EngineEvent::Uploaded { submission, result } => Msg::PdfUploaded {
            submission,
            result: result.map_err(map_upload_failure),
        },
    }
}

fn map_upload_failure(failure: UploadFailure) -> UploadError {
    match failure.kind {
        UploadFailureKind::ReadFile => UploadError::ReadFile(failure.message),
        UploadFailureKind::Rejected { status } => UploadError::Rejected {
            status,
            message: failure.message,
        },
        UploadFailureKind::MissingPdfId => UploadError::MissingPdfId,
        UploadFailureKind::InvalidResponse => UploadError::InvalidResponse(failure.message),
        UploadFailureKind::Timeout | UploadFailureKind::Network => {
            UploadError::Transport(failure.message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn server_events_become_messages() {
        assert_eq!(
            map_engine_event(EngineEvent::Server {
                submission: 2,
                event: ServerEvent::JsonItem(json!({ "title": "A" })),
            }),
            Msg::JsonItem {
                submission: 2,
                item: json!({ "title": "A" }),
            }
        );
        assert_eq!(
            map_engine_event(EngineEvent::Server {
                submission: 2,
                event: ServerEvent::ScrapeComplete("done".to_string()),
            }),
            Msg::ScrapeComplete {
                submission: 2,
                status: "done".to_string(),
            }
        );
    }

    #[test]
    fn disconnect_reason_is_not_forwarded() {
        assert_eq!(
            map_engine_event(EngineEvent::Disconnected {
                submission: 5,
                reason: "ping timeout".to_string(),
            }),
            Msg::Disconnected { submission: 5 }
        );
    }

    #[test]
    fn upload_failures_map_to_form_errors() {
        let rejected = EngineEvent::Uploaded {
            submission: 1,
            result: Err(UploadFailure {
                kind: UploadFailureKind::Rejected { status: 400 },
                message: "No PDF file found or file is not a PDF".to_string(),
            }),
        };
        assert_eq!(
            map_engine_event(rejected),
            Msg::PdfUploaded {
                submission: 1,
                result: Err(UploadError::Rejected {
                    status: 400,
                    message: "No PDF file found or file is not a PDF".to_string(),
                }),
            }
        );

        let timeout = UploadFailure {
            kind: UploadFailureKind::Timeout,
            message: "operation timed out".to_string(),
        };
        assert_eq!(
            map_upload_failure(timeout),
            UploadError::Transport("operation timed out".to_string())
        );
    }

    #[test]
    fn sink_forwards_on_the_channel() {
        let (tx, rx) = mpsc::channel();
        let sink = MsgSink::new(tx);
        sink.emit(EngineEvent::Connected { submission: 3 });
        assert_eq!(rx.recv().unwrap(), Msg::SessionConnected { submission: 3 });
    }
}
