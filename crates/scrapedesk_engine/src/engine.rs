use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use scrapedesk_logging::{desk_debug, desk_info, desk_warn};
use serde_json::Value;
use thiserror::Error;
use tokio::runtime::Runtime;
use tokio::sync::mpsc as async_mpsc;
use tokio_util::sync::CancellationToken;

use crate::session::{run_session, SessionCommand};
use crate::upload::{PdfUploader, ReqwestUploader};
use crate::{EngineEvent, EngineSettings, EventSink, SubmissionId};

const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to start engine: {0}")]
    Start(#[from] io::Error),
}

enum EngineCommand {
    Open {
        submission: SubmissionId,
    },
    Upload {
        submission: SubmissionId,
        path: PathBuf,
        file_name: String,
    },
    Emit {
        submission: SubmissionId,
        event: String,
        payload: Value,
    },
    Close {
        submission: SubmissionId,
    },
}

struct LiveSession {
    commands: async_mpsc::UnboundedSender<SessionCommand>,
    shutdown: CancellationToken,
}

/// Front door to the IO thread. Commands are fire-and-forget; every outcome
/// comes back through the `EventSink` given at construction.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    pub fn new(settings: EngineSettings, sink: Arc<dyn EventSink>) -> Result<Self, EngineError> {
        let uploader = Arc::new(ReqwestUploader::new(settings.clone()));
        Self::with_uploader(settings, uploader, sink)
    }

    fn with_uploader(
        settings: EngineSettings,
        uploader: Arc<dyn PdfUploader>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, EngineError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("scrapedesk-io")
            .enable_all()
            .build()?;
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let context = EngineContext {
            settings: Arc::new(settings),
            uploader,
            sink,
        };

        thread::Builder::new()
            .name("scrapedesk-engine".to_string())
            .spawn(move || {
                let mut sessions = HashMap::new();
                while let Ok(command) = cmd_rx.recv() {
                    context.handle(&runtime, &mut sessions, command);
                }
                desk_debug!("Engine command channel closed; shutting down");
                for (_, session) in sessions.drain() {
                    session.shutdown.cancel();
                }
                runtime.shutdown_timeout(SHUTDOWN_GRACE);
            })?;

        Ok(Self { cmd_tx })
    }

    pub fn open_session(&self, submission: SubmissionId) {
        let _ = self.cmd_tx.send(EngineCommand::Open { submission });
    }

    pub fn upload_pdf(&self, submission: SubmissionId, path: PathBuf, file_name: String) {
        let _ = self.cmd_tx.send(EngineCommand::Upload {
            submission,
            path,
            file_name,
        });
    }

    pub fn emit(&self, submission: SubmissionId, event: impl Into<String>, payload: Value) {
        let _ = self.cmd_tx.send(EngineCommand::Emit {
            submission,
            event: event.into(),
            payload,
        });
    }

    pub fn close_session(&self, submission: SubmissionId) {
        let _ = self.cmd_tx.send(EngineCommand::Close { submission });
    }
}

struct EngineContext {
    settings: Arc<EngineSettings>,
    uploader: Arc<dyn PdfUploader>,
    sink: Arc<dyn EventSink>,
}

impl EngineContext {
    fn handle(
        &self,
        runtime: &Runtime,
        sessions: &mut HashMap<SubmissionId, LiveSession>,
        command: EngineCommand,
    ) {
        match command {
            EngineCommand::Open { submission } => {
                // Only one session is live at a time.
                for (previous, session) in sessions.drain() {
                    desk_info!("Closing superseded session submission={}", previous);
                    session.shutdown.cancel();
                }

                let (commands_tx, commands_rx) = async_mpsc::unbounded_channel();
                let shutdown = CancellationToken::new();
                sessions.insert(
                    submission,
                    LiveSession {
                        commands: commands_tx,
                        shutdown: shutdown.clone(),
                    },
                );

                let settings = self.settings.clone();
                let sink = self.sink.clone();
                desk_info!("OpenSession submission={}", submission);
                runtime.spawn(async move {
                    run_session(&settings, submission, commands_rx, shutdown, sink.as_ref()).await;
                });
            }
            EngineCommand::Upload {
                submission,
                path,
                file_name,
            } => {
                let uploader = self.uploader.clone();
                let sink = self.sink.clone();
                runtime.spawn(async move {
                    let result = uploader.upload(&path, &file_name).await;
                    if let Err(failure) = &result {
                        desk_warn!("Upload submission={} failed: {}", submission, failure);
                    }
                    sink.emit(EngineEvent::Uploaded { submission, result });
                });
            }
            EngineCommand::Emit {
                submission,
                event,
                payload,
            } => match sessions.get(&submission) {
                Some(session) => {
                    if session
                        .commands
                        .send(SessionCommand::Emit { event, payload })
                        .is_err()
                    {
                        desk_warn!("Emit submission={} dropped: session ended", submission);
                    }
                }
                None => desk_warn!("Emit submission={} dropped: no such session", submission),
            },
            EngineCommand::Close { submission } => {
                if let Some(session) = sessions.remove(&submission) {
                    desk_info!("CloseSession submission={}", submission);
                    session.shutdown.cancel();
                }
            }
        }
    }
}
