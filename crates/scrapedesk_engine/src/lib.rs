//! Scrapedesk engine: real-time session transport, PDF upload and result files.
mod download;
mod engine;
mod protocol;
mod session;
mod settings;
mod types;
mod upload;

pub use download::{ensure_output_dir, DownloadStore, PersistError, DEFAULT_RESULT_FILE};
pub use engine::{EngineError, EngineHandle};
pub use protocol::{
    decode_engine_packet, decode_socket_packet, encode_engine_packet, encode_event,
    encode_socket_packet, EnginePacket, OpenInfo, ProtocolError, SocketPacket,
};
pub use session::{run_session, SessionCommand};
pub use settings::EngineSettings;
pub use types::{
    EngineEvent, EventSink, ServerEvent, SubmissionId, UploadFailure,
    UploadFailureKind,
};
pub use upload::{PdfUploader, ReqwestUploader};
