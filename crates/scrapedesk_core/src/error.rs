use thiserror::Error;

/// Form problems caught before any network activity. The display text is what
/// the transcript shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter URLs or select a PDF file.")]
    MissingInput,
    #[error("Please provide either URLs or a PDF, not both.")]
    ConflictingInput,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("upload response did not include a pdf_id")]
    MissingPdfId,
    #[error("server rejected the upload (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("upload response was not valid JSON: {0}")]
    InvalidResponse(String),
    #[error("could not read the PDF file: {0}")]
    ReadFile(String),
    #[error("upload failed: {0}")]
    Transport(String),
}
