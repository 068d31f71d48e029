use crate::{PdfSelection, ScrapeRequest, SubmissionId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Open a real-time session to the scrape server.
    OpenSession { submission: SubmissionId },
    /// Upload the selected PDF over plain HTTP; answered by `Msg::PdfUploaded`.
    UploadPdf {
        submission: SubmissionId,
        pdf: PdfSelection,
    },
    /// Send the scrape-start event over the open session.
    EmitScrapeRequest {
        submission: SubmissionId,
        request: ScrapeRequest,
    },
    /// Tear the session down from the client side.
    CloseSession { submission: SubmissionId },
    /// Materialize the result text as a downloadable file; answered by
    /// `Msg::DownloadReady` or `Msg::DownloadFailed`.
    OfferDownload {
        submission: SubmissionId,
        contents: String,
    },
}
