use std::path::Path;

use reqwest::multipart::{Form, Part};
use scrapedesk_logging::{desk_debug, desk_info};
use serde::Deserialize;

use crate::{EngineSettings, UploadFailure, UploadFailureKind};

const PDF_FIELD: &str = "pdf_file";

#[async_trait::async_trait]
pub trait PdfUploader: Send + Sync {
    /// Uploads the file and returns the server-side `pdf_id`.
    async fn upload(&self, path: &Path, file_name: &str) -> Result<String, UploadFailure>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    pdf_id: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReqwestUploader {
    settings: EngineSettings,
}

impl ReqwestUploader {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self) -> Result<reqwest::Client, UploadFailure> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .build()
            .map_err(|err| UploadFailure::new(UploadFailureKind::Network, err.to_string()))
    }
}

#[async_trait::async_trait]
impl PdfUploader for ReqwestUploader {
    async fn upload(&self, path: &Path, file_name: &str) -> Result<String, UploadFailure> {
        let url = self
            .settings
            .upload_url()
            .map_err(|err| UploadFailure::new(UploadFailureKind::Network, err.to_string()))?;
        let bytes = tokio::fs::read(path).await.map_err(|err| {
            UploadFailure::new(
                UploadFailureKind::ReadFile,
                format!("{}: {err}", path.display()),
            )
        })?;
        desk_info!(
            "Uploading pdf file_name={} bytes={} url={}",
            file_name,
            bytes.len(),
            url
        );

        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")
            .map_err(|err| UploadFailure::new(UploadFailureKind::Network, err.to_string()))?;
        let form = Form::new().part(PDF_FIELD, part);

        let client = self.build_client()?;
        let response = client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        desk_debug!("Upload answered status={} body_len={}", status, body.len());

        // The body decides, not the status: a `pdf_id` is success however it
        // arrives, and its absence is failure.
        let parsed: UploadResponse = serde_json::from_slice(&body).map_err(|err| {
            if status.is_success() {
                UploadFailure::new(UploadFailureKind::InvalidResponse, err.to_string())
            } else {
                UploadFailure::new(
                    UploadFailureKind::Rejected {
                        status: status.as_u16(),
                    },
                    status.to_string(),
                )
            }
        })?;

        match parsed.pdf_id {
            Some(pdf_id) if !pdf_id.is_empty() => Ok(pdf_id),
            _ if !status.is_success() => Err(UploadFailure::new(
                UploadFailureKind::Rejected {
                    status: status.as_u16(),
                },
                parsed.error.unwrap_or_else(|| status.to_string()),
            )),
            _ => Err(UploadFailure::new(
                UploadFailureKind::MissingPdfId,
                parsed
                    .error
                    .unwrap_or_else(|| "response has no pdf_id".to_string()),
            )),
        }
    }
}

fn map_reqwest_error(err: reqwest::Error) -> UploadFailure {
    if err.is_timeout() {
        return UploadFailure::new(UploadFailureKind::Timeout, err.to_string());
    }
    UploadFailure::new(UploadFailureKind::Network, err.to_string())
}
