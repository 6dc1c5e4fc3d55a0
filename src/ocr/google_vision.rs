//! Google Cloud Vision document text detection over the REST API.
//!
//! Images go through `images:annotate`; PDFs go through `files:annotate`, which
//! processes at most five pages per synchronous request.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{Document, DocumentKind, OcrEngine};
use crate::config::OcrConfig;
use crate::error::OcrError;

const FEATURE: &str = "DOCUMENT_TEXT_DETECTION";
const MAX_SYNC_PDF_PAGES: usize = 5;

pub struct GoogleVisionOcr {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    pdf_pages: Vec<usize>,
}

impl GoogleVisionOcr {
    pub fn new(config: &OcrConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let pages = config.pdf_max_pages.clamp(1, MAX_SYNC_PDF_PAGES);
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            pdf_pages: (1..=pages).collect(),
        })
    }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<R, OcrError> {
        let api_key = self.api_key.as_deref().ok_or(OcrError::MissingApiKey)?;
        let url = format!("{}/{method}", self.endpoint);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), method, "Google Vision request failed");
            return Err(OcrError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }

    async fn annotate_image(&self, content: String) -> Result<String, OcrError> {
        let request = ImagesRequest {
            requests: vec![ImageRequest {
                image: ImageContent { content },
                features: vec![Feature { kind: FEATURE }],
            }],
        };
        let response: AnnotateResponse = self.post("images:annotate", &request).await?;
        let first = response.responses.into_iter().next().unwrap_or_default();
        first.into_text()
    }

    async fn annotate_pdf(&self, content: String) -> Result<String, OcrError> {
        let request = FilesRequest {
            requests: vec![FileRequest {
                input_config: InputConfig {
                    content,
                    mime_type: DocumentKind::Pdf.mime_type(),
                },
                features: vec![Feature { kind: FEATURE }],
                pages: self.pdf_pages.clone(),
            }],
        };
        let response: FilesResponse = self.post("files:annotate", &request).await?;
        let file = response.responses.into_iter().next().unwrap_or_default();
        if let Some(err) = file.error.filter(|e| !e.message.is_empty()) {
            return Err(OcrError::Provider(err.message));
        }

        let mut pages = Vec::with_capacity(file.responses.len());
        for page in file.responses {
            match page.into_text() {
                Ok(text) => pages.push(text),
                Err(OcrError::EmptyText) => continue,
                Err(e) => return Err(e),
            }
        }
        if pages.is_empty() {
            return Err(OcrError::EmptyText);
        }
        Ok(pages.join("\n"))
    }
}

#[async_trait]
impl OcrEngine for GoogleVisionOcr {
    async fn extract_text(&self, document: &Document) -> Result<String, OcrError> {
        let content = base64::engine::general_purpose::STANDARD.encode(&document.bytes);
        tracing::info!(
            file = document.display_name(),
            kind = document.kind.mime_type(),
            bytes = document.bytes.len(),
            "sending document to Google Vision"
        );
        let text = match document.kind {
            DocumentKind::Pdf => self.annotate_pdf(content).await?,
            DocumentKind::Png | DocumentKind::Jpeg => self.annotate_image(content).await?,
        };
        tracing::info!(chars = text.len(), "Google Vision extracted text");
        Ok(text)
    }
}

#[derive(Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ImagesRequest {
    requests: Vec<ImageRequest>,
}

#[derive(Serialize)]
struct ImageRequest {
    image: ImageContent,
    features: Vec<Feature>,
}

#[derive(Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Serialize)]
struct FilesRequest {
    requests: Vec<FileRequest>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FileRequest {
    input_config: InputConfig,
    features: Vec<Feature>,
    pages: Vec<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InputConfig {
    content: String,
    mime_type: &'static str,
}

#[derive(Deserialize, Default)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageAnnotation>,
}

#[derive(Deserialize, Default)]
struct FilesResponse {
    #[serde(default)]
    responses: Vec<FileAnnotation>,
}

#[derive(Deserialize, Default)]
struct FileAnnotation {
    #[serde(default)]
    responses: Vec<ImageAnnotation>,
    error: Option<Status>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ImageAnnotation {
    full_text_annotation: Option<TextAnnotation>,
    error: Option<Status>,
}

#[derive(Deserialize)]
struct TextAnnotation {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct Status {
    #[serde(default)]
    message: String,
}

impl ImageAnnotation {
    fn into_text(self) -> Result<String, OcrError> {
        if let Some(err) = self.error.filter(|e| !e.message.is_empty()) {
            return Err(OcrError::Provider(err.message));
        }
        match self.full_text_annotation {
            Some(a) if !a.text.trim().is_empty() => Ok(a.text),
            _ => Err(OcrError::EmptyText),
        }
    }
}
