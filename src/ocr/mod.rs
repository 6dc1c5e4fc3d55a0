//! OCR adapter.
//!
//! Provides the [`OcrEngine`] trait and a Google Cloud Vision implementation.
//! The engine is created via [`create_engine`] from configuration.

pub mod google_vision;

use async_trait::async_trait;

use crate::error::OcrError;

/// Supported invoice document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Png,
    Jpeg,
}

impl DocumentKind {
    /// Kind from a file name extension (`pdf`, `png`, `jpg`, `jpeg`).
    pub fn from_filename(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    /// Kind from the file's magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"%PDF") {
            Some(Self::Pdf)
        } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(Self::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else {
            None
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }
}

/// An uploaded invoice, held in memory for the duration of one request.
#[derive(Debug, Clone)]
pub struct Document {
    pub bytes: Vec<u8>,
    pub kind: DocumentKind,
    pub filename: Option<String>,
}

impl Document {
    /// Build a document, trusting the extension first and the content second.
    /// Returns `None` for unsupported formats.
    pub fn detect(bytes: Vec<u8>, filename: Option<String>) -> Option<Self> {
        let kind = filename
            .as_deref()
            .and_then(DocumentKind::from_filename)
            .or_else(|| DocumentKind::sniff(&bytes))?;
        Some(Self {
            bytes,
            kind,
            filename,
        })
    }

    pub fn display_name(&self) -> &str {
        self.filename.as_deref().unwrap_or("invoice")
    }
}

/// Extracts raw text from an invoice document.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Fails with [`OcrError::EmptyText`] when the provider finds no text.
    async fn extract_text(&self, document: &Document) -> Result<String, OcrError>;
}

/// Create the OCR engine from config. Google Vision is the only provider.
pub fn create_engine(config: &crate::config::OcrConfig) -> anyhow::Result<Box<dyn OcrEngine>> {
    Ok(Box::new(google_vision::GoogleVisionOcr::new(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_extension() {
        assert_eq!(DocumentKind::from_filename("inv.PDF"), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_filename("scan.jpeg"), Some(DocumentKind::Jpeg));
        assert_eq!(DocumentKind::from_filename("scan.jpg"), Some(DocumentKind::Jpeg));
        assert_eq!(DocumentKind::from_filename("list.json"), None);
        assert_eq!(DocumentKind::from_filename("noext"), None);
    }

    #[test]
    fn kind_from_magic_bytes() {
        assert_eq!(DocumentKind::sniff(b"%PDF-1.7 ..."), Some(DocumentKind::Pdf));
        assert_eq!(
            DocumentKind::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]),
            Some(DocumentKind::Jpeg)
        );
        assert_eq!(DocumentKind::sniff(b"hello"), None);
    }

    #[test]
    fn detect_prefers_extension_then_content() {
        let doc = Document::detect(b"%PDF-1.4".to_vec(), None).unwrap();
        assert_eq!(doc.kind, DocumentKind::Pdf);
        assert!(Document::detect(b"plain".to_vec(), Some("notes.txt".into())).is_none());
    }
}
