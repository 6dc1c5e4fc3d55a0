#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use invoice_mapper::config::{MapperConfig, SuggestMode};
use invoice_mapper::error::{LlmError, OcrError};
use invoice_mapper::llm::{ChatBackend, ChatRequest};
use invoice_mapper::mapping::{InvoiceMapper, MapperParts};
use invoice_mapper::memory::candidates::{CandidateStore, JsonDirCandidateStore};
use invoice_mapper::memory::store::{JsonFileStore, MappingStore};
use invoice_mapper::ocr::{Document, OcrEngine};

/// OCR text of a small supplier invoice. Parses into four items:
/// "Roma Tomatoes 10kg", "Mozzarella di Bufala", "Fresh Basil", "Cleaning Supplies".
pub const INVOICE_TEXT: &str = "\
FRESH FOODS WHOLESALE LTD
Invoice No: 2024-0117
Description Qty Price Amount
Roma Tomatoes 10kg 2 12.50 25.00
Mozzarella di Bufala 3 kg 8,90 26,70
2 x Fresh Basil bunch 1.20
Cleaning Supplies 1 15.00 15.00
Total 68.10";

pub const MENU: &[&str] = &["Margherita Pizza", "Caprese Salad", "Pesto Pasta", "Tiramisu"];

/// OCR engine that returns fixed text for every document.
pub struct FakeOcr {
    pub text: String,
    pub calls: AtomicUsize,
}

impl FakeOcr {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl OcrEngine for FakeOcr {
    async fn extract_text(&self, _document: &Document) -> Result<String, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.text.trim().is_empty() {
            return Err(OcrError::EmptyText);
        }
        Ok(self.text.clone())
    }
}

/// Chat backend that answers from a fixed `item text -> target` table.
///
/// It reads the items from the user message and returns one entry per item,
/// with `null` for items missing from the table. Items listed in `fail_on`
/// make the whole call fail.
pub struct FakeChat {
    pub answers: HashMap<String, Option<String>>,
    pub fail_on: Vec<String>,
    pub fail_all: bool,
    pub calls: AtomicUsize,
    /// Item texts seen across all calls, in order.
    pub seen: Mutex<Vec<String>>,
}

impl FakeChat {
    pub fn new(answers: &[(&str, Option<&str>)]) -> Self {
        Self {
            answers: answers
                .iter()
                .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
                .collect(),
            fail_on: Vec::new(),
            fail_all: false,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// The usual answers for [`INVOICE_TEXT`] against [`MENU`].
    pub fn menu_answers() -> Self {
        Self::new(&[
            ("Roma Tomatoes 10kg", Some("Margherita Pizza")),
            ("Mozzarella di Bufala", Some("Caprese Salad")),
            ("Fresh Basil", Some("Pesto Pasta")),
            ("Cleaning Supplies", None),
        ])
    }

    pub fn failing_on(mut self, item: &str) -> Self {
        self.fail_on.push(item.to_string());
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_all = true;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_items(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for FakeChat {
    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_all {
            return Err(LlmError::Status {
                status: 503,
                body: "overloaded".into(),
            });
        }

        let json = request
            .user
            .split_once('\n')
            .map(|(_, rest)| rest)
            .unwrap_or("[]");
        let items: Vec<serde_json::Value> = serde_json::from_str(json).unwrap();

        let mut mappings = Vec::new();
        for item in items {
            let text = item["text"].as_str().unwrap_or_default().to_string();
            self.seen.lock().unwrap().push(text.clone());
            if self.fail_on.contains(&text) {
                return Err(LlmError::Malformed(format!("cannot map {text}")));
            }
            let target = self.answers.get(&text).cloned().flatten();
            mappings.push(serde_json::json!({
                "index": item["index"],
                "invoice_item": text,
                "suggested_item": target,
                "notes": "fake model",
            }));
        }
        Ok(serde_json::json!({ "mappings": mappings }).to_string())
    }

    fn model(&self) -> &str {
        "fake-model"
    }
}

/// A mapper over file-backed stores in a temp dir with fake providers.
pub struct TestApp {
    pub mapper: InvoiceMapper,
    pub config: MapperConfig,
    pub ocr: Arc<FakeOcr>,
    pub chat: Arc<FakeChat>,
    pub store: Arc<JsonFileStore>,
    pub lists: Arc<JsonDirCandidateStore>,
    pub dir: TempDir,
}

pub fn test_app(chat: FakeChat) -> TestApp {
    test_app_with(INVOICE_TEXT, chat, SuggestMode::Batch)
}

pub fn test_app_with(ocr_text: &str, chat: FakeChat, mode: SuggestMode) -> TestApp {
    let dir = TempDir::new().unwrap();
    let mut config = MapperConfig::default();
    config.storage.data_dir = dir.path().to_string_lossy().into_owned();
    config.llm.mode = mode;

    let store = Arc::new(JsonFileStore::new(
        config.resolved_mappings_path(),
        config.storage.default_customer.clone(),
    ));
    let lists = Arc::new(JsonDirCandidateStore::new(config.resolved_lists_dir()));
    let ocr = Arc::new(FakeOcr::new(ocr_text));
    let chat = Arc::new(chat);

    let parts = MapperParts {
        mappings: store.clone() as Arc<dyn MappingStore>,
        candidates: lists.clone() as Arc<dyn CandidateStore>,
        ocr: ocr.clone() as Arc<dyn OcrEngine>,
        chat: chat.clone() as Arc<dyn ChatBackend>,
    };
    let mapper = InvoiceMapper::new(parts, &config);

    TestApp {
        mapper,
        config,
        ocr,
        chat,
        store,
        lists,
        dir,
    }
}

pub fn menu_items() -> Vec<String> {
    MENU.iter().map(|s| s.to_string()).collect()
}

pub fn png_document() -> Document {
    Document::detect(b"\x89PNG\r\n\x1a\nfake".to_vec(), Some("invoice.png".into())).unwrap()
}
