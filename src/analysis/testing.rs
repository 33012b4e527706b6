use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::config::Config;
use crate::llm::{GenerativeModel, MediaFile, TextRecognizer};

pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01";

pub const GIF_BYTES: &[u8] = b"GIF89a\x01\0\x01\0\x80\0\0\0\0\0\xff\xff\xff;";

pub const VERDICT_JSON: &str = r#"{
    "medicines_found": ["Warfarin", "Ibuprofen"],
    "risk_level": "High",
    "risk_color": "orange",
    "alert_message": "Ibuprofen raises the bleeding risk of Warfarin.",
    "alternatives": ["Paracetamol"]
}"#;

pub fn test_config(root: &Path) -> Config {
    let vars: HashMap<&str, String> = HashMap::from([
        ("UPLOAD_DIR", root.join("uploads").display().to_string()),
        ("STATIC_DIR", root.join("static").display().to_string()),
        ("LOG_DIR", root.join("logs").display().to_string()),
        ("MOCK_DELAY_MS", "0".to_string()),
        ("GEMINI_MODELS", "gemini-test-pro,gemini-test-flash".to_string()),
        ("GEMINI_LEGACY_MODEL", "gemini-test-legacy".to_string()),
    ]);
    Config::from_lookup(&move |name: &str| vars.get(name).cloned()).expect("test config")
}

struct ModelCall {
    model: String,
    prompt: String,
    images: usize,
}

/// Scripted model: answers calls in order, then keeps failing.
pub struct FakeModel {
    responses: Mutex<VecDeque<Result<String, String>>>,
    exhausted_error: String,
    calls: Mutex<Vec<ModelCall>>,
}

impl FakeModel {
    pub fn new(responses: Vec<Result<String, String>>) -> Self {
        FakeModel {
            responses: Mutex::new(responses.into()),
            exhausted_error: "no scripted response".to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: &str) -> Self {
        FakeModel {
            responses: Mutex::new(VecDeque::new()),
            exhausted_error: error.to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|call| call.model.clone()).collect()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|call| call.prompt.clone()).collect()
    }

    pub fn image_counts(&self) -> Vec<usize> {
        self.calls.lock().unwrap().iter().map(|call| call.images).collect()
    }
}

#[async_trait]
impl GenerativeModel for FakeModel {
    async fn generate(&self, model: &str, prompt: &str, images: &[MediaFile]) -> Result<String> {
        self.calls.lock().unwrap().push(ModelCall {
            model: model.to_string(),
            prompt: prompt.to_string(),
            images: images.len(),
        });
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(err)) => Err(anyhow!(err)),
            None => Err(anyhow!(self.exhausted_error.clone())),
        }
    }
}

pub struct FakeRecognizer {
    result: Result<String, String>,
    calls: AtomicUsize,
}

impl FakeRecognizer {
    pub fn returning(text: &str) -> Self {
        FakeRecognizer {
            result: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: &str) -> Self {
        FakeRecognizer {
            result: Err(error.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextRecognizer for FakeRecognizer {
    async fn extract_text(&self, _image: &MediaFile) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone().map_err(|err| anyhow!(err))
    }
}
