use anyhow::Result;
use async_trait::async_trait;

pub mod gemini;
pub mod media;
pub mod vision;

pub use gemini::GeminiClient;
pub use media::MediaFile;
pub use vision::VisionClient;

/// Generative model that accepts an instruction plus images and answers with text.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, model: &str, prompt: &str, images: &[MediaFile]) -> Result<String>;
}

/// OCR engine used by the legacy two-stage analysis.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn extract_text(&self, image: &MediaFile) -> Result<String>;
}
