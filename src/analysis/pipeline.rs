use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::analysis::mock::mock_analysis;
use crate::analysis::prompt::{build_analysis_prompt, build_transcription_prompt, PromptInputs};
use crate::analysis::request::AnalysisRequest;
use crate::analysis::result::{normalize_verdict, AnalysisResult, ModelVerdict};
use crate::analysis::verdict::parse_model_verdict;
use crate::config::{AnalysisMode, Config};
use crate::error::{AnalysisError, ModelAttempt};
use crate::llm::{GenerativeModel, MediaFile, TextRecognizer};

pub const MIN_READABLE_CHARS: usize = 3;

pub const UNREADABLE_TEXT_MESSAGE: &str =
    "Could not detect readable text. Please upload a clearer image.";
pub const RECOGNITION_FAILED_MESSAGE: &str =
    "Failed to read image text. Please try again with a different image.";
pub const UNSUPPORTED_UPLOAD_MESSAGE: &str =
    "Could not read the uploaded file. Please upload a JPEG, PNG, WebP or HEIC image.";

fn unavailable_message(err: &AnalysisError) -> String {
    format!("AI analysis could not be completed. {err}")
}

pub struct Analyzer {
    model: Arc<dyn GenerativeModel>,
    recognizer: Arc<dyn TextRecognizer>,
    models: Vec<String>,
    legacy_model: String,
    mode: AnalysisMode,
    mock_delay: Duration,
}

async fn load_images(paths: &[PathBuf]) -> std::io::Result<Vec<MediaFile>> {
    let mut images = Vec::with_capacity(paths.len());
    for path in paths {
        images.push(MediaFile::read_from(path).await?);
    }
    Ok(images)
}

fn prompt_inputs(request: &AnalysisRequest, image_count: usize) -> PromptInputs<'_> {
    PromptInputs {
        note: request.note.as_deref(),
        image_count,
        language: Some(request.language.as_str()),
        conditions: request.conditions.as_deref(),
    }
}

impl Analyzer {
    pub fn new(
        config: &Config,
        model: Arc<dyn GenerativeModel>,
        recognizer: Arc<dyn TextRecognizer>,
    ) -> Self {
        Analyzer {
            model,
            recognizer,
            models: config.gemini_models.clone(),
            legacy_model: config.gemini_legacy_model.clone(),
            mode: config.analysis_mode,
            mock_delay: config.mock_delay,
        }
    }

    pub fn mode(&self) -> AnalysisMode {
        self.mode
    }

    pub fn models(&self) -> &[String] {
        match self.mode {
            AnalysisMode::Multimodal => &self.models,
            AnalysisMode::OcrThenReason => std::slice::from_ref(&self.legacy_model),
        }
    }

    pub async fn mock(&self) -> AnalysisResult {
        mock_analysis(self.mock_delay).await
    }

    /// Runs the configured pipeline over images already saved to `image_paths`.
    ///
    /// External failures degrade into an `Unknown` result; only local I/O errors are returned.
    pub async fn analyze(
        &self,
        request: &AnalysisRequest,
        image_paths: &[PathBuf],
    ) -> Result<AnalysisResult, AnalysisError> {
        let images = load_images(image_paths).await?;
        match self.mode {
            AnalysisMode::Multimodal => Ok(self.analyze_multimodal(request, &images).await),
            AnalysisMode::OcrThenReason => Ok(self.analyze_transcribed(request, &images).await),
        }
    }

    async fn analyze_multimodal(
        &self,
        request: &AnalysisRequest,
        images: &[MediaFile],
    ) -> AnalysisResult {
        let readable: Vec<MediaFile> = images
            .iter()
            .filter(|image| image.model_mime_type().is_some())
            .cloned()
            .collect();
        if readable.len() < images.len() {
            warn!(
                "Dropping {} upload(s) the model cannot read",
                images.len() - readable.len()
            );
            if readable.is_empty() && request.note.is_none() {
                return AnalysisResult::degraded(UNSUPPORTED_UPLOAD_MESSAGE);
            }
        }

        let prompt = build_analysis_prompt(&prompt_inputs(request, readable.len()));
        match self.reason_with_fallback(&prompt, &readable).await {
            Ok(verdict) => normalize_verdict(verdict),
            Err(err) => {
                warn!("Multimodal analysis failed: {}", err);
                AnalysisResult::degraded(unavailable_message(&err))
            }
        }
    }

    async fn analyze_transcribed(
        &self,
        request: &AnalysisRequest,
        images: &[MediaFile],
    ) -> AnalysisResult {
        let extracted = match self.recognize_all(images).await {
            Ok(text) => text,
            Err(err) => {
                warn!("OCR failed: {}", err);
                return AnalysisResult::degraded(RECOGNITION_FAILED_MESSAGE);
            }
        };

        // Counted after trimming, so whitespace-only OCR output is unreadable.
        if request.note.is_none() && extracted.trim().chars().count() < MIN_READABLE_CHARS {
            info!(
                "OCR produced {} readable characters; skipping reasoning",
                extracted.trim().chars().count()
            );
            return AnalysisResult::degraded(UNREADABLE_TEXT_MESSAGE);
        }

        let prompt = build_transcription_prompt(&extracted, &prompt_inputs(request, images.len()));
        match self.attempt(&self.legacy_model, &prompt, &[]).await {
            Ok(verdict) => normalize_verdict(verdict),
            Err(err) => {
                let err = AnalysisError::Reasoning(err.to_string());
                warn!("Reasoning over extracted text failed: {}", err);
                AnalysisResult::degraded(unavailable_message(&err))
            }
        }
    }

    async fn recognize_all(&self, images: &[MediaFile]) -> Result<String, AnalysisError> {
        let mut texts = Vec::with_capacity(images.len());
        for image in images {
            let text = self
                .recognizer
                .extract_text(image)
                .await
                .map_err(|err| AnalysisError::Recognition(err.to_string()))?;
            let text = text.trim();
            if !text.is_empty() {
                texts.push(text.to_string());
            }
        }
        Ok(texts.join("\n\n"))
    }

    async fn attempt(
        &self,
        model: &str,
        prompt: &str,
        images: &[MediaFile],
    ) -> anyhow::Result<ModelVerdict> {
        let raw = self.model.generate(model, prompt, images).await?;
        parse_model_verdict(&raw)
    }

    /// Tries each configured model in order and returns the first response that parses.
    pub async fn reason_with_fallback(
        &self,
        prompt: &str,
        images: &[MediaFile],
    ) -> Result<ModelVerdict, AnalysisError> {
        let mut attempts = Vec::new();
        for model in &self.models {
            match self.attempt(model, prompt, images).await {
                Ok(verdict) => {
                    info!(
                        "Model {} produced a verdict after {} failed attempt(s)",
                        model,
                        attempts.len()
                    );
                    return Ok(verdict);
                }
                Err(err) => {
                    warn!("Model {} failed: {}", model, err);
                    attempts.push(ModelAttempt {
                        model: model.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }
        Err(AnalysisError::AllModelsFailed { attempts })
    }
}
