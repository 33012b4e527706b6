use anyhow::{anyhow, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::Config;
use crate::llm::media::{truncate_for_log, MediaFile};
use crate::llm::TextRecognizer;
use crate::utils::timing::log_llm_timing;

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    full_text_annotation: Option<TextAnnotation>,
    error: Option<AnnotateStatus>,
}

#[derive(Debug, Deserialize)]
struct TextAnnotation {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct AnnotateStatus {
    #[serde(default)]
    message: String,
}

/// Google Cloud Vision `DOCUMENT_TEXT_DETECTION`, which handles dense text and handwriting.
#[derive(Clone)]
pub struct VisionClient {
    http: Client,
    api_key: String,
    endpoint: String,
}

fn text_from_response(response: AnnotateResponse) -> Result<String> {
    let Some(first) = response.responses.into_iter().next() else {
        return Ok(String::new());
    };
    if let Some(status) = first.error {
        if !status.message.trim().is_empty() {
            return Err(anyhow!("Vision API Error: {}", status.message));
        }
    }
    Ok(first
        .full_text_annotation
        .map(|annotation| annotation.text)
        .unwrap_or_default())
}

impl VisionClient {
    pub fn new(http: Client, config: &Config) -> Self {
        VisionClient {
            http,
            api_key: config.vision_api_key.clone(),
            endpoint: config.vision_endpoint.clone(),
        }
    }

    async fn annotate(&self, image: &MediaFile) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(anyhow!("VISION_API_KEY is not configured"));
        }

        let payload = json!({
            "requests": [{
                "image": { "content": general_purpose::STANDARD.encode(&image.bytes) },
                "features": [{ "type": "DOCUMENT_TEXT_DETECTION" }]
            }]
        });

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|err| anyhow!("Vision request failed: {}", err))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(
                "Vision API error: status={}, body={}",
                status,
                truncate_for_log(&body, 2000)
            );
            return Err(anyhow!("Vision request failed with status {}", status));
        }

        text_from_response(response.json::<AnnotateResponse>().await?)
    }
}

#[async_trait]
impl TextRecognizer for VisionClient {
    async fn extract_text(&self, image: &MediaFile) -> Result<String> {
        let metadata = json!({ "image": image.label(), "bytes": image.bytes.len() });
        let text = log_llm_timing(
            "vision",
            "document_text_detection",
            "extract_text",
            Some(metadata),
            move || self.annotate(image),
        )
        .await?;
        debug!("OCR extracted {} characters from {}", text.chars().count(), image.label());
        Ok(text)
    }
}
