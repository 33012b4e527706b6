use anyhow::{anyhow, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::config::{Config, SafetyProfile};
use crate::llm::media::{truncate_for_log, MediaFile};
use crate::llm::GenerativeModel;
use crate::utils::timing::log_llm_timing;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: String,
    base_url: String,
    temperature: f32,
    max_output_tokens: i32,
    safety: SafetyProfile,
}

fn build_safety_settings(profile: SafetyProfile) -> Vec<Value> {
    let threshold = match profile {
        SafetyProfile::Standard => "BLOCK_MEDIUM_AND_ABOVE",
        SafetyProfile::Permissive => "OFF",
    };

    vec![
        json!({ "category": "HARM_CATEGORY_HARASSMENT", "threshold": threshold }),
        json!({ "category": "HARM_CATEGORY_HATE_SPEECH", "threshold": threshold }),
        json!({ "category": "HARM_CATEGORY_SEXUALLY_EXPLICIT", "threshold": threshold }),
        json!({ "category": "HARM_CATEGORY_DANGEROUS_CONTENT", "threshold": threshold }),
    ]
}

fn build_gemini_parts(prompt: &str, images: &[MediaFile]) -> Vec<Value> {
    let mut parts = vec![json!({ "text": prompt })];

    for image in images {
        let Some(mime_type) = image.model_mime_type() else {
            warn!(
                "Skipping unsupported Gemini media {} (mime={})",
                image.label(),
                image.mime_type
            );
            continue;
        };
        parts.push(json!({
            "inlineData": {
                "mimeType": mime_type,
                "data": general_purpose::STANDARD.encode(&image.bytes)
            }
        }));
    }

    parts
}

fn summarize_gemini_parts(parts: &[Value]) -> Vec<Value> {
    parts
        .iter()
        .map(|part| {
            if let Some(text) = part.get("text").and_then(|value| value.as_str()) {
                json!({ "text": truncate_for_log(text, 200) })
            } else if let Some(inline_data) = part.get("inlineData") {
                let mime_type = inline_data
                    .get("mimeType")
                    .and_then(|value| value.as_str())
                    .unwrap_or("unknown");
                let data_len = inline_data
                    .get("data")
                    .and_then(|value| value.as_str())
                    .map(|value| value.len())
                    .unwrap_or(0);
                json!({ "inlineData": { "mimeType": mime_type, "dataLen": data_len } })
            } else {
                json!({ "unknownPart": true })
            }
        })
        .collect()
}

fn summarize_payload(payload: &Value) -> Value {
    let parts = payload
        .pointer("/contents/0/parts")
        .and_then(|value| value.as_array())
        .map(|parts| summarize_gemini_parts(parts))
        .unwrap_or_default();
    let mut summary = Map::new();
    summary.insert("parts".to_string(), Value::Array(parts));
    if let Some(config) = payload.get("generationConfig") {
        summary.insert("generationConfig".to_string(), config.clone());
    }
    Value::Object(summary)
}

fn summarize_error_body(body: &str) -> (Option<String>, String) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return (None, "empty response body".to_string());
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        let message = value
            .pointer("/error/message")
            .and_then(|v| v.as_str())
            .map(|v| v.to_string())
            .or_else(|| {
                value
                    .get("message")
                    .and_then(|v| v.as_str())
                    .map(|v| v.to_string())
            });
        return (message, truncate_for_log(&value.to_string(), 2000));
    }

    (None, truncate_for_log(trimmed, 2000))
}

fn extract_text_from_response(response: GeminiResponse) -> Result<String> {
    if let Some(reason) = response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason)
    {
        return Err(anyhow!("Gemini blocked the prompt: {}", reason));
    }

    let mut text_parts = Vec::new();
    let mut finish_reason = None;
    for candidate in response.candidates.unwrap_or_default() {
        if finish_reason.is_none() {
            finish_reason = candidate.finish_reason.clone();
        }
        let parts = candidate
            .content
            .and_then(|content| content.parts)
            .unwrap_or_default();
        for part in parts {
            if let Some(text) = part.text {
                if !text.trim().is_empty() {
                    text_parts.push(text);
                }
            }
        }
    }

    if text_parts.is_empty() {
        return Err(anyhow!(
            "Gemini returned no text (finish_reason={})",
            finish_reason.unwrap_or_else(|| "none".to_string())
        ));
    }
    Ok(text_parts.join("\n"))
}

impl GeminiClient {
    pub fn new(http: Client, config: &Config) -> Self {
        GeminiClient {
            http,
            api_key: config.gemini_api_key.clone(),
            base_url: config.gemini_base_url.clone(),
            temperature: config.gemini_temperature,
            max_output_tokens: config.gemini_max_output_tokens,
            safety: config.gemini_safety_settings,
        }
    }

    fn build_payload(&self, prompt: &str, images: &[MediaFile]) -> Value {
        json!({
            "contents": [{ "role": "user", "parts": build_gemini_parts(prompt, images) }],
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": self.max_output_tokens,
                "responseMimeType": "application/json",
            },
            "safetySettings": build_safety_settings(self.safety),
        })
    }

    async fn call_gemini_api(&self, model: &str, payload: &Value) -> Result<GeminiResponse> {
        if self.api_key.is_empty() {
            return Err(anyhow!("GEMINI_API_KEY is not configured"));
        }

        let url = format!("{}/models/{}:generateContent", self.base_url, model);

        if tracing::enabled!(tracing::Level::DEBUG) {
            let summary = summarize_payload(payload);
            debug!(target: "llm.gemini", model = model, payload = %summary);
        }

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|err| {
                warn!(
                    "Gemini request failed to send: {} (timeout={}, connect={})",
                    err,
                    err.is_timeout(),
                    err.is_connect()
                );
                anyhow!("Gemini request failed: {}", err)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let (message, body_summary) = summarize_error_body(&body);
            warn!("Gemini API error: status={}, body={}", status, body_summary);
            let detail = message.unwrap_or(body_summary);
            return Err(anyhow!(
                "Gemini request failed with status {}: {}",
                status,
                detail
            ));
        }

        Ok(response.json::<GeminiResponse>().await?)
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, model: &str, prompt: &str, images: &[MediaFile]) -> Result<String> {
        let payload = self.build_payload(prompt, images);
        let metadata = json!({ "images": images.len(), "prompt_chars": prompt.chars().count() });
        let payload = &payload;
        log_llm_timing("gemini", model, "generate_content", Some(metadata), move || async move {
            let response = self.call_gemini_api(model, payload).await?;
            let text = extract_text_from_response(response)?;
            debug!(target: "llm.gemini", model = model, response = %truncate_for_log(&text, 200));
            Ok(text)
        })
        .await
    }
}
