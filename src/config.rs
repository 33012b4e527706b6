use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};
use tracing::warn;

pub const DEFAULT_GEMINI_MODELS: &str = "gemini-2.5-pro,gemini-2.5-flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisMode {
    /// Images go straight to the generative model alongside the prompt.
    Multimodal,
    /// Legacy two-stage flow: OCR first, then a single text-only reasoning call.
    OcrThenReason,
}

impl AnalysisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::Multimodal => "multimodal",
            AnalysisMode::OcrThenReason => "ocr",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyProfile {
    Standard,
    Permissive,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub log_dir: PathBuf,
    pub log_quiet_targets: Vec<String>,
    pub bind_addr: SocketAddr,
    pub gemini_api_key: String,
    pub gemini_base_url: String,
    pub gemini_models: Vec<String>,
    pub gemini_legacy_model: String,
    pub gemini_temperature: f32,
    pub gemini_max_output_tokens: i32,
    pub gemini_safety_settings: SafetyProfile,
    pub vision_api_key: String,
    pub vision_endpoint: String,
    pub analysis_mode: AnalysisMode,
    pub upload_dir: PathBuf,
    pub static_dir: PathBuf,
    pub mock_delay: Duration,
    pub max_upload_bytes: usize,
    pub http_timeout: Duration,
}

const DEFAULT_QUIET_TARGETS: &str = "hyper,hyper_util,h2,reqwest,rustls";

type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn env_string(lookup: Lookup, name: &str, default: &str) -> String {
    lookup(name).unwrap_or_else(|| default.to_string())
}

fn env_f32(lookup: Lookup, name: &str, default: f32) -> f32 {
    lookup(name)
        .and_then(|value| value.trim().parse::<f32>().ok())
        .unwrap_or(default)
}

fn env_i32(lookup: Lookup, name: &str, default: i32) -> i32 {
    lookup(name)
        .and_then(|value| value.trim().parse::<i32>().ok())
        .unwrap_or(default)
}

fn env_u64(lookup: Lookup, name: &str, default: u64) -> u64 {
    lookup(name)
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(lookup: Lookup, name: &str, default: usize) -> usize {
    lookup(name)
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_csv(lookup: Lookup, name: &str, default: &str) -> Vec<String> {
    let parsed = split_csv(&env_string(lookup, name, default));
    if parsed.is_empty() {
        split_csv(default)
    } else {
        parsed
    }
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim().to_string())
        .filter(|entry| !entry.is_empty())
        .collect()
}

fn normalize_safety_settings(value: &str) -> SafetyProfile {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return SafetyProfile::Permissive;
    }

    match trimmed.to_lowercase().as_str() {
        "permissive" | "off" | "none" => SafetyProfile::Permissive,
        "standard" => SafetyProfile::Standard,
        _ => {
            warn!(
                "Unknown GEMINI_SAFETY_SETTINGS value '{}'; defaulting to permissive.",
                value
            );
            SafetyProfile::Permissive
        }
    }
}

fn normalize_analysis_mode(value: &str) -> AnalysisMode {
    match value.trim().to_lowercase().as_str() {
        "" | "multimodal" => AnalysisMode::Multimodal,
        "ocr" | "legacy" => AnalysisMode::OcrThenReason,
        _ => {
            warn!(
                "Unknown ANALYSIS_MODE value '{}'; defaulting to multimodal.",
                value
            );
            AnalysisMode::Multimodal
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_lookup(&|name: &str| env::var(name).ok())
    }

    pub fn from_lookup(lookup: Lookup) -> Result<Self> {
        let bind_addr_raw = env_string(lookup, "BIND_ADDR", "127.0.0.1:5000");
        let bind_addr = bind_addr_raw
            .trim()
            .parse::<SocketAddr>()
            .map_err(|err| anyhow!("Invalid BIND_ADDR '{}': {}", bind_addr_raw, err))?;

        // Absence is tolerated here; model calls fail individually instead.
        let gemini_api_key = env_string(lookup, "GEMINI_API_KEY", "").trim().to_string();
        if gemini_api_key.is_empty() {
            warn!("GEMINI_API_KEY is not set; analysis requests will degrade to Unknown results");
        }
        let vision_api_key = lookup("VISION_API_KEY")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| gemini_api_key.clone());

        Ok(Config {
            log_level: env_string(lookup, "LOG_LEVEL", "info").to_lowercase(),
            log_dir: PathBuf::from(env_string(lookup, "LOG_DIR", "logs")),
            log_quiet_targets: env_csv(lookup, "LOG_QUIET_TARGETS", DEFAULT_QUIET_TARGETS),
            bind_addr,
            gemini_api_key,
            gemini_base_url: env_string(
                lookup,
                "GEMINI_BASE_URL",
                "https://generativelanguage.googleapis.com/v1beta",
            )
            .trim_end_matches('/')
            .to_string(),
            gemini_models: env_csv(lookup, "GEMINI_MODELS", DEFAULT_GEMINI_MODELS),
            gemini_legacy_model: env_string(lookup, "GEMINI_LEGACY_MODEL", "gemini-2.5-flash"),
            gemini_temperature: env_f32(lookup, "GEMINI_TEMPERATURE", 0.2),
            gemini_max_output_tokens: env_i32(lookup, "GEMINI_MAX_OUTPUT_TOKENS", 2048),
            gemini_safety_settings: normalize_safety_settings(&env_string(
                lookup,
                "GEMINI_SAFETY_SETTINGS",
                "permissive",
            )),
            vision_api_key,
            vision_endpoint: env_string(
                lookup,
                "VISION_ENDPOINT",
                "https://vision.googleapis.com/v1/images:annotate",
            ),
            analysis_mode: normalize_analysis_mode(&env_string(
                lookup,
                "ANALYSIS_MODE",
                "multimodal",
            )),
            upload_dir: PathBuf::from(env_string(lookup, "UPLOAD_DIR", "temp_uploads")),
            static_dir: PathBuf::from(env_string(lookup, "STATIC_DIR", "frontend")),
            mock_delay: Duration::from_millis(env_u64(lookup, "MOCK_DELAY_MS", 1500)),
            max_upload_bytes: env_usize(lookup, "MAX_UPLOAD_BYTES", 20 * 1024 * 1024),
            http_timeout: Duration::from_secs(env_u64(lookup, "HTTP_TIMEOUT_SECONDS", 90).max(1)),
        })
    }
}
