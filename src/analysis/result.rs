use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

pub const NEUTRAL_HEX: &str = "#64748b";
pub const UNKNOWN_COLOR: &str = "unknown";

const COLOR_TABLE: &[(&str, &str)] = &[
    ("green", "#10b981"),
    ("yellow", "#f59e0b"),
    ("orange", "#f97316"),
    ("red", "#ef4444"),
    ("critical", "#b91c1c"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
    Unknown,
}

impl RiskLevel {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "low" => RiskLevel::Low,
            "medium" | "moderate" => RiskLevel::Medium,
            "high" => RiskLevel::High,
            "critical" => RiskLevel::Critical,
            _ => RiskLevel::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
            RiskLevel::Critical => "Critical",
            RiskLevel::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw object returned by the model, before any normalization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModelVerdict {
    #[serde(deserialize_with = "null_as_empty")]
    pub medicines_found: Vec<String>,
    pub risk_level: Option<String>,
    pub risk_color: Option<String>,
    pub alert_message: Option<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub alternatives: Vec<String>,
    pub disclaimer: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub medicines_found: Vec<String>,
    pub risk_level: RiskLevel,
    pub risk_color: String,
    pub risk_hex: String,
    pub alert_message: String,
    pub alternatives: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disclaimer: Option<String>,
}

fn known_color(name: &str) -> Option<(&'static str, &'static str)> {
    COLOR_TABLE
        .iter()
        .find(|(color, _)| *color == name)
        .copied()
}

pub fn risk_hex_for(color: &str) -> &'static str {
    known_color(&color.trim().to_lowercase())
        .map(|(_, hex)| hex)
        .unwrap_or(NEUTRAL_HEX)
}

fn canonical_color(color: Option<&str>) -> &'static str {
    color
        .and_then(|value| known_color(&value.trim().to_lowercase()))
        .map(|(name, _)| name)
        .unwrap_or(UNKNOWN_COLOR)
}

pub fn normalize_verdict(verdict: ModelVerdict) -> AnalysisResult {
    let risk_color = canonical_color(verdict.risk_color.as_deref());
    AnalysisResult {
        medicines_found: clean_list(verdict.medicines_found),
        risk_level: verdict
            .risk_level
            .as_deref()
            .map(RiskLevel::from_label)
            .unwrap_or(RiskLevel::Unknown),
        risk_color: risk_color.to_string(),
        risk_hex: risk_hex_for(risk_color).to_string(),
        alert_message: verdict.alert_message.unwrap_or_default().trim().to_string(),
        alternatives: clean_list(verdict.alternatives),
        disclaimer: verdict
            .disclaimer
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty()),
    }
}

fn clean_list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

impl AnalysisResult {
    /// Valid but uninformative result used whenever an external call could not produce one.
    pub fn degraded(message: impl Into<String>) -> Self {
        AnalysisResult {
            medicines_found: Vec::new(),
            risk_level: RiskLevel::Unknown,
            risk_color: UNKNOWN_COLOR.to_string(),
            risk_hex: NEUTRAL_HEX.to_string(),
            alert_message: message.into(),
            alternatives: Vec::new(),
            disclaimer: None,
        }
    }
}
