use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::analysis::result::ModelVerdict;

static CODE_FENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```[A-Za-z]*\s*(.*?)\s*```$").expect("valid code fence regex")
});

pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    CODE_FENCE_RE
        .captures(trimmed)
        .and_then(|captures| captures.get(1))
        .map(|body| body.as_str())
        .unwrap_or(trimmed)
}

fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

pub fn parse_model_verdict(raw: &str) -> Result<ModelVerdict> {
    let body = strip_code_fences(raw);
    if body.is_empty() {
        return Err(anyhow!("model returned an empty response"));
    }

    match serde_json::from_str::<ModelVerdict>(body) {
        Ok(verdict) => Ok(verdict),
        Err(err) => {
            let candidate = outermost_object(body)
                .ok_or_else(|| anyhow!("model response is not a JSON object: {err}"))?;
            serde_json::from_str::<ModelVerdict>(candidate)
                .map_err(|err| anyhow!("model response is not valid JSON: {err}"))
        }
    }
}
