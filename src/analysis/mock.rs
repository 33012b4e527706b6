use std::time::Duration;

use tracing::info;

use crate::analysis::result::{normalize_verdict, AnalysisResult, ModelVerdict};

pub const MOCK_DISCLAIMER: &str =
    "Simulated result for testing. No prescription was analyzed and no external service was called.";

pub fn canned_result() -> AnalysisResult {
    normalize_verdict(ModelVerdict {
        medicines_found: vec!["Warfarin".to_string(), "Aspirin".to_string()],
        risk_level: Some("Critical".to_string()),
        risk_color: Some("red".to_string()),
        alert_message: Some(
            "Taking Warfarin together with Aspirin greatly increases the risk of serious bleeding. \
             Do not combine them without your doctor's approval."
                .to_string(),
        ),
        alternatives: vec![
            "Paracetamol (Acetaminophen) for pain relief, at the lowest effective dose".to_string(),
        ],
        disclaimer: Some(MOCK_DISCLAIMER.to_string()),
    })
}

pub async fn mock_analysis(delay: Duration) -> AnalysisResult {
    info!("Serving mock analysis after {} ms", delay.as_millis());
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    canned_result()
}
