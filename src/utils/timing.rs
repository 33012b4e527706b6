use std::time::Instant;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tracing::info;
use uuid::Uuid;

#[derive(Debug)]
pub struct RequestTimer {
    request_id: String,
    route: String,
    image_count: usize,
    mode: String,
    started_at: DateTime<Utc>,
    started_perf: Instant,
    status: String,
    detail: Option<String>,
    completed: bool,
}

impl RequestTimer {
    pub fn new(route: &str, image_count: usize, mode: &str) -> Self {
        RequestTimer {
            request_id: Uuid::new_v4().to_string(),
            route: route.to_string(),
            image_count,
            mode: mode.to_string(),
            started_at: Utc::now(),
            started_perf: Instant::now(),
            status: "success".to_string(),
            detail: None,
            completed: false,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn log_received(&self) {
        info!(
            target: "api.timing",
            "event=request_received request_id={} route={} images={} mode={} received_at={}",
            self.request_id,
            self.route,
            self.image_count,
            self.mode,
            self.started_at.to_rfc3339()
        );
    }

    pub fn mark_status(&mut self, status: &str, detail: Option<String>) {
        self.status = status.to_string();
        self.detail = detail;
    }

    pub fn log_completed(&mut self) {
        if self.completed {
            return;
        }
        self.completed = true;
        let completed_at = Utc::now();
        let duration = self.started_perf.elapsed().as_secs_f64();
        info!(
            target: "api.timing",
            "event=request_completed request_id={} route={} images={} mode={} started_at={} completed_at={} duration_s={:.3} status={} detail={}",
            self.request_id,
            self.route,
            self.image_count,
            self.mode,
            self.started_at.to_rfc3339(),
            completed_at.to_rfc3339(),
            duration,
            self.status,
            self.detail.clone().unwrap_or_default()
        );
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        if !self.completed {
            self.mark_status("aborted", None);
            self.log_completed();
        }
    }
}

pub fn start_request_timer(route: &str, image_count: usize, mode: &str) -> RequestTimer {
    let timer = RequestTimer::new(route, image_count, mode);
    timer.log_received();
    timer
}

pub fn complete_request_timer(timer: &mut RequestTimer, status: &str, detail: Option<String>) {
    timer.mark_status(status, detail);
    timer.log_completed();
}

pub async fn log_llm_timing<T, F, Fut>(
    provider: &str,
    model: &str,
    operation: &str,
    metadata: Option<JsonValue>,
    call: F,
) -> Result<T, anyhow::Error>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T, anyhow::Error>>,
{
    let started_at = Utc::now();
    let started_perf = Instant::now();
    let metadata_text = metadata
        .as_ref()
        .map(|value| value.to_string())
        .unwrap_or_else(|| "{}".to_string());
    info!(
        target: "api.timing",
        "event=llm_request provider={} model={} operation={} started_at={} metadata={}",
        provider,
        model,
        operation,
        started_at.to_rfc3339(),
        metadata_text
    );

    let result = call().await;
    let status = if result.is_err() { "error" } else { "success" };

    let completed_at = Utc::now();
    let duration = started_perf.elapsed().as_secs_f64();
    info!(
        target: "api.timing",
        "event=llm_response provider={} model={} operation={} completed_at={} duration_s={:.3} status={} metadata={}",
        provider,
        model,
        operation,
        completed_at.to_rfc3339(),
        duration,
        status,
        metadata_text
    );

    result
}
