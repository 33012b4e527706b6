use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::{AnalysisRequest, AnalysisResult, ScratchUploads, UploadedImage};
use crate::error::{AnalysisError, ApiError};
use crate::state::AppState;
use crate::utils::timing::{complete_request_timer, start_request_timer};

const ANALYZE_ROUTE: &str = "/api/analyze";

#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeQuery {
    #[serde(default)]
    pub mock: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub status: &'static str,
    pub data: AnalysisResult,
}

fn flag_enabled(value: Option<&str>) -> bool {
    matches!(
        value.map(|value| value.trim().to_ascii_lowercase()).as_deref(),
        Some("true" | "1" | "yes")
    )
}

fn multipart_error(err: MultipartError) -> ApiError {
    let message = format!("Failed to read multipart field: {}", err.body_text());
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(message)
    } else {
        ApiError::BadRequest(message)
    }
}

async fn read_analysis_form(mut multipart: Multipart) -> Result<AnalysisRequest, ApiError> {
    let mut images = Vec::new();
    let mut note: Option<String> = None;
    let mut language: Option<String> = None;
    let mut conditions: Vec<String> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "image" => {
                let file_name = field.file_name().map(ToString::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                images.push(UploadedImage {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            "description" => note = Some(field.text().await.map_err(multipart_error)?),
            "language" => language = Some(field.text().await.map_err(multipart_error)?),
            "conditions" => {
                let value = field.text().await.map_err(multipart_error)?;
                if !value.trim().is_empty() {
                    conditions.push(value.trim().to_string());
                }
            }
            other => debug!("Ignoring unexpected form field '{}'", other),
        }
    }

    let conditions = (!conditions.is_empty()).then(|| conditions.join(", "));
    Ok(AnalysisRequest::new(images, note, language, conditions))
}

async fn run_analysis(
    state: &AppState,
    request: &AnalysisRequest,
    mock: bool,
) -> Result<AnalysisResult, AnalysisError> {
    if mock {
        return Ok(state.analyzer.mock().await);
    }

    let mut uploads = ScratchUploads::new(&state.config.upload_dir);
    uploads.save_all(&request.images).await?;
    state.analyzer.analyze(request, uploads.paths()).await
}

pub async fn analyze_handler(
    State(state): State<AppState>,
    Query(query): Query<AnalyzeQuery>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let multipart = multipart.map_err(|err| {
        ApiError::BadRequest(format!("Expected multipart/form-data: {}", err.body_text()))
    })?;
    let request = read_analysis_form(multipart).await?;
    request.validate()?;

    let mock = flag_enabled(query.mock.as_deref());
    let mode = if mock {
        "mock"
    } else {
        state.analyzer.mode().as_str()
    };
    let mut timer = start_request_timer(ANALYZE_ROUTE, request.images.len(), mode);
    debug!(
        request_id = timer.request_id(),
        language = %request.language,
        has_note = request.note.is_some(),
        has_conditions = request.conditions.is_some(),
        "Analyzing submission"
    );

    match run_analysis(&state, &request, mock).await {
        Ok(result) => {
            complete_request_timer(
                &mut timer,
                "success",
                Some(format!("risk_level={}", result.risk_level)),
            );
            Ok(Json(AnalyzeResponse {
                status: "success",
                data: result,
            }))
        }
        Err(err) => {
            complete_request_timer(&mut timer, "error", Some(err.to_string()));
            Err(ApiError::from(err))
        }
    }
}
