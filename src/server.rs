use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers::{analyze_handler, health_handler};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.config.static_dir);
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/analyze", post(analyze_handler))
        .fallback_service(static_files)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::analysis::result::NEUTRAL_HEX;
    use crate::analysis::testing::{test_config, FakeModel, FakeRecognizer, PNG_BYTES, VERDICT_JSON};
    use crate::analysis::Analyzer;
    use crate::config::Config;

    const BOUNDARY: &str = "rx-test-boundary";

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a str, &'a [u8]),
    }

    fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                            .as_bytes(),
                    );
                }
                Part::File(name, file_name, bytes) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                             Content-Type: image/png\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(bytes);
                    body.extend_from_slice(b"\r\n");
                }
            }
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn analyze_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap()
    }

    fn app(config: Config, model: &Arc<FakeModel>, recognizer: &Arc<FakeRecognizer>) -> Router {
        let analyzer = Analyzer::new(&config, model.clone(), recognizer.clone());
        build_router(AppState::new(Arc::new(config), analyzer))
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn leftover_uploads(dir: &Path) -> usize {
        fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn health_reports_mode_and_models() {
        let root = tempfile::tempdir().unwrap();
        let model = Arc::new(FakeModel::failing("unused"));
        let recognizer = Arc::new(FakeRecognizer::returning(""));
        let app = app(test_config(root.path()), &model, &recognizer);

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["mode"], "multimodal");
        assert_eq!(body["models"][0], "gemini-test-pro");
    }

    #[tokio::test]
    async fn empty_submission_is_rejected_without_outbound_calls() {
        let root = tempfile::tempdir().unwrap();
        let config = test_config(root.path());
        let upload_dir = config.upload_dir.clone();
        let model = Arc::new(FakeModel::new(vec![Ok(VERDICT_JSON.to_string())]));
        let recognizer = Arc::new(FakeRecognizer::returning("Warfarin"));
        let app = app(config, &model, &recognizer);

        let response = app
            .oneshot(analyze_request(
                "/api/analyze",
                &[Part::Text("description", "   "), Part::Text("language", "English")],
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("at least one prescription image"));
        assert!(model.calls().is_empty());
        assert_eq!(recognizer.call_count(), 0);
        assert_eq!(leftover_uploads(&upload_dir), 0);
    }

    #[tokio::test]
    async fn mock_mode_returns_canned_payload() {
        let root = tempfile::tempdir().unwrap();
        let model = Arc::new(FakeModel::new(vec![Ok(VERDICT_JSON.to_string())]));
        let recognizer = Arc::new(FakeRecognizer::returning(""));
        let app = app(test_config(root.path()), &model, &recognizer);

        let response = app
            .oneshot(analyze_request(
                "/api/analyze?mock=true",
                &[Part::Text("description", "test")],
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["data"]["risk_level"], "Critical");
        assert_eq!(body["data"]["risk_hex"], "#ef4444");
        assert_eq!(
            body["data"]["medicines_found"],
            serde_json::json!(["Warfarin", "Aspirin"])
        );
        assert!(model.calls().is_empty());
    }

    #[tokio::test]
    async fn total_model_failure_still_returns_200_and_cleans_up() {
        let root = tempfile::tempdir().unwrap();
        let config = test_config(root.path());
        let upload_dir = config.upload_dir.clone();
        let model = Arc::new(FakeModel::failing("503 Service Unavailable"));
        let recognizer = Arc::new(FakeRecognizer::returning(""));
        let app = app(config, &model, &recognizer);

        let response = app
            .oneshot(analyze_request(
                "/api/analyze",
                &[
                    Part::File("image", "rx.png", PNG_BYTES),
                    Part::Text("language", "Spanish"),
                    Part::Text("conditions", "pregnancy"),
                ],
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["data"]["risk_level"], "Unknown");
        assert_eq!(body["data"]["risk_hex"], NEUTRAL_HEX);
        assert_eq!(body["data"]["medicines_found"], serde_json::json!([]));
        assert_eq!(model.calls().len(), 2);
        assert_eq!(leftover_uploads(&upload_dir), 0);
    }

    #[tokio::test]
    async fn successful_analysis_with_several_images() {
        let root = tempfile::tempdir().unwrap();
        let config = test_config(root.path());
        let upload_dir = config.upload_dir.clone();
        let model = Arc::new(FakeModel::new(vec![Ok(VERDICT_JSON.to_string())]));
        let recognizer = Arc::new(FakeRecognizer::returning(""));
        let app = app(config, &model, &recognizer);

        let response = app
            .oneshot(analyze_request(
                "/api/analyze",
                &[
                    Part::File("image", "first.png", PNG_BYTES),
                    Part::File("image", "second.png", PNG_BYTES),
                    Part::Text("description", "Also taking fish oil"),
                    Part::Text("conditions", "asthma"),
                    Part::Text("conditions", "pregnancy"),
                ],
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["data"]["risk_level"], "High");
        assert_eq!(body["data"]["risk_color"], "orange");
        assert_eq!(body["data"]["risk_hex"], "#f97316");
        assert_eq!(model.calls(), vec!["gemini-test-pro"]);
        assert_eq!(model.image_counts(), vec![2]);

        let prompts = model.prompts();
        let prompt = &prompts[0];
        assert!(prompt.contains("2 different prescription images"));
        assert!(prompt.contains("\"Also taking fish oil\""));
        assert!(prompt.contains("PATIENT CONDITIONS: asthma, pregnancy."));
        assert!(!prompt.contains("LANGUAGE:"));
        assert_eq!(leftover_uploads(&upload_dir), 0);
    }

    #[tokio::test]
    async fn oversized_upload_is_a_413() {
        let root = tempfile::tempdir().unwrap();
        let mut config = test_config(root.path());
        config.max_upload_bytes = 1024;
        let upload_dir = config.upload_dir.clone();
        let model = Arc::new(FakeModel::new(vec![Ok(VERDICT_JSON.to_string())]));
        let recognizer = Arc::new(FakeRecognizer::returning(""));
        let app = app(config, &model, &recognizer);

        let mut large = PNG_BYTES.to_vec();
        large.resize(8 * 1024, 0);
        let response = app
            .oneshot(analyze_request(
                "/api/analyze",
                &[
                    Part::Text("description", "Warfarin"),
                    Part::File("image", "rx.png", large.as_slice()),
                ],
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body = json_body(response).await;
        assert!(body["error"].as_str().is_some_and(|message| !message.is_empty()));
        assert!(model.calls().is_empty());
        assert_eq!(leftover_uploads(&upload_dir), 0);
    }

    #[tokio::test]
    async fn storage_failure_is_a_500_with_generic_message() {
        let root = tempfile::tempdir().unwrap();
        let mut config = test_config(root.path());
        let blocker = root.path().join("not-a-dir");
        fs::write(&blocker, b"file in the way").unwrap();
        config.upload_dir = blocker.join("uploads");
        let model = Arc::new(FakeModel::new(vec![Ok(VERDICT_JSON.to_string())]));
        let recognizer = Arc::new(FakeRecognizer::returning(""));
        let app = app(config, &model, &recognizer);

        let response = app
            .oneshot(analyze_request(
                "/api/analyze",
                &[Part::File("image", "rx.png", PNG_BYTES)],
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["error"], "Analysis failed");
        assert!(model.calls().is_empty());
    }

    #[tokio::test]
    async fn non_multipart_body_is_a_400() {
        let root = tempfile::tempdir().unwrap();
        let model = Arc::new(FakeModel::failing("unused"));
        let recognizer = Arc::new(FakeRecognizer::returning(""));
        let app = app(test_config(root.path()), &model, &recognizer);

        let request = Request::builder()
            .method("POST")
            .uri("/api/analyze")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().starts_with("Expected multipart/form-data"));
    }

    #[tokio::test]
    async fn root_serves_frontend_entry_point() {
        let root = tempfile::tempdir().unwrap();
        let config = test_config(root.path());
        fs::create_dir_all(&config.static_dir).unwrap();
        fs::write(config.static_dir.join("index.html"), "<h1>Rx Checker</h1>").unwrap();
        let model = Arc::new(FakeModel::failing("unused"));
        let recognizer = Arc::new(FakeRecognizer::returning(""));
        let app = app(config, &model, &recognizer);

        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"<h1>Rx Checker</h1>");
    }
}
