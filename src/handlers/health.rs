use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

pub const SERVICE_NAME: &str = "Drug Interaction API";

pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "mode": state.analyzer.mode().as_str(),
        "models": state.analyzer.models(),
    }))
}
