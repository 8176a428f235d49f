//! Handles GET {management context}/health

use axum::response::Json;
use serde_json::{Value, json};

pub async fn handle_health() -> Json<Value> {
    Json(json!({ "status": "UP" }))
}
