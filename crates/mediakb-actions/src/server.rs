use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::executor::{ActionCall, ActionExecutor, ExecutorError};

/// Routes of the action server:
/// - `POST /webhook` runs the requested action
/// - `GET /health` liveness probe
/// - `GET /actions` registered action names
pub fn router(executor: Arc<ActionExecutor>) -> Router {
    Router::new()
        .route("/webhook", post(webhook))
        .route("/health", get(health))
        .route("/actions", get(actions))
        .layer(TraceLayer::new_for_http())
        .with_state(executor)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn actions(State(executor): State<Arc<ActionExecutor>>) -> Json<Value> {
    let names: Vec<Value> = executor.names().into_iter().map(|name| json!({ "name": name })).collect();
    Json(Value::Array(names))
}

async fn webhook(
    State(executor): State<Arc<ActionExecutor>>,
    payload: Result<Json<ActionCall>, JsonRejection>,
) -> Response {
    let call = match payload {
        Ok(Json(call)) => call,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "rejected webhook payload");
            let body = json!({ "error": rejection.body_text(), "action_name": Value::Null });
            return (StatusCode::BAD_REQUEST, Json(body)).into_response();
        }
    };
    match executor.run(&call).await {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => {
            let status = match &e {
                ExecutorError::ActionNotFound(_) => StatusCode::NOT_FOUND,
                ExecutorError::ActionFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            };
            error!(action = e.action_name(), error = %e, "action call failed");
            let body = json!({ "error": e.to_string(), "action_name": e.action_name() });
            (status, Json(body)).into_response()
        }
    }
}
