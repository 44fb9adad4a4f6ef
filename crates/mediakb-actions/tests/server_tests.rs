//! Webhook router tests: routing, payload validation and response shape.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Map, Value};
use tower::ServiceExt;

use mediakb_actions::{router, ActionExecutor, ActionQueryKnowledgeBase};
use mediakb_core::config::ActionConfig;
use mediakb_core::dataset::BulkDocument;
use mediakb_core::memory::InMemoryKnowledgeBase;
use mediakb_core::schema::Catalog;

fn app() -> Router {
    let mut kb = InMemoryKnowledgeBase::new(Catalog::default());
    let source: Map<String, Value> = json!({"title": "Heat", "publication_year": 1995, "director": "Michael Mann"})
        .as_object()
        .cloned()
        .unwrap();
    kb.insert("movie", vec![BulkDocument { id: "tt0113277".into(), source }]).unwrap();
    let mut executor = ActionExecutor::new();
    executor.register(Arc::new(ActionQueryKnowledgeBase::new(Arc::new(kb), ActionConfig::default())));
    router(Arc::new(executor))
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_webhook(body: String) -> Request<Body> {
    Request::post("/webhook").header("content-type", "application/json").body(Body::from(body)).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let response = app().oneshot(Request::get("/health").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({"status": "ok"}));
}

#[tokio::test]
async fn actions_lists_registered_names() {
    let response = app().oneshot(Request::get("/actions").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(json_body(response).await, json!([{"name": "action_query_knowledge_base"}]));
}

#[tokio::test]
async fn webhook_runs_the_knowledge_base_action() {
    let call = json!({
        "next_action": "action_query_knowledge_base",
        "sender_id": "default",
        "version": "2.8.0",
        "domain": {},
        "tracker": {
            "sender_id": "default",
            "slots": {"object_type": "movie", "director": "Michael Mann"},
            "latest_message": {"text": "movies by Michael Mann", "intent": {"name": "query_movies"}, "entities": []},
            "events": []
        }
    });
    let response = app().oneshot(post_webhook(call.to_string())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let texts: Vec<&str> = body["responses"].as_array().unwrap().iter().filter_map(|r| r["text"].as_str()).collect();
    assert_eq!(texts, ["I found the following movies with director: Michael Mann:", "1: Heat from 1995"]);
    let events = body["events"].as_array().unwrap();
    assert!(events.contains(&json!({"event": "slot", "name": "knowledge_base_last_object", "value": "tt0113277", "timestamp": null})));
    assert!(events.contains(&json!({"event": "slot", "name": "kb_outcome", "value": "found", "timestamp": null})));
}

#[tokio::test]
async fn unknown_action_is_404() {
    let call = json!({"next_action": "action_order_pizza", "tracker": {}, "domain": {}});
    let response = app().oneshot(post_webhook(call.to_string())).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["action_name"], "action_order_pizza");
}

#[tokio::test]
async fn malformed_payload_is_400() {
    let response = app().oneshot(post_webhook("{\"tracker\": 3}".into())).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].is_string());
}
