//! Axum router configuration

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::{sync::Arc, time::Duration};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{handlers, AppState};

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    let state = Arc::new(state);

    let pipeline_routes = Router::new()
        // Ingestion routes
        .route("/document-upload", post(handlers::upload_document))
        .route("/document-uploaded", post(handlers::document_uploaded))
        .route("/document-status", get(handlers::document_status))
        // Answer routes
        .route("/answer", post(handlers::answer_sync))
        .route("/answer-async", post(handlers::answer_async))
        .route("/answers/:transaction_id", get(handlers::answer_poll));

    // Health check routes
    let health_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check));

    Router::new()
        .merge(pipeline_routes)
        .merge(health_routes)
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Configure CORS layer
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(
            std::env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "*".to_string())
                .parse::<HeaderValue>()
                .unwrap_or(HeaderValue::from_static("*")),
        )
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use tower::ServiceExt;

    use factline_adapters::{ClientRegistry, MemoryQueue, ObjectStore};
    use factline_answer::AnswerService;
    use factline_core::FactlineConfig;
    use factline_ingestion::IngestionService;
    use factline_ledger::{MemoryLedger, StatusLedger};

    const DOC_ID: &str = "6f9619ff-8b86-d011-b42d-00c04fc964ff";

    struct TestApp {
        router: Router,
        clients: ClientRegistry,
    }

    fn test_app() -> TestApp {
        let mut config = FactlineConfig::default();
        config.embedding.dimension = 8;
        config.chunking.chunk_size_chars = 120;
        config.chunking.chunk_overlap_chars = 20;
        config.chunking.min_chunk_chars = 10;

        let queue = Arc::new(MemoryQueue::new());
        let clients = ClientRegistry::in_memory(queue, config.embedding.dimension);
        let ledger = StatusLedger::new(Arc::new(MemoryLedger::new()));

        let ingestion = Arc::new(
            IngestionService::new(ledger.clone(), clients.clone(), config.clone()).unwrap(),
        );
        let answer = Arc::new(AnswerService::new(ledger.clone(), clients.clone(), config));

        TestApp {
            router: create_router(AppState::new(ingestion, answer, ledger)),
            clients,
        }
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_uri(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn upload_body() -> Value {
        json!({
            "documentId": DOC_ID,
            "documentName": "contract.pdf",
            "metadataFilter": [{"key": "department", "value": "legal"}]
        })
    }

    #[tokio::test]
    async fn test_health_routes() {
        let app = test_app();

        let response = app
            .router
            .clone()
            .oneshot(get_uri("/health"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.router.oneshot(get_uri("/ready")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["service"], "factline");
    }

    #[tokio::test]
    async fn test_document_upload_then_conflict() {
        let app = test_app();

        let response = app
            .router
            .clone()
            .oneshot(post_json("/document-upload", upload_body()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["documentReference"], DOC_ID);
        assert!(body["storageUrl"].as_str().unwrap().contains("contract.pdf"));

        // Same identity again is a conflict, not a restart
        let response = app
            .router
            .oneshot(post_json("/document-upload", upload_body()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_json(response).await;
        assert!(body["errorMessage"].as_str().unwrap().contains(DOC_ID));
    }

    #[tokio::test]
    async fn test_document_upload_validation_error_body() {
        let app = test_app();

        let mut body = upload_body();
        body["documentId"] = json!("not-a-uuid");

        let response = app
            .router
            .oneshot(post_json("/document-upload", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["errorMessage"].is_string());
    }

    #[tokio::test]
    async fn test_document_status_flow() {
        let app = test_app();

        let response = app
            .router
            .clone()
            .oneshot(get_uri("/document-status?document-name=missing.pdf"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        app.router
            .clone()
            .oneshot(post_json("/document-upload", upload_body()))
            .await
            .unwrap();

        let response = app
            .router
            .oneshot(get_uri("/document-status?document-name=contract.pdf"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["documentId"], DOC_ID);
        assert_eq!(body["status"], "AWAITING_UPLOAD");
        assert!(body["lastUpdated"].is_string());
    }

    #[tokio::test]
    async fn test_document_uploaded_notification() {
        let app = test_app();

        app.router
            .clone()
            .oneshot(post_json("/document-upload", upload_body()))
            .await
            .unwrap();

        let mut metadata = HashMap::new();
        metadata.insert("documentId".to_string(), DOC_ID.to_string());
        app.clients
            .object_store
            .put("contract.pdf", b"content".to_vec(), metadata)
            .await
            .unwrap();

        let response = app
            .router
            .oneshot(post_json(
                "/document-uploaded",
                json!({"documentName": "contract.pdf"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "METADATA_VALIDATED");
    }

    #[tokio::test]
    async fn test_answer_async_submit_and_poll() {
        let app = test_app();

        let response = app
            .router
            .clone()
            .oneshot(post_json(
                "/answer-async",
                json!({
                    "userQuery": "What is the notice period?",
                    "queryPrompt": "Answer from context only.",
                    "metadataFilter": [{"key": "department", "value": "legal"}]
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ANSWER_GENERATION_PENDING");
        let transaction_id = body["transactionId"].as_str().unwrap().to_string();

        let response = app
            .router
            .clone()
            .oneshot(get_uri(&format!("/answers/{}", transaction_id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ANSWER_GENERATION_PENDING");
        assert!(body.get("llmResponse").is_none());

        let response = app
            .router
            .oneshot(get_uri("/answers/unknown-transaction"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_answer_sync() {
        let app = test_app();

        let response = app
            .router
            .clone()
            .oneshot(post_json(
                "/answer",
                json!({
                    "userQuery": "What is the notice period?",
                    "queryPrompt": "Answer from context only.",
                    "metadataFilter": [{"key": "department", "value": "legal"}]
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["userQuery"], "What is the notice period?");
        assert!(body["llmResponse"].is_string());
        assert!(body["chunkedEntries"].is_array());

        // Missing filters is a validation failure
        let response = app
            .router
            .oneshot(post_json(
                "/answer",
                json!({
                    "userQuery": "q",
                    "queryPrompt": "p",
                    "metadataFilter": []
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
