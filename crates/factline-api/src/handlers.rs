//! Request handlers
//!
//! Handlers shape requests and responses only; state machine semantics
//! live in the ingestion and answer crates.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use factline_answer::{AnswerRequest, PollResponse, SubmitReceipt, SyncAnswer};
use factline_ingestion::{UploadReceipt, UploadRequest};

use crate::error::ApiError;
use crate::AppState;

type HandlerResult<T> = std::result::Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct DocumentStatusQuery {
    #[serde(rename = "document-name")]
    pub document_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStatusResponse {
    pub document_id: String,
    pub document_name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedNotification {
    pub document_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedNotificationResponse {
    pub document_name: String,
    pub status: String,
}

/// `POST /document-upload`
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UploadRequest>,
) -> HandlerResult<UploadReceipt> {
    let receipt = state.ingestion.initiate_upload(&request).await?;
    Ok(Json(receipt))
}

/// `POST /document-uploaded`, the blob-landed notification standing in for
/// a storage trigger: validates metadata and enqueues processing.
pub async fn document_uploaded(
    State(state): State<Arc<AppState>>,
    Json(notification): Json<UploadedNotification>,
) -> HandlerResult<UploadedNotificationResponse> {
    if notification.document_name.trim().is_empty() {
        return Err(ApiError::Validation(
            "documentName must not be blank".to_string(),
        ));
    }

    let status = state
        .ingestion
        .validate_uploaded(&notification.document_name)
        .await?;

    Ok(Json(UploadedNotificationResponse {
        document_name: notification.document_name,
        status: status.as_str().to_string(),
    }))
}

/// `GET /document-status?document-name=X`
pub async fn document_status(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DocumentStatusQuery>,
) -> HandlerResult<DocumentStatusResponse> {
    if query.document_name.trim().is_empty() {
        return Err(ApiError::Validation(
            "document-name query parameter must not be blank".to_string(),
        ));
    }

    let record = state.ledger.find_by_subject(&query.document_name).await?;

    Ok(Json(DocumentStatusResponse {
        document_id: record.identity,
        document_name: record.subject_name,
        status: record.status,
        reason: record.reason,
        last_updated: record.updated_at,
    }))
}

/// `POST /answer`: synchronous retrieval and generation.
pub async fn answer_sync(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnswerRequest>,
) -> HandlerResult<SyncAnswer> {
    let answer = state.answer.answer_sync(&request).await?;
    Ok(Json(answer))
}

/// `POST /answer-async`
pub async fn answer_async(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnswerRequest>,
) -> HandlerResult<SubmitReceipt> {
    let receipt = state.answer.submit(&request).await?;
    Ok(Json(receipt))
}

/// `GET /answers/:transaction_id`
pub async fn answer_poll(
    State(state): State<Arc<AppState>>,
    Path(transaction_id): Path<String>,
) -> HandlerResult<PollResponse> {
    let response = state.answer.poll(&transaction_id).await?;
    Ok(Json(response))
}

/// `GET /health`
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// `GET /ready`
pub async fn readiness_check() -> Json<serde_json::Value> {
    Json(json!({
        "service": "factline",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "ready"
    }))
}
