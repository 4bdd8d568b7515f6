//! # Read-only HTTP API
//!
//! Serves registry reads over HTTP for dashboards and verifiers. No route
//! mutates state.
//!
//! | Route | Response |
//! |---|---|
//! | `GET /health` | `{ status, version }` |
//! | `GET /count` | `{ count }` |
//! | `GET /entries/{idx}` | entry JSON, 404 if absent, 400 if malformed |

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use rootstore_core::{
    BatchId, EntryRecord, MerkleRoot, Registry, RegistryError, RegistryStorage, Timestamp,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

// =============================================================================
// ERRORS
// =============================================================================

/// Failures surfaced to HTTP clients.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("internal error")]
    Internal(String),
}

impl ApiError {
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound { .. } => Self::NotFound(err.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Internal details stay in the log.
        if let Self::Internal(detail) = &self {
            error!(detail = %detail, "request failed");
        }
        let body = axum::Json(json!({ "error": self.to_string() }));
        (self.status_code(), body).into_response()
    }
}

// =============================================================================
// RESPONSE SHAPES
// =============================================================================

/// JSON form of a stored entry.
#[derive(Debug, Serialize)]
pub struct EntryView {
    pub idx: BatchId,
    pub schema: &'static str,
    pub merkle_root: MerkleRoot,
    pub metadata: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_ref: Option<String>,
    /// Whether metadata can still change at the time of the read.
    pub frozen: bool,
}

impl EntryView {
    pub fn new(idx: BatchId, record: &EntryRecord, now: Timestamp) -> Self {
        Self {
            idx,
            schema: record.schema(),
            merkle_root: record.merkle_root(),
            metadata: record.metadata().to_string(),
            lock_at: record.lock_at(),
            data_ref: record.data_ref().map(str::to_string),
            frozen: record.is_frozen_at(now),
        }
    }
}

// =============================================================================
// ROUTER
// =============================================================================

/// Build the read-only router over a shared registry.
pub fn router<S: RegistryStorage + 'static>(registry: Arc<Registry<S>>) -> Router {
    Router::new()
        .route("/health", get(health::<S>))
        .route("/count", get(count::<S>))
        .route("/entries/{idx}", get(entry::<S>))
        .layer(TraceLayer::new_for_http())
        .with_state(registry)
}

async fn health<S: RegistryStorage + 'static>(
    State(registry): State<Arc<Registry<S>>>,
) -> impl IntoResponse {
    axum::Json(json!({
        "status": "ok",
        "version": registry.version().as_str(),
    }))
}

async fn count<S: RegistryStorage + 'static>(
    State(registry): State<Arc<Registry<S>>>,
) -> Result<impl IntoResponse, ApiError> {
    let count = registry.count()?;
    Ok(axum::Json(json!({ "count": count })))
}

async fn entry<S: RegistryStorage + 'static>(
    State(registry): State<Arc<Registry<S>>>,
    Path(raw): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let idx: BatchId = raw
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("invalid idx {raw:?}: {e}")))?;
    debug!(idx = %idx, "entry lookup");

    let record = registry.get(&idx)?;
    Ok(axum::Json(EntryView::new(idx, &record, registry.now())))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_status_codes() {
        assert_eq!(
            ApiError::BadRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Internal("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn not_found_maps_to_404() {
        let err = ApiError::from(RegistryError::NotFound {
            idx: BatchId::from_name("absent"),
        });
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn entry_view_renders_hex_identifiers() {
        let idx = BatchId::from_name("batch-1");
        let root = MerkleRoot::digest(b"batch-1");
        let record = EntryRecord::TimeLocked {
            merkle_root: root,
            metadata: "{}".to_string(),
            lock_at: Timestamp::from_secs(10),
        };

        let view = EntryView::new(idx, &record, Timestamp::from_secs(5));
        let json = serde_json::to_value(&view).ok();

        assert_eq!(view.merkle_root, root);
        assert_eq!(
            json.as_ref().and_then(|v| v["merkle_root"].as_str()),
            Some(root.to_string().as_str())
        );
        assert_eq!(json.as_ref().and_then(|v| v["frozen"].as_bool()), Some(false));
    }
}
