// SPDX-License-Identifier: MIT

//! `ApiError`: the one error type every route handler returns, mapped
//! to HTTP status classes per `spec.md` §7. Grounded on
//! `maxBogovick-rustmemodb`'s `WebError` (`src/web/mod.rs`): a flat enum
//! with `From` impls collapsing each domain crate's error type, and one
//! `IntoResponse` match translating it to `{error}` JSON.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Precondition(String),
    #[error("{0}")]
    Conflict(String),
    #[error("agent not connected")]
    AgentUnavailable,
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Storage(#[from] bc_storage::StorageError),
    #[error(transparent)]
    Layout(#[from] bc_layout::LayoutError),
    #[error(transparent)]
    Registry(#[from] bc_registry::RegistryError),
    #[error(transparent)]
    Deploy(#[from] bc_deploy::DeployError),
    #[error(transparent)]
    Orchestrator(#[from] bc_orchestrator::OrchestratorError),
    #[error(transparent)]
    Scheduler(#[from] bc_scheduler::SchedulerError),
    #[error(transparent)]
    Validate(#[from] bc_core::ValidationError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(message) => (StatusCode::UNPROCESSABLE_ENTITY, message),
            ApiError::Precondition(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, message),
            ApiError::AgentUnavailable => {
                (StatusCode::SERVICE_UNAVAILABLE, "agent not connected".to_string())
            }
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),

            ApiError::Storage(bc_storage::StorageError::NotFound(what)) => {
                (StatusCode::NOT_FOUND, format!("{what} not found"))
            }
            ApiError::Storage(error) => {
                tracing::error!(%error, "storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal storage error".to_string())
            }

            ApiError::Layout(bc_layout::LayoutError::PathEscape) => {
                (StatusCode::FORBIDDEN, "requested path escapes the storage root".to_string())
            }
            ApiError::Layout(error) => {
                tracing::error!(%error, "layout error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal storage-layout error".to_string())
            }

            ApiError::Registry(bc_registry::RegistryError::NotConnected) => {
                (StatusCode::SERVICE_UNAVAILABLE, "agent not connected".to_string())
            }
            ApiError::Registry(bc_registry::RegistryError::Timeout) => {
                (StatusCode::GATEWAY_TIMEOUT, "agent request timed out".to_string())
            }
            ApiError::Registry(bc_registry::RegistryError::Closed)
            | ApiError::Registry(bc_registry::RegistryError::Transport(_)) => {
                (StatusCode::BAD_GATEWAY, "agent connection closed mid-request".to_string())
            }
            ApiError::Registry(bc_registry::RegistryError::UnknownServer) => {
                (StatusCode::NOT_FOUND, "server not found".to_string())
            }

            ApiError::Deploy(error) => {
                tracing::warn!(%error, "agent deploy failed");
                (StatusCode::UNPROCESSABLE_ENTITY, error.to_string())
            }

            ApiError::Orchestrator(bc_orchestrator::OrchestratorError::NotRunning) => {
                (StatusCode::NOT_FOUND, "job is not running".to_string())
            }
            ApiError::Orchestrator(bc_orchestrator::OrchestratorError::AgentNotConnected) => {
                (StatusCode::SERVICE_UNAVAILABLE, "agent not connected".to_string())
            }
            ApiError::Orchestrator(bc_orchestrator::OrchestratorError::Storage(inner)) => {
                return ApiError::Storage(inner).into_response();
            }
            ApiError::Orchestrator(bc_orchestrator::OrchestratorError::Layout(inner)) => {
                return ApiError::Layout(inner).into_response();
            }

            ApiError::Scheduler(error) => {
                (StatusCode::BAD_REQUEST, format!("invalid cron expression: {error}"))
            }

            ApiError::Validate(error) => (StatusCode::UNPROCESSABLE_ENTITY, error.to_string()),
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
