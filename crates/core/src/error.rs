// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy shared by the control and worker HTTP surfaces.
//!
//! Mirrors the stable `{error: {code, message}}` envelope and maps each
//! taxonomy bucket from the design (validation / authorization / conflict
//! / pre-condition / transient / fatal) onto an HTTP status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// API-facing error. `detail` carries machine-readable recovery context
/// (e.g. `{tenant_id}` on a setup conflict, `{error: "..."}` on a
/// pre-condition failure).
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    #[error("validation: {0}")]
    Validation(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict { message: String, detail: Value },
    #[error("precondition failed: {0}")]
    Precondition { message: String, detail: Value },
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("internal error")]
    Internal(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Conflict { .. } => "conflict",
            Self::Precondition { .. } => "precondition_failed",
            Self::ServiceUnavailable(_) => "service_unavailable",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Precondition { .. } => StatusCode::BAD_REQUEST,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> Value {
        match self {
            Self::Conflict { detail, .. } | Self::Precondition { detail, .. } => detail.clone(),
            _ => Value::Null,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Validation(m)
            | Self::NotFound(m)
            | Self::Conflict { message: m, .. }
            | Self::Precondition { message: m, .. }
            | Self::ServiceUnavailable(m) => m.clone(),
            Self::Unauthorized => "unauthorized".to_owned(),
            Self::Forbidden => "forbidden".to_owned(),
            Self::Internal(_) => "internal error".to_owned(),
        }
    }
}

/// Top-level error response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error body with machine-readable code, human-readable message, and
/// optional structured recovery detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub detail: Value,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if matches!(self, Self::Internal(ref msg) if !msg.is_empty()) {
            tracing::error!(error = %self, "internal error");
        }
        let status = self.status();
        let body = ErrorResponse {
            error: ErrorBody { code: self.code().to_owned(), message: self.message(), detail: self.detail() },
        };
        (status, Json(body)).into_response()
    }
}
