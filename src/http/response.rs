//! Response envelope and error mapping.

use crate::error::DbError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use tracing::error;

/// `{"code": 200, "message": "success", "data": ...}`
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub code: u16,
    pub message: &'static str,
    pub data: T,
}

pub fn success<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        code: StatusCode::OK.as_u16(),
        message: "success",
        data,
    })
}

/// A failed handler. Every kind answers 500 with a short detail; the full
/// error goes to the log only.
#[derive(Debug)]
pub enum ApiError {
    Query(DbError),
    Execution(DbError),
}

impl ApiError {
    pub fn query(err: DbError) -> Self {
        Self::Query(err)
    }

    pub fn execution(err: DbError) -> Self {
        Self::Execution(err)
    }

    pub fn detail(&self) -> &'static str {
        match self {
            Self::Query(_) => "query failed",
            Self::Execution(_) => "execution failed",
        }
    }

    fn error(&self) -> &DbError {
        match self {
            Self::Query(e) | Self::Execution(e) => e,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.error();
        error!(error = %err, kind = err.kind(), "Request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": self.detail() })),
        )
            .into_response()
    }
}

pub type ApiResult<T> = Result<Json<Envelope<T>>, ApiError>;
