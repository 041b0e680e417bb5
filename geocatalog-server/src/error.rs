//! Failure types of the HTTP layer and their wire mapping.

use std::{io, net::SocketAddr};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use geocatalog_core::{FieldViolation, GeoObjectError};
use log::{debug, error};
use serde::Serialize;
use thiserror::Error;

/// Error returned while configuring or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The API prefix cannot be used as a route prefix.
    #[error("invalid API prefix {prefix:?}")]
    InvalidPrefix {
        /// Prefix as supplied.
        prefix: String,
    },
    /// The listener could not be bound.
    #[error("failed to bind {addr}")]
    Bind {
        /// Requested address.
        addr: SocketAddr,
        /// Socket error.
        #[source]
        source: io::Error,
    },
    /// The server stopped with an I/O failure.
    #[error("server terminated unexpectedly")]
    Serve {
        /// Listener error.
        #[source]
        source: io::Error,
    },
}

/// Request-level failure rendered as a JSON error body.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Failure reported by the catalog store.
    #[error(transparent)]
    Store(#[from] GeoObjectError),
    /// The request could not be decoded before reaching the store.
    #[error("{location} is invalid: {message}")]
    Unprocessable {
        /// Which part of the request was rejected.
        location: &'static str,
        /// Decoder message.
        message: String,
    },
    /// The blocking worker running the store call did not complete.
    #[error("store worker failed")]
    Worker(#[source] tokio::task::JoinError),
}

impl ApiError {
    pub(crate) fn unprocessable(location: &'static str, message: impl ToString) -> Self {
        Self::Unprocessable {
            location,
            message: message.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a [FieldViolation]>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Store(err) = &self {
            if err.is_client_error() {
                debug!("request rejected: {err}");
            }
        }
        let (status, errors) = match &self {
            Self::Store(GeoObjectError::UnknownType(_) | GeoObjectError::NotFound { .. }) => {
                (StatusCode::NOT_FOUND, None)
            }
            Self::Store(GeoObjectError::Conflict { .. }) => (StatusCode::CONFLICT, None),
            Self::Store(GeoObjectError::Validation(violations)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Some(violations.violations()),
            ),
            Self::Unprocessable { .. } => (StatusCode::UNPROCESSABLE_ENTITY, None),
            Self::Store(_) | Self::Worker(_) => {
                error!("request failed: {}", error_chain(&self));
                let body = ErrorBody {
                    detail: "internal server error".to_owned(),
                    errors: None,
                };
                return (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
            }
        };
        let body = ErrorBody {
            detail: self.to_string(),
            errors,
        };
        (status, Json(body)).into_response()
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
