//! # Filter errors
//!
//! Two kinds of failure exist while compiling a filter table:
//!
//! - **Validation errors** ([`crate::validation::ValidationError`]): a submitted value
//!   does not fit its field. They are collected, never abort the pass, and are meant
//!   to be shown back to the user next to the filter form.
//! - **Contract violations** ([`FilterError`]): the filter itself is unusable, e.g. no
//!   query handle was supplied or a field references a relation the handle cannot
//!   traverse. They abort the pass before anything is mutated.
//!
//! `FilterError` implements axum's `IntoResponse`, so handlers can propagate it with
//! `?`. The response body is sanitized; details are logged with `tracing`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;

/// Contract violation detected at the entry of a compilation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// No query handle was attached to the filter
    MissingQuery,

    /// The query handle refused to accept predicates
    UnsupportedQuery {
        /// Why the handle is unusable
        reason: String,
    },

    /// A field traverses a relation the query handle does not know
    UnknownRelation {
        /// Filter table key of the offending field
        field: String,
        /// Relation name the field asked for
        relation: String,
    },
}

impl FilterError {
    pub fn unsupported_query(reason: impl Into<String>) -> Self {
        Self::UnsupportedQuery {
            reason: reason.into(),
        }
    }

    pub fn unknown_relation(field: impl Into<String>, relation: impl Into<String>) -> Self {
        Self::UnknownRelation {
            field: field.into(),
            relation: relation.into(),
        }
    }

    /// Contract violations are programming errors on the server side.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingQuery => write!(f, "Missing or empty parameter: query"),
            Self::UnsupportedQuery { reason } => write!(f, "Wrong type of query object: {reason}"),
            Self::UnknownRelation { field, relation } => {
                write!(f, "Field '{field}' references unknown relation '{relation}'")
            }
        }
    }
}

impl std::error::Error for FilterError {}

/// Error response sent to users (sanitized)
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for FilterError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Filter contract violation");

        let body = ErrorResponse {
            error: "Filter configuration error".to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}
