//! # Error Handling
//!
//! [`FilterSetError`] is returned by filter set construction and binding.
//! [`ApiError`] turns it into an HTTP response for axum handlers:
//!
//! - invalid user input becomes `400 Bad Request` with per-parameter details,
//! - invalid filter set declarations and database failures become
//!   `500 Internal Server Error`. Their details are logged and never sent to
//!   the client.
//!
//! ```rust,ignore
//! async fn list_clusters(
//!     State(ctx): State<FilterContext>,
//!     params: QueryParams,
//! ) -> Result<Json<Vec<cluster::Model>>, ApiError> {
//!     let filterset = FilterSet::<ClusterFilterSet>::new(params, &ctx).await?;
//!     let select = filterset.apply(cluster::Entity::find()).await?;
//!     Ok(Json(select.all(ctx.db()).await.map_err(ApiError::database)?))
//! }
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;
use std::fmt;

use crate::validation::{ValidationError, ValidationErrors};

/// Errors raised while building or applying a filter set.
#[derive(Debug, thiserror::Error)]
pub enum FilterSetError {
    /// A filter set definition refers to fields or lookups its entity cannot
    /// support. Raised at construction; fix the definition.
    #[error("invalid filter set declaration on {filterset}: {message}")]
    InvalidDeclaration {
        filterset: &'static str,
        message: String,
    },

    /// Malformed query parameter values.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// A collaborator store failed.
    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

impl FilterSetError {
    pub(crate) fn invalid_declaration(filterset: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidDeclaration {
            filterset,
            message: message.into(),
        }
    }

    /// Shorthand for a single-parameter validation failure.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(ValidationError::new(field, message).into())
    }
}

/// API error with logging and sanitized responses
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - One or more filter values failed validation
    ValidationFailed {
        /// User-facing validation errors
        errors: Vec<ValidationError>,
    },

    /// 500 Internal Server Error - Database error (details logged, not exposed)
    Database {
        /// User-facing generic message
        message: String,
        /// Internal error (logged, not sent to user)
        internal: DbErr,
    },

    /// 500 Internal Server Error - Generic internal error
    Internal {
        /// User-facing generic message
        message: String,
        /// Internal error details (logged, not sent to user)
        internal: Option<String>,
    },
}

impl ApiError {
    #[must_use]
    pub fn validation_failed(errors: ValidationErrors) -> Self {
        Self::ValidationFailed {
            errors: errors.errors().to_vec(),
        }
    }

    /// The database error details are logged but NOT sent to the user.
    #[must_use]
    pub fn database(err: DbErr) -> Self {
        Self::Database {
            message: "A database error occurred".to_string(),
            internal: err,
        }
    }

    pub fn internal(message: impl Into<String>, internal: Option<String>) -> Self {
        Self::Internal {
            message: message.into(),
            internal,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            Self::Database { .. } | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn user_message(&self) -> String {
        match self {
            Self::Database { message, .. }
            | Self::Internal { message, .. } => message.clone(),
            Self::ValidationFailed { errors } => match errors.as_slice() {
                [single] => single.to_string(),
                _ => format!(
                    "Validation failed: {}",
                    errors
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            },
        }
    }

    fn log_internal(&self) {
        match self {
            Self::Database { internal, .. } => {
                tracing::error!(error = ?internal, "Database error occurred");
            }
            Self::Internal {
                internal: Some(details),
                ..
            } => {
                tracing::error!(details = %details, "Internal error occurred");
            }
            _ => {
                tracing::debug!(
                    error = %self.user_message(),
                    status = %self.status_code(),
                    "API error"
                );
            }
        }
    }
}

/// Error response sent to users (sanitized)
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<ValidationError>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log_internal();

        let status = self.status_code();
        let response = match &self {
            Self::ValidationFailed { errors } => ErrorResponse {
                error: "Validation failed".to_string(),
                details: Some(errors.clone()),
            },
            _ => ErrorResponse {
                error: self.user_message(),
                details: None,
            },
        };

        (status, Json(response)).into_response()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.user_message())
    }
}

impl std::error::Error for ApiError {}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        Self::database(err)
    }
}

/// Declaration errors are programming errors: logged in full, reported as 500.
impl From<FilterSetError> for ApiError {
    fn from(err: FilterSetError) -> Self {
        match err {
            FilterSetError::Validation(errors) => Self::validation_failed(errors),
            FilterSetError::Database(db_err) => Self::database(db_err),
            declaration @ FilterSetError::InvalidDeclaration { .. } => Self::internal(
                "The filter configuration for this resource is invalid",
                Some(declaration.to_string()),
            ),
        }
    }
}
