//! # Error Handling
//!
//! [`GridError`] covers every failure the grid pipeline can report:
//! - configuration mistakes caught when a [`GridConfig`](crate::config::GridConfig) is built
//! - directives that cannot be resolved (only raised in strict mode)
//! - malformed client parameters
//! - backend failures, wrapped from `sea_orm::DbErr`
//!
//! When returned from an axum handler the error becomes a JSON response with a
//! sanitized message. Internal details (database errors, SQL) are logged with
//! `tracing` and never sent to the client.
//!
//! ```rust,ignore
//! async fn users(State(state): State<GridState>, Form(pairs): Form<Vec<(String, String)>>)
//!     -> Result<Json<ResultPage>, GridError>
//! {
//!     let request = DrawRequest::from_pairs(pairs)?;
//!     let page = execute(&state.config, &request, &SeaOrmSource::new(state.db.clone())).await?;
//!     Ok(Json(page))
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

#[derive(Debug)]
pub enum GridError {
    /// Invalid grid configuration, detected when the config is built
    Configuration {
        message: String,
    },

    /// A request directive that cannot be resolved against the configuration
    Resolution {
        message: String,
    },

    /// 400 Bad Request - malformed client parameters
    BadRequest {
        message: String,
    },

    /// 500 Internal Server Error - backend failure (details logged, not exposed)
    Database {
        message: String,
        internal: DbErr,
    },

    /// 500 Internal Server Error - anything else
    Internal {
        message: String,
        internal: Option<String>,
    },
}

impl GridError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn resolution(message: impl Into<String>) -> Self {
        Self::Resolution {
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Wrap a backend error. The details are logged, never sent to clients.
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

    /// HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Configuration { .. } | Self::Database { .. } | Self::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Resolution { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
        }
    }

    /// Sanitized, user-facing message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Configuration { .. } => "The grid is misconfigured".to_string(),
            Self::Resolution { message }
            | Self::BadRequest { message }
            | Self::Database { message, .. }
            | Self::Internal { message, .. } => message.clone(),
        }
    }

    fn log_internal(&self) {
        match self {
            Self::Configuration { message } => {
                tracing::error!(details = %message, "Grid configuration error");
            }
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
                    "Grid request error"
                );
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for GridError {
    fn into_response(self) -> Response {
        self.log_internal();
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.user_message(),
        };
        (status, Json(body)).into_response()
    }
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Configuration details are for the developer, not the client
            Self::Configuration { message } => write!(f, "configuration error: {message}"),
            _ => write!(f, "{}", self.user_message()),
        }
    }
}

impl std::error::Error for GridError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Database { internal, .. } => Some(internal),
            _ => None,
        }
    }
}

impl From<DbErr> for GridError {
    fn from(err: DbErr) -> Self {
        Self::database(err)
    }
}
