//! # Gateway Error Types
//!
//! Error types for remote data gateway operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  Wire error (reqwest::Error / HTTP status)                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  GatewayError (this module) ← Adds origin and categorization           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ClientError (in drivelink-client) ← auth/query taxonomy for screens   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Screen displays user-friendly alert                                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Remote data gateway errors.
///
/// These wrap wire-level failures and give the client layer enough shape to
/// sort them into its auth/query taxonomy.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Sign-in/sign-up/refresh rejected by the auth subsystem.
    ///
    /// ## When This Occurs
    /// - Invalid credentials
    /// - Duplicate registration email
    /// - Refresh token revoked
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// An operation that needs a session ran without one.
    #[error("Not signed in")]
    NotAuthenticated,

    /// A single-row lookup matched nothing.
    ///
    /// ## When This Occurs
    /// - `select_single` over an id that does not exist
    /// - Role/profile row missing after identity creation (data-integrity gap)
    #[error("No rows found in {table}")]
    NotFound { table: String },

    /// The request never produced a response (network failure, DNS, TLS).
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// The backend answered with a non-success status.
    ///
    /// ## When This Occurs
    /// - Constraint violation
    /// - Row-level security rejection
    /// - Malformed filter
    #[error("Query failed ({status}): {message}")]
    QueryFailed { status: u16, message: String },

    /// The response body could not be understood.
    #[error("Invalid response payload: {0}")]
    InvalidPayload(String),

    /// The gateway endpoint configuration is unusable.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::RequestFailed(err.to_string())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::InvalidPayload(err.to_string())
    }
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = GatewayError::NotFound {
            table: "profiles".to_string(),
        };
        assert_eq!(err.to_string(), "No rows found in profiles");

        let err = GatewayError::QueryFailed {
            status: 409,
            message: "duplicate key value".to_string(),
        };
        assert_eq!(err.to_string(), "Query failed (409): duplicate key value");
    }
}
