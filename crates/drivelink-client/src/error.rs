//! # Client Error Type
//!
//! Unified error type for everything screens call.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in DriveLink                              │
//! │                                                                         │
//! │  Screen                       Client Layer                              │
//! │  ──────                       ────────────                              │
//! │                                                                         │
//! │  store.create_car(...)                                                  │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Store Action                                                    │  │
//! │  │  Result<T, ClientError>                                          │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Gateway error? ── GatewayError::QueryFailed ──┐                │  │
//! │  │         │                                       ▼                │  │
//! │  │  Validation?    ── ValidationError ───────── ClientError ──────►│  │
//! │  │         │          (recorded in store.error AND returned)       │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  The screen shows its own alert from the returned error; the store's   │
//! │  `error` field is a secondary channel for passive banners.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The taxonomy is by origin: auth, query, validation. Nothing is retried;
//! no failure is fatal to the process.

use drivelink_core::ValidationError;
use drivelink_gateway::GatewayError;
use thiserror::Error;

/// Error type returned by services and stores.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Sign-in/sign-up/sign-out rejected, or a session-requiring call ran
    /// without one.
    #[error("{0}")]
    Auth(String),

    /// Any remote row operation failing: network, constraint violation,
    /// not-found on single-row lookups.
    #[error("{0}")]
    Query(String),

    /// Client-side validation rejected the input before any round trip.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A profile-requiring action ran with no cached profile.
    #[error("No user profile found")]
    NoProfile,
}

impl From<GatewayError> for ClientError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::AuthFailed(message) => ClientError::Auth(message),
            GatewayError::NotAuthenticated => ClientError::Auth("Not signed in".to_string()),
            other => ClientError::Query(other.to_string()),
        }
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
