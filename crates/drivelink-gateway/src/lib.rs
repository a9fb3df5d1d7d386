//! # drivelink-gateway: Remote Data Gateway for the DriveLink Client
//!
//! This crate provides remote access for the DriveLink client layer. The
//! hosted backend is treated as an opaque capability: authentication plus
//! row-level query/insert/update/delete over JSON rows.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       DriveLink Data Flow                               │
//! │                                                                         │
//! │  Store action (create_car)                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 drivelink-gateway (THIS CRATE)                  │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │ Gateway trait │    │  RestGateway  │    │MemoryGateway │  │   │
//! │  │   │   (lib.rs)    │    │   (rest.rs)   │    │ (memory.rs)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ auth + rows   │◄───│ reqwest, JWT  │    │ HashMap rows │  │   │
//! │  │   │ over JSON     │    │ bearer headers│    │ fault inject │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Hosted backend (auth subsystem + relational row store)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`auth`] - Session and user payload types
//! - [`config`] - Gateway endpoint configuration
//! - [`error`] - Gateway error types
//! - [`filter`] - Row filter builder (eq / gte / lte / in / is-null)
//! - [`rest`] - HTTP adapter for the hosted backend
//! - [`memory`] - In-memory backend for tests and local development
//!
//! ## Usage
//!
//! ```rust,ignore
//! use drivelink_gateway::{Filter, Gateway, RestGateway};
//!
//! let gateway = RestGateway::from_env()?;
//! let signin = gateway.sign_in("m@x.com", "secret1").await?;
//! let rows = gateway
//!     .select("cars", Filter::new().eq("status", "available"))
//!     .await?;
//! ```

use async_trait::async_trait;
use serde_json::Value;

// =============================================================================
// Module Declarations
// =============================================================================

pub mod auth;
pub mod config;
pub mod error;
pub mod filter;
pub mod memory;
pub mod rest;

// =============================================================================
// Re-exports
// =============================================================================

pub use auth::{AuthUser, Session, SignIn};
pub use config::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
pub use filter::Filter;
pub use memory::MemoryGateway;
pub use rest::RestGateway;

// =============================================================================
// The Gateway Trait
// =============================================================================

/// The remote backend capability consumed by services.
///
/// ## Contract
/// - Every call is asynchronous and may fail; there is **no retry contract**.
///   Callers handle each failure explicitly.
/// - Rows travel as `serde_json::Value`; services own (de)serialization into
///   domain types.
/// - Session refresh happens inside the implementation; callers never see
///   token churn.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Signs in with email + password, establishing the active session.
    async fn sign_in(&self, email: &str, password: &str) -> GatewayResult<SignIn>;

    /// Creates a new auth identity and signs it in.
    ///
    /// `metadata` is attached to the identity (e.g. full name) and is not
    /// the same as the profile row, which callers insert separately.
    async fn sign_up(&self, email: &str, password: &str, metadata: Value) -> GatewayResult<SignIn>;

    /// Destroys the active session.
    async fn sign_out(&self) -> GatewayResult<()>;

    /// Returns the currently signed-in user, if any.
    async fn current_user(&self) -> GatewayResult<Option<AuthUser>>;

    /// Fetches all rows of `table` matching `filter`.
    async fn select(&self, table: &str, filter: Filter) -> GatewayResult<Vec<Value>>;

    /// Fetches exactly one row; zero rows is an error.
    async fn select_single(&self, table: &str, filter: Filter) -> GatewayResult<Value> {
        let rows = self.select(table, filter.limit(1)).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| GatewayError::NotFound {
                table: table.to_string(),
            })
    }

    /// Inserts one row and returns it as stored (id filled in).
    async fn insert(&self, table: &str, row: Value) -> GatewayResult<Value>;

    /// Applies `patch` to every row matching `filter`; returns updated rows.
    async fn update(&self, table: &str, filter: Filter, patch: Value) -> GatewayResult<Vec<Value>>;

    /// Deletes every row matching `filter`.
    async fn delete(&self, table: &str, filter: Filter) -> GatewayResult<()>;
}
