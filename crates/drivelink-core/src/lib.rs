//! # drivelink-core: Pure Business Logic for the DriveLink Client
//!
//! This crate is the **heart** of the DriveLink client layer. It contains all
//! business logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     DriveLink Client Architecture                       │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   Screens (React Native)                        │   │
//! │  │    Login ──► Dashboards ──► Cars ──► Finance ──► Assignments   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 drivelink-client (stores + services)            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ drivelink-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   role    │  │ validation│  │   │
//! │  │   │    Car    │  │   Money   │  │   Role    │  │   rules   │  │   │
//! │  │   │  Revenue  │  │ ProfitLoss│  │ hierarchy │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO GATEWAY • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Car, CarRevenue, CarExpense, Profile, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`role`] - Role enum, permission hierarchy, dashboard routing
//! - [`error`] - Domain error types
//! - [`validation`] - Centralized input validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Gateway, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod role;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use drivelink_core::Money` instead of
// `use drivelink_core::money::Money`

pub use error::{CoreError, ValidationError};
pub use money::{Money, ProfitLoss};
pub use role::Role;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum entries kept in the recent revenue/expense feeds.
///
/// ## Business Reason
/// Dashboards show a short "latest activity" strip; anything beyond ten
/// entries is fetched on demand instead of cached.
pub const RECENT_FEED_LIMIT: usize = 10;

/// Minimum password length accepted at registration and login forms.
pub const MIN_PASSWORD_LEN: usize = 6;
