//! # Store Modules
//!
//! One store per entity: an in-memory cache of remote state plus the shared
//! `is_loading`/`error` pair, persisted (whitelisted fields only) to
//! on-device storage.
//!
//! ## The Action Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Every Mutating Store Action                            │
//! │                                                                         │
//! │  1. is_loading = true, error = None   (stale errors never linger)      │
//! │  2. call the service (1-2 gateway round trips)                         │
//! │  3a. success: merge the result into every collection that logically    │
//! │      contains it, persist the snapshot, is_loading = false             │
//! │  3b. failure: is_loading = false, error = message, return the error    │
//! │      so the calling screen can alert immediately                       │
//! │                                                                         │
//! │  Prior cache state is untouched by a failed action.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Thread Safety
//! State lives behind `std::sync::Mutex` with short critical sections; a
//! lock is never held across an `.await`. The store is the sole mutator of
//! its own cache. Cross-store consistency is NOT maintained: deleting a car
//! does not touch cached revenue rows that reference it.
//!
//! ## Lifecycle
//! Stores are plain context-owned values: `new` → `hydrate` → actions →
//! `dispose`. No ambient singletons.

pub mod auth;
pub mod car;
pub mod expense;
pub mod revenue;
pub mod user;

pub use auth::{AuthState, AuthStore};
pub use car::{CarState, CarStore};
pub use expense::{ExpenseState, ExpenseStore};
pub use revenue::{RevenueState, RevenueStore};
pub use user::{UserState, UserStore};
