//! # drivelink-client: The Layer Screens Talk To
//!
//! Services, stores, snapshot persistence, and the session accessor for the
//! DriveLink mobile app.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     DriveLink Client Data Flow                          │
//! │                                                                         │
//! │  Screen invokes a store action                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 drivelink-client (THIS CRATE)                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │    stores     │    │   services    │    │   storage    │  │   │
//! │  │   │ cache + flags │───►│  stateless    │    │  versioned   │  │   │
//! │  │   │ auth car rev  │    │  translators  │    │  snapshots   │  │   │
//! │  │   │ expense user  │    │               │    │              │  │   │
//! │  │   └───────┬───────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │           │                    │                               │   │
//! │  │           └── session accessor │                               │   │
//! │  └────────────────────────────────┼───────────────────────────────┘   │
//! │                                   ▼                                    │
//! │                      drivelink-gateway (remote rows + auth)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`services`] - Stateless gateway translators, one per entity
//! - [`store`] - Entity stores: cache, loading/error flags, persistence
//! - [`storage`] - On-device key-value snapshots (versioned envelopes)
//! - [`session`] - Role/permission accessor over the cached identity
//! - [`error`] - The auth/query/validation error taxonomy
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use drivelink_client::{ClientContext, FileStorage};
//! use drivelink_gateway::RestGateway;
//!
//! let gateway = Arc::new(RestGateway::from_env()?);
//! let storage = Arc::new(FileStorage::new(app_data_dir)?);
//!
//! let context = ClientContext::new(gateway, storage);
//! context.hydrate();            // restore persisted snapshots
//! context.initialize().await;   // confirm the session against the gateway
//!
//! let path = context.auth.session_view().dashboard_path();
//! ```

use std::sync::Arc;

use drivelink_gateway::Gateway;

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod services;
pub mod session;
pub mod storage;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{ClientError, ClientResult};
pub use services::{
    AuthResponse, AuthService, CarPatch, CarService, ExpensePatch, ExpenseService,
    LoginCredentials, NewCar, NewExpense, NewRevenue, ProfilePatch, Registration, RevenuePatch,
    RevenueService, UserService,
};
pub use session::SessionView;
pub use storage::{FileStorage, KvStorage, MemoryStorage};
pub use store::{
    AuthState, AuthStore, CarState, CarStore, ExpenseState, ExpenseStore, RevenueState,
    RevenueStore, UserState, UserStore,
};

// =============================================================================
// Client Context
// =============================================================================

/// One instance of every store over a shared gateway and storage handle.
///
/// ## Lifecycle
/// ```text
/// new() ──► hydrate() ──► initialize().await ──► actions ──► dispose()
/// (create)  (disk)        (gateway cold start)               (persist+clear)
/// ```
///
/// The context is a plain value the UI layer owns and injects; there are no
/// process-wide singletons, so tests can run as many isolated contexts as
/// they like.
pub struct ClientContext {
    pub auth: AuthStore,
    pub cars: CarStore,
    pub revenues: RevenueStore,
    pub expenses: ExpenseStore,
    pub users: UserStore,
}

impl ClientContext {
    /// Creates every store over the shared gateway and storage.
    pub fn new(gateway: Arc<dyn Gateway>, storage: Arc<dyn KvStorage>) -> Self {
        ClientContext {
            auth: AuthStore::new(gateway.clone(), storage.clone()),
            cars: CarStore::new(gateway.clone(), storage.clone()),
            revenues: RevenueStore::new(gateway.clone(), storage.clone()),
            expenses: ExpenseStore::new(gateway.clone(), storage.clone()),
            users: UserStore::new(gateway, storage),
        }
    }

    /// Restores every persisted snapshot, synchronously, before first render.
    pub fn hydrate(&self) {
        self.auth.hydrate();
        self.cars.hydrate();
        self.revenues.hydrate();
        self.expenses.hydrate();
        self.users.hydrate();
    }

    /// Cold-start auth restore; fails open to guest, never errors.
    pub async fn initialize(&self) {
        self.auth.initialize().await;
    }

    /// Persists current snapshots and clears all in-memory state.
    pub fn dispose(&self) {
        self.auth.dispose();
        self.cars.dispose();
        self.revenues.dispose();
        self.expenses.dispose();
        self.users.dispose();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
