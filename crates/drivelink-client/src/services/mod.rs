//! # Service Modules
//!
//! Stateless translators between stores and the remote gateway: one module
//! per entity. Each service method issues one or two gateway round trips
//! (two when an indirect foreign key such as owner → owner record needs
//! resolving) and reshapes the JSON rows into domain records.
//!
//! Services hold no cache and no flags; that is the stores' job.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ClientError, ClientResult};

pub mod auth;
pub mod car;
pub mod expense;
pub mod revenue;
pub mod user;

pub use auth::{AuthResponse, AuthService, LoginCredentials, ProfilePatch, Registration};
pub use car::{CarPatch, CarService, NewCar};
pub use expense::{ExpenseService, ExpensePatch, NewExpense};
pub use revenue::{NewRevenue, RevenuePatch, RevenueService};
pub use user::UserService;

// =============================================================================
// Table Names
// =============================================================================
// The remote schema, as this client sees it.

pub(crate) mod tables {
    pub const PROFILES: &str = "profiles";
    pub const ROLES: &str = "roles";
    pub const OWNERS: &str = "owners";
    pub const MANAGERS: &str = "managers";
    pub const DRIVERS: &str = "drivers";
    pub const CARS: &str = "cars";
    pub const CAR_REVENUE: &str = "car_revenue";
    pub const CAR_EXPENSE: &str = "car_expense";
    pub const CAR_DRIVER: &str = "car_driver";
    pub const CAR_MANAGER: &str = "car_manager";
}

// =============================================================================
// Row Decoding
// =============================================================================

/// Decodes one gateway row into a domain record.
pub(crate) fn decode<T: DeserializeOwned>(row: Value) -> ClientResult<T> {
    serde_json::from_value(row).map_err(|err| ClientError::Query(format!("Malformed row: {}", err)))
}

/// Decodes a row set into domain records.
pub(crate) fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> ClientResult<Vec<T>> {
    rows.into_iter().map(decode).collect()
}

/// Sums the `amount_cents` column of a ledger row set.
///
/// Aggregation happens client-side over the fetched column, mirroring how
/// the dashboards total their ledgers.
pub(crate) fn sum_amounts(rows: &[Value]) -> i64 {
    rows.iter()
        .filter_map(|row| row.get("amount_cents").and_then(Value::as_i64))
        .sum()
}
