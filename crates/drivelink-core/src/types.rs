//! # Domain Types
//!
//! Core domain types used throughout the DriveLink client.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Car        │   │   CarRevenue    │   │   CarExpense    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  plate_no       │   │  car_id (FK)    │   │  car_id (FK)    │       │
//! │  │  status         │   │  amount_cents   │   │  amount_cents   │       │
//! │  │  owner_id (FK)  │   │  source         │   │  category       │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Profile      │   │ Owner/Manager/  │   │ Driver/Manager  │       │
//! │  │  (one per user) │   │ Driver records  │   │  Assignments    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Cars carry both an immutable UUID (`id`, used for relations) and business
//! identifiers (`plate_no`, `libre_no`) shown to people.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::role::Role;

// =============================================================================
// Car Status
// =============================================================================

/// The operational status of a car.
///
/// Status transitions are free-form: any status may follow any other.
/// There is no enforced state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum CarStatus {
    /// Ready for assignment, not currently driven.
    Available,
    /// On the road with an assigned driver.
    Active,
    /// In the shop.
    Maintenance,
    /// Parked indefinitely (not deleted).
    Inactive,
}

impl CarStatus {
    /// All statuses, in display order.
    pub const ALL: [CarStatus; 4] = [
        CarStatus::Available,
        CarStatus::Active,
        CarStatus::Maintenance,
        CarStatus::Inactive,
    ];

    /// The wire/storage form of the status.
    pub const fn as_str(&self) -> &'static str {
        match self {
            CarStatus::Available => "available",
            CarStatus::Active => "active",
            CarStatus::Maintenance => "maintenance",
            CarStatus::Inactive => "inactive",
        }
    }
}

// =============================================================================
// Car
// =============================================================================

/// A fleet vehicle.
///
/// Owned by exactly one Owner record (via `owner_id`). Hard-deleted by an
/// explicit owner action; nothing cascades into the revenue/expense ledgers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Car {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// License plate - business identifier.
    pub plate_no: String,

    /// Libre (ownership booklet) or VIN number.
    pub libre_no: String,

    /// Owner record this car belongs to (NOT the owner's user id).
    pub owner_id: String,

    pub model: Option<String>,

    pub year: Option<i32>,

    pub color: Option<String>,

    pub fuel_type: Option<String>,

    /// Operational status; transitions freely.
    pub status: CarStatus,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Revenue Ledger
// =============================================================================

/// Where a revenue entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum RevenueSource {
    Ride,
    Delivery,
    Other,
}

/// One revenue entry for a car. Append-mostly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CarRevenue {
    pub id: String,
    pub car_id: String,
    /// Amount in cents (smallest currency unit).
    pub amount_cents: i64,
    pub source: RevenueSource,
    /// The day the money was earned (not when it was logged).
    #[ts(as = "String")]
    pub revenue_date: NaiveDate,
    pub notes: Option<String>,
    /// Trip reference, when the entry came from a recorded trip.
    pub trip_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    /// User id of whoever logged the entry.
    pub created_by: String,
}

impl CarRevenue {
    /// Returns the amount as a Money type.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Expense Ledger
// =============================================================================

/// What an expense entry paid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseCategory {
    Fuel,
    Maintenance,
    Insurance,
    Repair,
    Other,
}

/// One expense entry for a car. Append-mostly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CarExpense {
    pub id: String,
    pub car_id: String,
    /// Amount in cents (smallest currency unit).
    pub amount_cents: i64,
    pub category: ExpenseCategory,
    /// The day the cost was incurred.
    #[ts(as = "String")]
    pub expense_date: NaiveDate,
    pub description: Option<String>,
    /// Link to a receipt photo, when one was attached.
    pub receipt_url: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    /// User id of whoever logged the entry.
    pub created_by: String,
}

impl CarExpense {
    /// Returns the amount as a Money type.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Profile
// =============================================================================

/// A user's profile row. One per user; `id` equals the auth user id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub phone_number: Option<String>,
    /// Avatar image URL.
    pub avatar: Option<String>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A profile joined with its role, as screens list users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UserAccount {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub phone_number: Option<String>,
    pub avatar: Option<String>,
    pub role: Role,
}

impl UserAccount {
    /// Joins a profile with its role row.
    pub fn from_profile(profile: Profile, role: Role) -> Self {
        UserAccount {
            id: profile.id,
            email: profile.email,
            full_name: profile.full_name,
            phone_number: profile.phone_number,
            avatar: profile.avatar,
            role,
        }
    }
}

// =============================================================================
// Role Records
// =============================================================================
// Thin join rows linking a profile to a role-specific table. Assignments and
// car ownership point at these records, not at the user id directly.

/// Owner join row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OwnerRecord {
    pub id: String,
    pub user_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Manager join row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ManagerRecord {
    pub id: String,
    pub user_id: String,
    /// Last reported position, "lat,lng".
    pub geolocation: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Driver join row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DriverRecord {
    pub id: String,
    pub user_id: String,
    /// Last reported position, "lat,lng".
    pub geolocation: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Assignments
// =============================================================================

/// A time-bounded link between a car and a driver record.
///
/// ## Invariant
/// At most one *active* (unassigned_at = null) driver assignment exists per
/// car. Assigning a new driver closes the previous assignment by timestamp;
/// rows are never deleted, so the table doubles as assignment history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DriverAssignment {
    pub id: String,
    pub car_id: String,
    /// Driver record id (not the driver's user id).
    pub driver_id: String,
    #[ts(as = "String")]
    pub assigned_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub unassigned_at: Option<DateTime<Utc>>,
}

impl DriverAssignment {
    /// An assignment is active until it is closed with a timestamp.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.unassigned_at.is_none()
    }
}

/// A link between a car and a manager record.
///
/// Unlike drivers, a car may have several managers at once; manager
/// assignments are never closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ManagerAssignment {
    pub id: String,
    pub car_id: String,
    /// Manager record id (not the manager's user id).
    pub manager_id: String,
    #[ts(as = "String")]
    pub assigned_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
