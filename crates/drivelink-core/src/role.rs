//! # Role Module
//!
//! The role enum, the permission hierarchy, and role-gated navigation.
//!
//! ## Permission Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Role Hierarchy                                     │
//! │                                                                         │
//! │   admin (4) ──► owner (3) ──► manager (2) ──► driver (1)               │
//! │                                                                         │
//! │   has_permission(user, required) ⇔ rank(user) >= rank(required)        │
//! │                                                                         │
//! │   guest / unknown / missing role → always denied                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every check is a pure function over a `Role` value; no store or gateway
//! access happens here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreError;

// =============================================================================
// Role
// =============================================================================

/// A user's role, bound 1:1 to a user id at registration.
///
/// Roles are immutable after registration; there is no role-change operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Manager,
    Driver,
    Admin,
    /// Fallback for a signed-out or unknown user. Never stored remotely.
    Guest,
}

impl Role {
    /// The wire/storage form of the role.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Manager => "manager",
            Role::Driver => "driver",
            Role::Admin => "admin",
            Role::Guest => "guest",
        }
    }

    /// Rank in the permission hierarchy.
    ///
    /// `None` means the role never grants permissions (guest).
    pub const fn rank(&self) -> Option<u8> {
        match self {
            Role::Admin => Some(4),
            Role::Owner => Some(3),
            Role::Manager => Some(2),
            Role::Driver => Some(1),
            Role::Guest => None,
        }
    }

    /// Display label used across the screens.
    pub const fn display_name(&self) -> &'static str {
        match self {
            Role::Owner => "Car Owner",
            Role::Manager => "Fleet Manager",
            Role::Driver => "Driver",
            Role::Admin => "Administrator",
            Role::Guest => "Guest",
        }
    }

    /// Whether this role may be chosen at registration.
    ///
    /// Admin accounts are provisioned out of band; guest is a client-side
    /// fallback only.
    pub const fn is_registerable(&self) -> bool {
        matches!(self, Role::Owner | Role::Manager | Role::Driver)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Role::Owner),
            "manager" => Ok(Role::Manager),
            "driver" => Ok(Role::Driver),
            "admin" => Ok(Role::Admin),
            "guest" => Ok(Role::Guest),
            other => Err(CoreError::UnknownRole(other.to_string())),
        }
    }
}

// =============================================================================
// Permission Checks
// =============================================================================

/// Checks whether `role` is exactly one of the `required` roles.
///
/// ## Example
/// ```rust
/// use drivelink_core::role::{has_role, Role};
///
/// assert!(has_role(Some(Role::Manager), &[Role::Owner, Role::Manager]));
/// assert!(!has_role(None, &[Role::Owner]));
/// ```
pub fn has_role(role: Option<Role>, required: &[Role]) -> bool {
    match role {
        Some(role) => required.contains(&role),
        None => false,
    }
}

/// Checks whether `role` meets or exceeds the `required` permission level.
///
/// Total order: admin > owner > manager > driver. A missing role, guest, or
/// a required level without a rank is always denied.
pub fn has_permission(role: Option<Role>, required: Role) -> bool {
    match (role.and_then(|r| r.rank()), required.rank()) {
        (Some(have), Some(need)) => have >= need,
        _ => false,
    }
}

// =============================================================================
// Role-Gated Navigation
// =============================================================================

/// Maps a role to the dashboard route the screens should land on.
///
/// Admin uses the owner dashboard; everything else falls back to login.
/// Screens call this after every login/registration to route into the
/// correct role-scoped area.
pub fn dashboard_path(role: Option<Role>) -> &'static str {
    match role {
        Some(Role::Owner) => "/(owner)/dashboard",
        Some(Role::Manager) => "/(manager)/dashboard",
        Some(Role::Driver) => "/(driver)/dashboard",
        Some(Role::Admin) => "/(owner)/dashboard",
        Some(Role::Guest) | None => "/(auth)/login",
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [Role::Owner, Role::Manager, Role::Driver, Role::Admin, Role::Guest] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn test_permission_total_order() {
        let ranked = [Role::Driver, Role::Manager, Role::Owner, Role::Admin];

        for r1 in ranked {
            for r2 in ranked {
                let expected = r1.rank().unwrap() >= r2.rank().unwrap();
                assert_eq!(
                    has_permission(Some(r1), r2),
                    expected,
                    "has_permission({r1}, {r2})"
                );
            }
        }
    }

    #[test]
    fn test_permission_denied_without_role() {
        for required in [Role::Driver, Role::Manager, Role::Owner, Role::Admin] {
            assert!(!has_permission(None, required));
            assert!(!has_permission(Some(Role::Guest), required));
        }
    }

    #[test]
    fn test_has_role_membership() {
        assert!(has_role(Some(Role::Driver), &[Role::Driver]));
        assert!(has_role(Some(Role::Owner), &[Role::Manager, Role::Owner]));
        assert!(!has_role(Some(Role::Driver), &[Role::Manager, Role::Owner]));
        assert!(!has_role(None, &[Role::Driver]));
    }

    #[test]
    fn test_dashboard_paths() {
        assert_eq!(dashboard_path(Some(Role::Owner)), "/(owner)/dashboard");
        assert_eq!(dashboard_path(Some(Role::Manager)), "/(manager)/dashboard");
        assert_eq!(dashboard_path(Some(Role::Driver)), "/(driver)/dashboard");
        // Admin uses the owner dashboard
        assert_eq!(dashboard_path(Some(Role::Admin)), "/(owner)/dashboard");
        assert_eq!(dashboard_path(Some(Role::Guest)), "/(auth)/login");
        assert_eq!(dashboard_path(None), "/(auth)/login");
    }

    #[test]
    fn test_display_names() {
        assert_eq!(Role::Owner.display_name(), "Car Owner");
        assert_eq!(Role::Manager.display_name(), "Fleet Manager");
        assert_eq!(Role::Driver.display_name(), "Driver");
        assert_eq!(Role::Admin.display_name(), "Administrator");
    }

    #[test]
    fn test_registerable_roles() {
        assert!(Role::Owner.is_registerable());
        assert!(Role::Manager.is_registerable());
        assert!(Role::Driver.is_registerable());
        assert!(!Role::Admin.is_registerable());
        assert!(!Role::Guest.is_registerable());
    }
}
