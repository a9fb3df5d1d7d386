//! # Session Accessor
//!
//! A read-only view over the auth store's cached identity, answering the
//! questions every screen asks: am I signed in, what may I do, where do I
//! land after login.
//!
//! All checks delegate to the pure role functions in the core crate; this
//! type only supplies the cached role.

use drivelink_core::role::{self, Role};
use drivelink_core::Profile;
use drivelink_gateway::{AuthUser, Session};

/// Snapshot of the signed-in identity, taken from the auth store.
#[derive(Debug, Clone, Default)]
pub struct SessionView {
    pub user: Option<AuthUser>,
    pub session: Option<Session>,
    pub profile: Option<Profile>,
    pub role: Option<Role>,
}

impl SessionView {
    /// Signed in means both an identity and a session are cached.
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.session.is_some()
    }

    /// The effective role; guests have none.
    pub fn role(&self) -> Option<Role> {
        self.role
    }

    /// Exact-match role check (membership when several are allowed).
    pub fn has_role(&self, required: &[Role]) -> bool {
        role::has_role(self.role, required)
    }

    /// Hierarchy check: admin > owner > manager > driver.
    pub fn has_permission(&self, required: Role) -> bool {
        role::has_permission(self.role, required)
    }

    /// Where the screens should route after login/registration.
    pub fn dashboard_path(&self) -> &'static str {
        role::dashboard_path(self.role)
    }

    /// The cached profile's display name, when present.
    pub fn display_name(&self) -> Option<&str> {
        self.profile.as_ref().map(|p| p.full_name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn signed_in(role: Role) -> SessionView {
        SessionView {
            user: Some(AuthUser {
                id: "u1".to_string(),
                email: "m@x.com".to_string(),
            }),
            session: Some(Session {
                user_id: "u1".to_string(),
                access_token: "tok".to_string(),
                refresh_token: None,
                expires_at: Utc::now() + Duration::hours(1),
            }),
            profile: None,
            role: Some(role),
        }
    }

    #[test]
    fn test_authentication_needs_user_and_session() {
        assert!(signed_in(Role::Driver).is_authenticated());

        let mut missing_session = signed_in(Role::Driver);
        missing_session.session = None;
        assert!(!missing_session.is_authenticated());

        assert!(!SessionView::default().is_authenticated());
    }

    #[test]
    fn test_permission_checks_delegate_to_hierarchy() {
        let owner = signed_in(Role::Owner);
        assert!(owner.has_permission(Role::Manager));
        assert!(owner.has_permission(Role::Owner));
        assert!(!owner.has_permission(Role::Admin));

        assert!(!SessionView::default().has_permission(Role::Driver));
    }

    #[test]
    fn test_dashboard_routing() {
        assert_eq!(signed_in(Role::Owner).dashboard_path(), "/(owner)/dashboard");
        assert_eq!(SessionView::default().dashboard_path(), "/(auth)/login");
    }
}
