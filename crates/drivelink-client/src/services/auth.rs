//! # Auth Service
//!
//! Sign-in, registration, and profile maintenance against the gateway.
//!
//! ## Login Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         login()                                         │
//! │                                                                         │
//! │  gateway.sign_in(email, password)                                      │
//! │       │ ok                                                              │
//! │       ▼                                                                 │
//! │  fetch profile row (id = user id)                                      │
//! │       │ ok                                                              │
//! │       ▼                                                                 │
//! │  fetch role row (user_id = user id)                                    │
//! │       │ ok                                                              │
//! │       ▼                                                                 │
//! │  AuthResponse { user, session, profile, role }                         │
//! │                                                                         │
//! │  ANY sub-failure aborts the whole operation: the caller never sees     │
//! │  a partial session.                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Registration Flow
//! Four sequential writes (identity → profile → role → join row). The
//! remote store offers no cross-table transaction, so a failure partway
//! triggers best-effort compensating deletes of the rows already written;
//! the auth identity itself cannot be removed with client credentials and
//! is logged for out-of-band cleanup.

use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use drivelink_core::{validation, Profile, Role};
use drivelink_gateway::{AuthUser, Filter, Gateway, Session};

use crate::error::{ClientError, ClientResult};
use crate::services::{decode, tables};

// =============================================================================
// Inputs & Outputs
// =============================================================================

/// Credentials for [`AuthService::login`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

/// Input for [`AuthService::register`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone_number: Option<String>,
    pub role: Role,
}

/// What a successful login/registration/restore hands to the auth store.
#[derive(Debug, Clone)]
pub struct AuthResponse {
    pub user: AuthUser,
    /// Absent on cold-start restore; the gateway still holds the live token.
    pub session: Option<Session>,
    pub profile: Profile,
    pub role: Role,
}

/// Fields that [`AuthService::update_profile`] may change.
///
/// `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfilePatch {
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub avatar: Option<String>,
}

// =============================================================================
// Auth Service
// =============================================================================

/// Stateless auth operations over the gateway.
#[derive(Clone)]
pub struct AuthService {
    gateway: Arc<dyn Gateway>,
}

impl AuthService {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        AuthService { gateway }
    }

    /// Signs in and assembles the full auth response.
    ///
    /// Fails as a whole if sign-in, the profile fetch, or the role fetch
    /// fails; no partial session survives.
    pub async fn login(&self, credentials: &LoginCredentials) -> ClientResult<AuthResponse> {
        debug!(email = %credentials.email, "login");

        let signin = self
            .gateway
            .sign_in(&credentials.email, &credentials.password)
            .await?;

        let profile = self.fetch_profile(&signin.user.id).await?;
        let role = self.fetch_role(&signin.user.id).await?;

        Ok(AuthResponse {
            user: signin.user,
            session: Some(signin.session),
            profile,
            role,
        })
    }

    /// Creates the identity, profile row, role row, and role join row.
    pub async fn register(&self, data: &Registration) -> ClientResult<AuthResponse> {
        validation::validate_email(&data.email)?;
        validation::validate_password(&data.password)?;
        validation::validate_full_name(&data.full_name)?;
        validation::validate_registration_role(data.role)?;

        debug!(email = %data.email, role = %data.role, "register");

        let signin = self
            .gateway
            .sign_up(
                &data.email,
                &data.password,
                json!({ "full_name": data.full_name }),
            )
            .await?;
        let user_id = signin.user.id.clone();
        let now = Utc::now();

        // Step 2: profile row
        let profile_row = json!({
            "id": user_id,
            "email": data.email,
            "full_name": data.full_name,
            "phone_number": data.phone_number,
            "avatar": null,
            "updated_at": now,
        });
        let profile = match self.gateway.insert(tables::PROFILES, profile_row).await {
            Ok(row) => decode::<Profile>(row)?,
            Err(err) => {
                self.rollback_registration(&user_id, false, false).await;
                return Err(err.into());
            }
        };

        // Step 3: role row
        let role_row = json!({ "user_id": user_id, "role": data.role });
        if let Err(err) = self.gateway.insert(tables::ROLES, role_row).await {
            self.rollback_registration(&user_id, true, false).await;
            return Err(err.into());
        }

        // Step 4: role-specific join row
        let join_table = match data.role {
            Role::Owner => tables::OWNERS,
            Role::Manager => tables::MANAGERS,
            Role::Driver => tables::DRIVERS,
            // Excluded by validate_registration_role above
            Role::Admin | Role::Guest => unreachable!("unregisterable role"),
        };
        let join_row = json!({ "user_id": user_id, "created_at": now });
        if let Err(err) = self.gateway.insert(join_table, join_row).await {
            self.rollback_registration(&user_id, true, true).await;
            return Err(err.into());
        }

        Ok(AuthResponse {
            user: signin.user,
            session: Some(signin.session),
            profile,
            role: data.role,
        })
    }

    /// Destroys the active session.
    pub async fn logout(&self) -> ClientResult<()> {
        self.gateway.sign_out().await?;
        Ok(())
    }

    /// Cold-start restore: the current user with profile and role, or `None`.
    ///
    /// Any failure is reported to the caller, who decides whether to fail
    /// open (the auth store does).
    pub async fn current_user(&self) -> ClientResult<Option<AuthResponse>> {
        let Some(user) = self.gateway.current_user().await? else {
            return Ok(None);
        };

        let profile = self.fetch_profile(&user.id).await?;
        let role = self.fetch_role(&user.id).await?;

        Ok(Some(AuthResponse {
            user,
            session: None,
            profile,
            role,
        }))
    }

    /// Updates the profile row and returns it as stored.
    pub async fn update_profile(&self, user_id: &str, patch: &ProfilePatch) -> ClientResult<Profile> {
        debug!(user_id = %user_id, "update_profile");

        let mut fields = Map::new();
        if let Some(full_name) = &patch.full_name {
            validation::validate_full_name(full_name)?;
            fields.insert("full_name".to_string(), json!(full_name));
        }
        if let Some(phone_number) = &patch.phone_number {
            fields.insert("phone_number".to_string(), json!(phone_number));
        }
        if let Some(avatar) = &patch.avatar {
            fields.insert("avatar".to_string(), json!(avatar));
        }
        fields.insert("updated_at".to_string(), json!(Utc::now()));

        let rows = self
            .gateway
            .update(
                tables::PROFILES,
                Filter::new().eq("id", user_id),
                Value::Object(fields),
            )
            .await?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::Query("Profile update matched no rows".to_string()))?;
        decode(row)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn fetch_profile(&self, user_id: &str) -> ClientResult<Profile> {
        let row = self
            .gateway
            .select_single(tables::PROFILES, Filter::new().eq("id", user_id))
            .await?;
        decode(row)
    }

    async fn fetch_role(&self, user_id: &str) -> ClientResult<Role> {
        let row = self
            .gateway
            .select_single(tables::ROLES, Filter::new().eq("user_id", user_id))
            .await?;
        let role = row
            .get("role")
            .and_then(Value::as_str)
            .ok_or_else(|| ClientError::Query("Role row is missing its role".to_string()))?;
        Role::from_str(role).map_err(|err| ClientError::Query(err.to_string()))
    }

    /// Compensating cleanup for a registration that failed partway.
    ///
    /// Deletes in reverse write order, best-effort. The auth identity stays
    /// behind (no client credential can remove it); the half-established
    /// session is dropped so no partial sign-in lingers.
    async fn rollback_registration(&self, user_id: &str, wrote_profile: bool, wrote_role: bool) {
        warn!(user_id = %user_id, "Registration failed partway, removing written rows");

        if wrote_role {
            if let Err(err) = self
                .gateway
                .delete(tables::ROLES, Filter::new().eq("user_id", user_id))
                .await
            {
                warn!(user_id = %user_id, error = %err, "Could not remove role row");
            }
        }

        if wrote_profile {
            if let Err(err) = self
                .gateway
                .delete(tables::PROFILES, Filter::new().eq("id", user_id))
                .await
            {
                warn!(user_id = %user_id, error = %err, "Could not remove profile row");
            }
        }

        warn!(user_id = %user_id, "Auth identity left behind, needs out-of-band cleanup");
        if let Err(err) = self.gateway.sign_out().await {
            warn!(error = %err, "Could not drop half-established session");
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use drivelink_gateway::MemoryGateway;

    fn service() -> (Arc<MemoryGateway>, AuthService) {
        let gateway = Arc::new(MemoryGateway::new());
        let service = AuthService::new(gateway.clone());
        (gateway, service)
    }

    fn manager_registration() -> Registration {
        Registration {
            email: "m@x.com".to_string(),
            password: "secret1".to_string(),
            full_name: "Meron Tadesse".to_string(),
            phone_number: Some("+251911000000".to_string()),
            role: Role::Manager,
        }
    }

    #[tokio::test]
    async fn test_register_writes_profile_role_and_join_row() {
        let (gateway, service) = service();

        let response = service.register(&manager_registration()).await.unwrap();
        assert_eq!(response.profile.email, "m@x.com");
        assert_eq!(response.role, Role::Manager);
        assert!(response.session.is_some());

        // Profile row carries the registration email
        let profiles = gateway.rows(tables::PROFILES);
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0]["email"], "m@x.com");

        // Role row says manager
        let roles = gateway.rows(tables::ROLES);
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0]["role"], "manager");

        // Join row landed in the managers table
        assert_eq!(gateway.rows(tables::MANAGERS).len(), 1);
        assert!(gateway.rows(tables::DRIVERS).is_empty());
    }

    #[tokio::test]
    async fn test_register_rejects_bad_input_before_any_write() {
        let (gateway, service) = service();

        let mut registration = manager_registration();
        registration.password = "short".to_string();

        let err = service.register(&registration).await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        assert!(gateway.rows(tables::PROFILES).is_empty());
        assert!(gateway.current_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_register_rolls_back_on_role_failure() {
        let (gateway, service) = service();
        gateway.fail_table(tables::ROLES);

        let err = service.register(&manager_registration()).await.unwrap_err();
        assert!(matches!(err, ClientError::Query(_)));

        // The profile write was compensated and the session dropped
        assert!(gateway.rows(tables::PROFILES).is_empty());
        assert!(gateway.current_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_round_trip() {
        let (_gateway, service) = service();
        service.register(&manager_registration()).await.unwrap();
        service.logout().await.unwrap();

        let response = service
            .login(&LoginCredentials {
                email: "m@x.com".to_string(),
                password: "secret1".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(response.profile.full_name, "Meron Tadesse");
        assert_eq!(response.role, Role::Manager);
    }

    #[tokio::test]
    async fn test_login_fails_whole_when_role_fetch_fails() {
        let (gateway, service) = service();
        service.register(&manager_registration()).await.unwrap();

        gateway.fail_table(tables::ROLES);
        let err = service
            .login(&LoginCredentials {
                email: "m@x.com".to_string(),
                password: "secret1".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Query(_)));
    }

    #[tokio::test]
    async fn test_current_user_fetches_profile_and_role() {
        let (_gateway, service) = service();
        service.register(&manager_registration()).await.unwrap();

        let restored = service.current_user().await.unwrap().unwrap();
        assert_eq!(restored.role, Role::Manager);
        assert!(restored.session.is_none());

        service.logout().await.unwrap();
        assert!(service.current_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_profile_replaces_row() {
        let (_gateway, service) = service();
        let created = service.register(&manager_registration()).await.unwrap();

        let updated = service
            .update_profile(
                &created.user.id,
                &ProfilePatch {
                    full_name: Some("Meron T.".to_string()),
                    ..ProfilePatch::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.full_name, "Meron T.");
        assert_eq!(updated.email, "m@x.com");
        assert!(updated.updated_at >= created.profile.updated_at);
    }
}
