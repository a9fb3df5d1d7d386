//! # Auth Store
//!
//! Holds the signed-in user, session, profile, and role; the one store every
//! screen depends on.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Auth Store Lifecycle                               │
//! │                                                                         │
//! │  cold start ──► hydrate() ──► initialize() ──┬─► signed in             │
//! │                 (disk)        (gateway)      └─► guest (fails open)    │
//! │                                                                         │
//! │  login()/register() ──► {user, session, profile, role} set + persisted │
//! │  logout()           ──► everything cleared + persisted                 │
//! │                                                                         │
//! │  A failed login leaves the previous state fully intact: the fields     │
//! │  are only written on success.                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use drivelink_core::{Profile, Role};
use drivelink_gateway::{AuthUser, Gateway, Session};

use crate::error::{ClientError, ClientResult};
use crate::services::auth::{AuthService, LoginCredentials, ProfilePatch, Registration};
use crate::session::SessionView;
use crate::storage::{self, KvStorage, AUTH_NAMESPACE};

// =============================================================================
// State
// =============================================================================

/// The auth store's readable state.
#[derive(Debug, Clone, Default)]
pub struct AuthState {
    pub user: Option<AuthUser>,
    pub session: Option<Session>,
    pub profile: Option<Profile>,
    pub role: Option<Role>,
    pub is_loading: bool,
    pub error: Option<String>,
}

/// The persisted subset: loading/error are transient by design.
#[derive(Serialize, Deserialize)]
struct AuthSnapshot {
    user: Option<AuthUser>,
    session: Option<Session>,
    profile: Option<Profile>,
    role: Option<Role>,
}

// =============================================================================
// Auth Store
// =============================================================================

/// Session and identity cache over the auth service.
pub struct AuthStore {
    service: AuthService,
    storage: Arc<dyn KvStorage>,
    state: Mutex<AuthState>,
}

impl AuthStore {
    /// Creates an empty store. Call [`hydrate`](Self::hydrate) to restore a
    /// persisted session before first use.
    pub fn new(gateway: Arc<dyn Gateway>, storage: Arc<dyn KvStorage>) -> Self {
        AuthStore {
            service: AuthService::new(gateway),
            storage,
            state: Mutex::new(AuthState::default()),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Restores the persisted identity snapshot. Loading/error reset to
    /// their defaults regardless of what was stored.
    pub fn hydrate(&self) {
        if let Some(snapshot) = storage::load_snapshot::<AuthSnapshot>(&*self.storage, AUTH_NAMESPACE)
        {
            self.with_state_mut(|state| {
                state.user = snapshot.user;
                state.session = snapshot.session;
                state.profile = snapshot.profile;
                state.role = snapshot.role;
                state.is_loading = false;
                state.error = None;
            });
        }
    }

    /// Persists the current snapshot and clears in-memory state.
    pub fn dispose(&self) {
        self.persist();
        self.with_state_mut(|state| *state = AuthState::default());
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// A copy of the full state, for screens to render from.
    pub fn state(&self) -> AuthState {
        self.with_state(AuthState::clone)
    }

    /// The role/permission accessor over the cached identity.
    pub fn session_view(&self) -> SessionView {
        self.with_state(|state| SessionView {
            user: state.user.clone(),
            session: state.session.clone(),
            profile: state.profile.clone(),
            role: state.role,
        })
    }

    pub fn is_loading(&self) -> bool {
        self.with_state(|state| state.is_loading)
    }

    pub fn error(&self) -> Option<String> {
        self.with_state(|state| state.error.clone())
    }

    pub fn clear_error(&self) {
        self.with_state_mut(|state| state.error = None);
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Signs in. On failure the previous identity fields are untouched.
    pub async fn login(&self, credentials: &LoginCredentials) -> ClientResult<()> {
        self.begin();

        match self.service.login(credentials).await {
            Ok(response) => {
                self.with_state_mut(|state| {
                    state.user = Some(response.user);
                    state.session = response.session;
                    state.profile = Some(response.profile);
                    state.role = Some(response.role);
                    state.is_loading = false;
                    state.error = None;
                });
                self.persist();
                Ok(())
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Registers and signs in the new account.
    pub async fn register(&self, data: &Registration) -> ClientResult<()> {
        self.begin();

        match self.service.register(data).await {
            Ok(response) => {
                self.with_state_mut(|state| {
                    state.user = Some(response.user);
                    state.session = response.session;
                    state.profile = Some(response.profile);
                    state.role = Some(response.role);
                    state.is_loading = false;
                    state.error = None;
                });
                self.persist();
                Ok(())
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Signs out and clears the cached identity.
    pub async fn logout(&self) -> ClientResult<()> {
        self.begin();

        match self.service.logout().await {
            Ok(()) => {
                self.with_state_mut(|state| *state = AuthState::default());
                self.persist();
                Ok(())
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Cold-start restore. Never fails: an absent user or any fetch failure
    /// resets to the signed-out state (guest).
    pub async fn initialize(&self) {
        self.begin();

        match self.service.current_user().await {
            Ok(Some(response)) => {
                self.with_state_mut(|state| {
                    state.user = Some(response.user);
                    // The persisted session stays: the gateway refreshes its
                    // token transparently, this copy is for is_authenticated
                    state.profile = Some(response.profile);
                    state.role = Some(response.role);
                    state.is_loading = false;
                    state.error = None;
                });
            }
            Ok(None) | Err(_) => {
                self.with_state_mut(|state| *state = AuthState::default());
            }
        }
        self.persist();
    }

    /// Updates the cached profile through the gateway.
    ///
    /// Requires a profile in the cache; the returned row replaces it
    /// wholesale.
    pub async fn update_profile(&self, patch: &ProfilePatch) -> ClientResult<Profile> {
        let user_id = self
            .with_state(|state| state.profile.as_ref().map(|p| p.id.clone()))
            .ok_or(ClientError::NoProfile)?;

        self.begin();

        match self.service.update_profile(&user_id, patch).await {
            Ok(profile) => {
                self.with_state_mut(|state| {
                    state.profile = Some(profile.clone());
                    state.is_loading = false;
                });
                self.persist();
                Ok(profile)
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn with_state<R>(&self, f: impl FnOnce(&AuthState) -> R) -> R {
        let state = self.state.lock().expect("auth state poisoned");
        f(&state)
    }

    fn with_state_mut<R>(&self, f: impl FnOnce(&mut AuthState) -> R) -> R {
        let mut state = self.state.lock().expect("auth state poisoned");
        f(&mut state)
    }

    fn begin(&self) {
        self.with_state_mut(|state| {
            state.is_loading = true;
            state.error = None;
        });
    }

    fn fail(&self, err: &ClientError) {
        self.with_state_mut(|state| {
            state.is_loading = false;
            state.error = Some(err.to_string());
        });
    }

    fn persist(&self) {
        let snapshot = self.with_state(|state| AuthSnapshot {
            user: state.user.clone(),
            session: state.session.clone(),
            profile: state.profile.clone(),
            role: state.role,
        });
        storage::persist_snapshot(&*self.storage, AUTH_NAMESPACE, &snapshot);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use drivelink_core::role::dashboard_path;
    use drivelink_gateway::MemoryGateway;
    use crate::storage::MemoryStorage;

    fn store() -> (Arc<MemoryGateway>, Arc<MemoryStorage>, AuthStore) {
        let gateway = Arc::new(MemoryGateway::new());
        let storage = Arc::new(MemoryStorage::new());
        let store = AuthStore::new(gateway.clone(), storage.clone());
        (gateway, storage, store)
    }

    fn manager_registration() -> Registration {
        Registration {
            email: "m@x.com".to_string(),
            password: "secret1".to_string(),
            full_name: "Meron Tadesse".to_string(),
            phone_number: None,
            role: Role::Manager,
        }
    }

    #[tokio::test]
    async fn test_register_manager_routes_to_manager_dashboard() {
        let (_gateway, _storage, store) = store();

        store.register(&manager_registration()).await.unwrap();

        let state = store.state();
        assert_eq!(state.profile.as_ref().unwrap().email, "m@x.com");
        assert_eq!(state.role, Some(Role::Manager));
        assert!(!state.is_loading);
        assert!(state.error.is_none());

        let view = store.session_view();
        assert!(view.is_authenticated());
        assert_eq!(view.dashboard_path(), "/(manager)/dashboard");
        assert_eq!(view.dashboard_path(), dashboard_path(Some(Role::Manager)));
    }

    #[tokio::test]
    async fn test_failed_login_keeps_previous_state() {
        let (gateway, _storage, store) = store();
        store.register(&manager_registration()).await.unwrap();
        let before = store.state();

        // The role fetch fails mid-login: no partial session may persist
        gateway.fail_table("roles");
        let err = store
            .login(&LoginCredentials {
                email: "m@x.com".to_string(),
                password: "secret1".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Query(_)));

        let after = store.state();
        assert_eq!(after.user, before.user);
        assert_eq!(after.session, before.session);
        assert_eq!(after.profile, before.profile);
        assert_eq!(after.role, before.role);
        assert!(!after.is_loading);
        assert!(after.error.as_deref().is_some_and(|e| !e.is_empty()));
    }

    #[tokio::test]
    async fn test_failed_login_on_empty_store_sets_error_only() {
        let (_gateway, _storage, store) = store();

        let err = store
            .login(&LoginCredentials {
                email: "nobody@x.com".to_string(),
                password: "wrong66".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Auth(_)));

        let state = store.state();
        assert!(state.user.is_none());
        assert!(state.session.is_none());
        assert!(state.error.is_some());
    }

    #[tokio::test]
    async fn test_logout_clears_everything() {
        let (_gateway, _storage, store) = store();
        store.register(&manager_registration()).await.unwrap();

        store.logout().await.unwrap();

        let state = store.state();
        assert!(state.user.is_none());
        assert!(state.session.is_none());
        assert!(state.profile.is_none());
        assert!(state.role.is_none());
        assert!(state.error.is_none());
        assert!(!store.session_view().is_authenticated());
    }

    #[tokio::test]
    async fn test_hydrate_restores_identity_but_not_flags() {
        let (gateway, storage, store) = store();
        store.register(&manager_registration()).await.unwrap();

        // A second store over the same storage, as after an app restart
        let restarted = AuthStore::new(gateway, storage);
        restarted.hydrate();

        let state = restarted.state();
        assert_eq!(state.profile.as_ref().unwrap().email, "m@x.com");
        assert_eq!(state.role, Some(Role::Manager));
        assert!(state.session.is_some());
        assert!(!state.is_loading);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_initialize_fails_open_to_guest() {
        let (gateway, storage, store) = store();
        store.register(&manager_registration()).await.unwrap();

        // Backend signs the session out from under us
        gateway.sign_out().await.unwrap();
        store.initialize().await;

        let state = store.state();
        assert!(state.user.is_none());
        assert!(state.role.is_none());
        assert!(state.error.is_none());
        assert_eq!(store.session_view().dashboard_path(), "/(auth)/login");

        // And the cleared state is what got persisted
        let rehydrated = AuthStore::new(gateway, storage);
        rehydrated.hydrate();
        assert!(rehydrated.state().user.is_none());
    }

    #[tokio::test]
    async fn test_initialize_restores_profile_and_role() {
        let (gateway, storage, store) = store();
        store.register(&manager_registration()).await.unwrap();

        // Fresh process: hydrate from disk, then confirm against the gateway
        let restarted = AuthStore::new(gateway, storage);
        restarted.hydrate();
        restarted.initialize().await;

        let state = restarted.state();
        assert_eq!(state.role, Some(Role::Manager));
        assert!(state.user.is_some());
        // Session copy survives from the hydrated snapshot
        assert!(state.session.is_some());
    }

    #[tokio::test]
    async fn test_update_profile_requires_cached_profile() {
        let (_gateway, _storage, store) = store();

        let err = store
            .update_profile(&ProfilePatch {
                full_name: Some("New Name".to_string()),
                ..ProfilePatch::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NoProfile));
        assert_eq!(err.to_string(), "No user profile found");
    }

    #[tokio::test]
    async fn test_update_profile_replaces_cache_wholesale() {
        let (_gateway, _storage, store) = store();
        store.register(&manager_registration()).await.unwrap();

        let updated = store
            .update_profile(&ProfilePatch {
                full_name: Some("Meron T.".to_string()),
                ..ProfilePatch::default()
            })
            .await
            .unwrap();

        assert_eq!(updated.full_name, "Meron T.");
        assert_eq!(
            store.state().profile.as_ref().unwrap().full_name,
            "Meron T."
        );
    }
}
