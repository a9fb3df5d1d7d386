//! # User Store
//!
//! Directory cache: users grouped by role, the role join-row lists, and the
//! current selection. Dashboards use it for assignment pickers ("choose a
//! driver") and the people screens.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use drivelink_core::{Car, DriverAssignment, DriverRecord, ManagerAssignment, ManagerRecord,
    OwnerRecord, Role, UserAccount};
use drivelink_gateway::Gateway;

use crate::error::{ClientError, ClientResult};
use crate::services::user::UserService;
use crate::storage::{self, KvStorage, USER_NAMESPACE};

// =============================================================================
// State
// =============================================================================

/// The user store's readable state.
#[derive(Debug, Clone, Default)]
pub struct UserState {
    /// Every user fetched by [`UserStore::get_all_users`] (all role groups).
    pub users: Vec<UserAccount>,
    pub drivers: Vec<DriverRecord>,
    pub managers: Vec<ManagerRecord>,
    pub owners: Vec<OwnerRecord>,
    pub selected_user: Option<UserAccount>,
    pub is_loading: bool,
    pub error: Option<String>,
}

/// The persisted subset: loading/error are transient by design.
#[derive(Serialize, Deserialize)]
struct UserSnapshot {
    users: Vec<UserAccount>,
    drivers: Vec<DriverRecord>,
    managers: Vec<ManagerRecord>,
    owners: Vec<OwnerRecord>,
    selected_user: Option<UserAccount>,
}

// =============================================================================
// User Store
// =============================================================================

/// Directory cache over the user service.
pub struct UserStore {
    service: UserService,
    storage: Arc<dyn KvStorage>,
    state: Mutex<UserState>,
}

impl UserStore {
    pub fn new(gateway: Arc<dyn Gateway>, storage: Arc<dyn KvStorage>) -> Self {
        UserStore {
            service: UserService::new(gateway),
            storage,
            state: Mutex::new(UserState::default()),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Restores the persisted snapshot; flags reset to defaults.
    pub fn hydrate(&self) {
        if let Some(snapshot) =
            storage::load_snapshot::<UserSnapshot>(&*self.storage, USER_NAMESPACE)
        {
            self.with_state_mut(|state| {
                state.users = snapshot.users;
                state.drivers = snapshot.drivers;
                state.managers = snapshot.managers;
                state.owners = snapshot.owners;
                state.selected_user = snapshot.selected_user;
                state.is_loading = false;
                state.error = None;
            });
        }
    }

    /// Persists the current snapshot and clears in-memory state.
    pub fn dispose(&self) {
        self.persist();
        self.with_state_mut(|state| *state = UserState::default());
    }

    /// Clears the cache entirely (memory and persisted snapshot).
    pub fn reset(&self) {
        self.with_state_mut(|state| *state = UserState::default());
        self.persist();
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn state(&self) -> UserState {
        self.with_state(UserState::clone)
    }

    pub fn users(&self) -> Vec<UserAccount> {
        self.with_state(|state| state.users.clone())
    }

    pub fn drivers(&self) -> Vec<DriverRecord> {
        self.with_state(|state| state.drivers.clone())
    }

    pub fn managers(&self) -> Vec<ManagerRecord> {
        self.with_state(|state| state.managers.clone())
    }

    pub fn owners(&self) -> Vec<OwnerRecord> {
        self.with_state(|state| state.owners.clone())
    }

    pub fn selected_user(&self) -> Option<UserAccount> {
        self.with_state(|state| state.selected_user.clone())
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

    pub fn set_selected_user(&self, user: Option<UserAccount>) {
        self.with_state_mut(|state| state.selected_user = user);
        self.persist();
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Fetches every registered user: the three role groups concatenated.
    pub async fn get_all_users(&self) -> ClientResult<()> {
        self.begin();

        let drivers = match self.service.get_users_by_role(Role::Driver).await {
            Ok(users) => users,
            Err(err) => {
                self.fail(&err);
                return Err(err);
            }
        };
        let managers = match self.service.get_users_by_role(Role::Manager).await {
            Ok(users) => users,
            Err(err) => {
                self.fail(&err);
                return Err(err);
            }
        };
        let owners = match self.service.get_users_by_role(Role::Owner).await {
            Ok(users) => users,
            Err(err) => {
                self.fail(&err);
                return Err(err);
            }
        };

        self.with_state_mut(|state| {
            state.users = drivers
                .into_iter()
                .chain(managers)
                .chain(owners)
                .collect();
            state.is_loading = false;
        });
        self.persist();
        Ok(())
    }

    /// Refreshes the driver join-row list.
    pub async fn get_drivers(&self) -> ClientResult<()> {
        self.begin();

        match self.service.get_drivers().await {
            Ok(drivers) => {
                self.with_state_mut(|state| {
                    state.drivers = drivers;
                    state.is_loading = false;
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

    /// Refreshes the manager join-row list.
    pub async fn get_managers(&self) -> ClientResult<()> {
        self.begin();

        match self.service.get_managers().await {
            Ok(managers) => {
                self.with_state_mut(|state| {
                    state.managers = managers;
                    state.is_loading = false;
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

    /// Refreshes the owner join-row list.
    pub async fn get_owners(&self) -> ClientResult<()> {
        self.begin();

        match self.service.get_owners().await {
            Ok(owners) => {
                self.with_state_mut(|state| {
                    state.owners = owners;
                    state.is_loading = false;
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

    /// Fetches one user and selects them.
    pub async fn get_user_by_id(&self, user_id: &str) -> ClientResult<Option<UserAccount>> {
        self.begin();

        match self.service.get_user_by_id(user_id).await {
            Ok(user) => {
                self.with_state_mut(|state| {
                    state.selected_user = user.clone();
                    state.is_loading = false;
                });
                self.persist();
                Ok(user)
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// One role group, returned to the caller and merged into `users`.
    pub async fn get_users_by_role(&self, role: Role) -> ClientResult<Vec<UserAccount>> {
        self.begin();

        match self.service.get_users_by_role(role).await {
            Ok(users) => {
                self.with_state_mut(|state| {
                    state.users.retain(|u| u.role != role);
                    state.users.extend(users.clone());
                    state.is_loading = false;
                });
                self.persist();
                Ok(users)
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// The car a driver currently drives; not cached.
    pub async fn get_driver_with_car(
        &self,
        driver_user_id: &str,
    ) -> ClientResult<Option<(DriverAssignment, Car)>> {
        self.begin();

        match self.service.get_driver_with_car(driver_user_id).await {
            Ok(result) => {
                self.with_state_mut(|state| state.is_loading = false);
                Ok(result)
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Every car a manager oversees; not cached.
    pub async fn get_manager_with_cars(
        &self,
        manager_user_id: &str,
    ) -> ClientResult<Vec<(ManagerAssignment, Car)>> {
        self.begin();

        match self.service.get_manager_with_cars(manager_user_id).await {
            Ok(result) => {
                self.with_state_mut(|state| state.is_loading = false);
                Ok(result)
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

    fn with_state<R>(&self, f: impl FnOnce(&UserState) -> R) -> R {
        let state = self.state.lock().expect("user state poisoned");
        f(&state)
    }

    fn with_state_mut<R>(&self, f: impl FnOnce(&mut UserState) -> R) -> R {
        let mut state = self.state.lock().expect("user state poisoned");
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
        let snapshot = self.with_state(|state| UserSnapshot {
            users: state.users.clone(),
            drivers: state.drivers.clone(),
            managers: state.managers.clone(),
            owners: state.owners.clone(),
            selected_user: state.selected_user.clone(),
        });
        storage::persist_snapshot(&*self.storage, USER_NAMESPACE, &snapshot);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
