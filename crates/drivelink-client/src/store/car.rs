//! # Car Store
//!
//! Cache of fleet vehicles with computed status views.
//!
//! ## Normalized Cache, Computed Views
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Car Store Cache Shape                               │
//! │                                                                         │
//! │  cars: Vec<Car>            ← single source of truth, unique by id,     │
//! │                              newest first                               │
//! │                                                                         │
//! │  available_cars() ──┐                                                   │
//! │  active_cars()     ─┤  pure filters over `cars`, computed on read      │
//! │  maintenance_cars()─┤  (never stored, so the views cannot drift        │
//! │  inactive_cars()   ─┘   from the source of truth)                      │
//! │                                                                         │
//! │  owner_cars: Vec<Car>      ← the last owner-scoped fetch (a different  │
//! │                              query scope, not a status partition)      │
//! │  selected_car: Option<Car> ← cleared when its id is deleted            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use drivelink_core::{Car, CarStatus};
use drivelink_gateway::Gateway;

use crate::error::{ClientError, ClientResult};
use crate::services::car::{CarPatch, CarService, NewCar};
use crate::storage::{self, KvStorage, CAR_NAMESPACE};

// =============================================================================
// State
// =============================================================================

/// The car store's readable state.
#[derive(Debug, Clone, Default)]
pub struct CarState {
    /// All fetched cars, unique by id, newest first.
    pub cars: Vec<Car>,
    /// The last owner-scoped fetch.
    pub owner_cars: Vec<Car>,
    pub selected_car: Option<Car>,
    pub is_loading: bool,
    pub error: Option<String>,
}

/// The persisted subset: loading/error are transient by design.
#[derive(Serialize, Deserialize)]
struct CarSnapshot {
    cars: Vec<Car>,
    selected_car: Option<Car>,
    owner_cars: Vec<Car>,
}

/// Replaces a car in place, or prepends it when new.
fn upsert(list: &mut Vec<Car>, car: &Car) {
    if let Some(existing) = list.iter_mut().find(|c| c.id == car.id) {
        *existing = car.clone();
    } else {
        list.insert(0, car.clone());
    }
}

// =============================================================================
// Car Store
// =============================================================================

/// Vehicle cache over the car service.
pub struct CarStore {
    service: CarService,
    storage: Arc<dyn KvStorage>,
    state: Mutex<CarState>,
}

impl CarStore {
    pub fn new(gateway: Arc<dyn Gateway>, storage: Arc<dyn KvStorage>) -> Self {
        CarStore {
            service: CarService::new(gateway),
            storage,
            state: Mutex::new(CarState::default()),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Restores the persisted snapshot; flags reset to defaults.
    pub fn hydrate(&self) {
        if let Some(snapshot) = storage::load_snapshot::<CarSnapshot>(&*self.storage, CAR_NAMESPACE)
        {
            self.with_state_mut(|state| {
                state.cars = snapshot.cars;
                state.selected_car = snapshot.selected_car;
                state.owner_cars = snapshot.owner_cars;
                state.is_loading = false;
                state.error = None;
            });
        }
    }

    /// Persists the current snapshot and clears in-memory state.
    pub fn dispose(&self) {
        self.persist();
        self.with_state_mut(|state| *state = CarState::default());
    }

    /// Clears the cache entirely (memory and persisted snapshot).
    pub fn reset(&self) {
        self.with_state_mut(|state| *state = CarState::default());
        self.persist();
    }

    // =========================================================================
    // Reads (computed views)
    // =========================================================================

    pub fn state(&self) -> CarState {
        self.with_state(CarState::clone)
    }

    /// All cached cars, newest first.
    pub fn cars(&self) -> Vec<Car> {
        self.with_state(|state| state.cars.clone())
    }

    /// The last owner-scoped fetch.
    pub fn owner_cars(&self) -> Vec<Car> {
        self.with_state(|state| state.owner_cars.clone())
    }

    pub fn selected_car(&self) -> Option<Car> {
        self.with_state(|state| state.selected_car.clone())
    }

    /// Status view computed on read: a pure filter over the flat cache.
    pub fn cars_with_status(&self, status: CarStatus) -> Vec<Car> {
        self.with_state(|state| {
            state
                .cars
                .iter()
                .filter(|car| car.status == status)
                .cloned()
                .collect()
        })
    }

    pub fn available_cars(&self) -> Vec<Car> {
        self.cars_with_status(CarStatus::Available)
    }

    pub fn active_cars(&self) -> Vec<Car> {
        self.cars_with_status(CarStatus::Active)
    }

    pub fn maintenance_cars(&self) -> Vec<Car> {
        self.cars_with_status(CarStatus::Maintenance)
    }

    pub fn inactive_cars(&self) -> Vec<Car> {
        self.cars_with_status(CarStatus::Inactive)
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

    pub fn set_selected_car(&self, car: Option<Car>) {
        self.with_state_mut(|state| state.selected_car = car);
        self.persist();
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Replaces the cache with every car the gateway knows.
    pub async fn get_all_cars(&self) -> ClientResult<()> {
        self.begin();

        match self.service.get_all_cars().await {
            Ok(cars) => {
                self.with_state_mut(|state| {
                    state.cars = cars;
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

    /// Fetches one car and selects it.
    pub async fn get_car_by_id(&self, car_id: &str) -> ClientResult<Option<Car>> {
        self.begin();

        match self.service.get_car_by_id(car_id).await {
            Ok(car) => {
                self.with_state_mut(|state| {
                    state.selected_car = car.clone();
                    state.is_loading = false;
                });
                self.persist();
                Ok(car)
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Refreshes the owner-scoped list.
    pub async fn get_cars_by_owner(&self, owner_user_id: &str) -> ClientResult<()> {
        self.begin();

        match self.service.get_cars_by_owner(owner_user_id).await {
            Ok(owner_cars) => {
                self.with_state_mut(|state| {
                    state.owner_cars = owner_cars;
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

    /// Registers a car and prepends it to the flat and owner lists.
    pub async fn create_car(&self, new_car: &NewCar) -> ClientResult<Car> {
        self.begin();

        match self.service.create_car(new_car).await {
            Ok(car) => {
                self.with_state_mut(|state| {
                    upsert(&mut state.cars, &car);
                    upsert(&mut state.owner_cars, &car);
                    state.is_loading = false;
                });
                self.persist();
                Ok(car)
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Updates a car; every collection containing it sees the new row.
    pub async fn update_car(&self, car_id: &str, patch: &CarPatch) -> ClientResult<Car> {
        self.begin();

        match self.service.update_car(car_id, patch).await {
            Ok(car) => {
                self.with_state_mut(|state| {
                    if let Some(existing) = state.cars.iter_mut().find(|c| c.id == car.id) {
                        *existing = car.clone();
                    }
                    if let Some(existing) = state.owner_cars.iter_mut().find(|c| c.id == car.id) {
                        *existing = car.clone();
                    }
                    if state.selected_car.as_ref().map(|c| c.id.as_str()) == Some(car_id) {
                        state.selected_car = Some(car.clone());
                    }
                    state.is_loading = false;
                });
                self.persist();
                Ok(car)
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Deletes a car and drops it from every collection.
    pub async fn delete_car(&self, car_id: &str) -> ClientResult<()> {
        self.begin();

        match self.service.delete_car(car_id).await {
            Ok(()) => {
                self.with_state_mut(|state| {
                    state.cars.retain(|c| c.id != car_id);
                    state.owner_cars.retain(|c| c.id != car_id);
                    if state.selected_car.as_ref().map(|c| c.id.as_str()) == Some(car_id) {
                        state.selected_car = None;
                    }
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

    /// Fetches one status from the gateway, merging rows into the flat cache.
    pub async fn get_cars_by_status(&self, status: CarStatus) -> ClientResult<Vec<Car>> {
        self.begin();

        match self.service.get_cars_by_status(status).await {
            Ok(cars) => {
                self.with_state_mut(|state| {
                    for car in cars.iter().rev() {
                        upsert(&mut state.cars, car);
                    }
                    state.is_loading = false;
                });
                self.persist();
                Ok(cars)
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Gives the car a new driver; the cache has nothing to reconcile.
    pub async fn assign_driver(&self, car_id: &str, driver_user_id: &str) -> ClientResult<()> {
        self.begin();

        match self.service.assign_driver(car_id, driver_user_id).await {
            Ok(_assignment) => {
                self.with_state_mut(|state| state.is_loading = false);
                Ok(())
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Adds a manager to the car; the cache has nothing to reconcile.
    pub async fn assign_manager(&self, car_id: &str, manager_user_id: &str) -> ClientResult<()> {
        self.begin();

        match self.service.assign_manager(car_id, manager_user_id).await {
            Ok(_assignment) => {
                self.with_state_mut(|state| state.is_loading = false);
                Ok(())
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

    fn with_state<R>(&self, f: impl FnOnce(&CarState) -> R) -> R {
        let state = self.state.lock().expect("car state poisoned");
        f(&state)
    }

    fn with_state_mut<R>(&self, f: impl FnOnce(&mut CarState) -> R) -> R {
        let mut state = self.state.lock().expect("car state poisoned");
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
        let snapshot = self.with_state(|state| CarSnapshot {
            cars: state.cars.clone(),
            selected_car: state.selected_car.clone(),
            owner_cars: state.owner_cars.clone(),
        });
        storage::persist_snapshot(&*self.storage, CAR_NAMESPACE, &snapshot);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use drivelink_gateway::MemoryGateway;
    use crate::storage::MemoryStorage;

    fn store() -> (Arc<MemoryGateway>, Arc<MemoryStorage>, CarStore) {
        let gateway = Arc::new(MemoryGateway::new());
        let storage = Arc::new(MemoryStorage::new());
        let store = CarStore::new(gateway.clone(), storage.clone());
        (gateway, storage, store)
    }

    fn new_car(plate_no: &str, status: CarStatus) -> NewCar {
        NewCar {
            plate_no: plate_no.to_string(),
            libre_no: format!("LIB-{}", plate_no),
            owner_id: "own-rec-1".to_string(),
            model: None,
            year: None,
            color: None,
            fuel_type: None,
            status,
        }
    }

    /// The union of the four status views must be exactly the flat cache,
    /// partitioned by status, with no id in two views.
    fn assert_views_consistent(store: &CarStore) {
        let cars = store.cars();
        let mut seen = std::collections::HashSet::new();
        let mut total = 0;

        for status in CarStatus::ALL {
            let view = store.cars_with_status(status);
            let expected: Vec<Car> = cars
                .iter()
                .filter(|car| car.status == status)
                .cloned()
                .collect();
            assert_eq!(view, expected, "view for {:?} drifted", status);

            for car in &view {
                assert!(seen.insert(car.id.clone()), "{} in two views", car.id);
            }
            total += view.len();
        }

        assert_eq!(total, cars.len());
    }

    #[tokio::test]
    async fn test_views_stay_consistent_across_mutations() {
        let (_gateway, _storage, store) = store();

        let a = store.create_car(&new_car("AA-11111", CarStatus::Available)).await.unwrap();
        let b = store.create_car(&new_car("BB-22222", CarStatus::Active)).await.unwrap();
        store.create_car(&new_car("CC-33333", CarStatus::Available)).await.unwrap();
        assert_views_consistent(&store);

        store
            .update_car(&a.id, &CarPatch { status: Some(CarStatus::Inactive), ..CarPatch::default() })
            .await
            .unwrap();
        assert_views_consistent(&store);

        store.delete_car(&b.id).await.unwrap();
        assert_views_consistent(&store);

        store
            .update_car(&a.id, &CarPatch { status: Some(CarStatus::Active), ..CarPatch::default() })
            .await
            .unwrap();
        assert_views_consistent(&store);
    }

    #[tokio::test]
    async fn test_status_change_moves_between_views() {
        let (_gateway, _storage, store) = store();
        let car = store.create_car(&new_car("AA-11111", CarStatus::Available)).await.unwrap();
        assert_eq!(store.available_cars().len(), 1);

        store
            .update_car(
                &car.id,
                &CarPatch { status: Some(CarStatus::Maintenance), ..CarPatch::default() },
            )
            .await
            .unwrap();

        // Absent from the available view, present in maintenance, same id
        assert!(store.available_cars().is_empty());
        let maintenance = store.maintenance_cars();
        assert_eq!(maintenance.len(), 1);
        assert_eq!(maintenance[0].id, car.id);
    }

    #[tokio::test]
    async fn test_create_prepends_to_flat_and_owner_lists() {
        let (_gateway, _storage, store) = store();
        store.create_car(&new_car("AA-11111", CarStatus::Available)).await.unwrap();
        let second = store.create_car(&new_car("BB-22222", CarStatus::Available)).await.unwrap();

        assert_eq!(store.cars()[0].id, second.id);
        assert_eq!(store.owner_cars()[0].id, second.id);
    }

    #[tokio::test]
    async fn test_delete_clears_matching_selection() {
        let (_gateway, _storage, store) = store();
        let car = store.create_car(&new_car("AA-11111", CarStatus::Available)).await.unwrap();
        store.set_selected_car(Some(car.clone()));

        store.delete_car(&car.id).await.unwrap();

        assert!(store.selected_car().is_none());
        assert!(store.cars().is_empty());
    }

    #[tokio::test]
    async fn test_failed_action_keeps_cache_and_sets_error() {
        let (gateway, _storage, store) = store();
        store.create_car(&new_car("AA-11111", CarStatus::Available)).await.unwrap();

        gateway.fail_table("cars");
        assert!(store.get_all_cars().await.is_err());

        assert_eq!(store.cars().len(), 1);
        assert!(!store.is_loading());
        assert!(store.error().is_some());

        // The next action clears the stale error on entry
        gateway.restore_table("cars");
        store.get_all_cars().await.unwrap();
        assert!(store.error().is_none());
    }

    #[tokio::test]
    async fn test_hydrate_round_trip() {
        let (gateway, storage, store) = store();
        store.create_car(&new_car("AA-11111", CarStatus::Available)).await.unwrap();

        let restarted = CarStore::new(gateway, storage);
        restarted.hydrate();

        assert_eq!(restarted.cars().len(), 1);
        assert!(!restarted.is_loading());
        assert_views_consistent(&restarted);
    }

    #[tokio::test]
    async fn test_cars_by_status_merges_into_cache() {
        let (gateway, _storage, store) = store();
        // Rows created outside this store (another device, another session)
        let other = CarStore::new(gateway.clone(), Arc::new(MemoryStorage::new()));
        other.create_car(&new_car("AA-11111", CarStatus::Maintenance)).await.unwrap();
        other.create_car(&new_car("BB-22222", CarStatus::Available)).await.unwrap();

        let fetched = store.get_cars_by_status(CarStatus::Maintenance).await.unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(store.cars().len(), 1);
        assert_views_consistent(&store);
    }
}
