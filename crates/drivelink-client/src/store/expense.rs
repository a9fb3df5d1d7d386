//! # Expense Store
//!
//! Cache of expense ledgers, keyed by car. The mirror image of the revenue
//! store: per-car buckets, a recent feed capped at ten, a best-effort total
//! overwritten by each aggregation call.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use drivelink_core::{CarExpense, Money, RECENT_FEED_LIMIT};
use drivelink_gateway::Gateway;

use crate::error::{ClientError, ClientResult};
use crate::services::expense::{ExpensePatch, ExpenseService, NewExpense};
use crate::storage::{self, KvStorage, EXPENSE_NAMESPACE};

// =============================================================================
// State
// =============================================================================

/// The expense store's readable state.
#[derive(Debug, Clone, Default)]
pub struct ExpenseState {
    /// Per-car ledgers, as last fetched.
    pub car_expenses: HashMap<String, Vec<CarExpense>>,
    /// The latest entries across all cars, capped at [`RECENT_FEED_LIMIT`].
    pub recent_expenses: Vec<CarExpense>,
    pub selected_expense: Option<CarExpense>,
    /// Best-effort total from the last aggregation call.
    pub total_expenses: Money,
    pub is_loading: bool,
    pub error: Option<String>,
}

/// The persisted subset: loading/error are transient by design.
#[derive(Serialize, Deserialize)]
struct ExpenseSnapshot {
    car_expenses: HashMap<String, Vec<CarExpense>>,
    recent_expenses: Vec<CarExpense>,
}

// =============================================================================
// Expense Store
// =============================================================================

/// Expense-ledger cache over the expense service.
pub struct ExpenseStore {
    service: ExpenseService,
    storage: Arc<dyn KvStorage>,
    state: Mutex<ExpenseState>,
}

impl ExpenseStore {
    pub fn new(gateway: Arc<dyn Gateway>, storage: Arc<dyn KvStorage>) -> Self {
        ExpenseStore {
            service: ExpenseService::new(gateway),
            storage,
            state: Mutex::new(ExpenseState::default()),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Restores the persisted snapshot; flags reset to defaults.
    pub fn hydrate(&self) {
        if let Some(snapshot) =
            storage::load_snapshot::<ExpenseSnapshot>(&*self.storage, EXPENSE_NAMESPACE)
        {
            self.with_state_mut(|state| {
                state.car_expenses = snapshot.car_expenses;
                state.recent_expenses = snapshot.recent_expenses;
                state.is_loading = false;
                state.error = None;
            });
        }
    }

    /// Persists the current snapshot and clears in-memory state.
    pub fn dispose(&self) {
        self.persist();
        self.with_state_mut(|state| *state = ExpenseState::default());
    }

    /// Clears the cache entirely (memory and persisted snapshot).
    pub fn reset(&self) {
        self.with_state_mut(|state| *state = ExpenseState::default());
        self.persist();
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn state(&self) -> ExpenseState {
        self.with_state(ExpenseState::clone)
    }

    /// The cached ledger of one car.
    pub fn car_expenses(&self, car_id: &str) -> Vec<CarExpense> {
        self.with_state(|state| state.car_expenses.get(car_id).cloned().unwrap_or_default())
    }

    pub fn recent_expenses(&self) -> Vec<CarExpense> {
        self.with_state(|state| state.recent_expenses.clone())
    }

    pub fn selected_expense(&self) -> Option<CarExpense> {
        self.with_state(|state| state.selected_expense.clone())
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

    pub fn set_selected_expense(&self, expense: Option<CarExpense>) {
        self.with_state_mut(|state| state.selected_expense = expense);
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Refreshes one car's ledger bucket.
    pub async fn get_car_expenses(&self, car_id: &str) -> ClientResult<()> {
        self.begin();

        match self.service.get_car_expenses(car_id).await {
            Ok(expenses) => {
                self.with_state_mut(|state| {
                    state.car_expenses.insert(car_id.to_string(), expenses);
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

    /// Fetches one entry and selects it.
    pub async fn get_expense_by_id(&self, expense_id: &str) -> ClientResult<Option<CarExpense>> {
        self.begin();

        match self.service.get_expense_by_id(expense_id).await {
            Ok(expense) => {
                self.with_state_mut(|state| {
                    state.selected_expense = expense.clone();
                    state.is_loading = false;
                });
                Ok(expense)
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Appends an entry to the ledger and the recent feed.
    pub async fn create_expense(&self, new_expense: &NewExpense) -> ClientResult<CarExpense> {
        self.begin();

        match self.service.create_expense(new_expense).await {
            Ok(expense) => {
                self.with_state_mut(|state| {
                    state
                        .car_expenses
                        .entry(expense.car_id.clone())
                        .or_default()
                        .insert(0, expense.clone());

                    state.recent_expenses.insert(0, expense.clone());
                    state.recent_expenses.truncate(RECENT_FEED_LIMIT);

                    state.is_loading = false;
                });
                self.persist();
                Ok(expense)
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Updates an entry in place wherever it is cached.
    pub async fn update_expense(
        &self,
        expense_id: &str,
        patch: &ExpensePatch,
    ) -> ClientResult<CarExpense> {
        self.begin();

        match self.service.update_expense(expense_id, patch).await {
            Ok(expense) => {
                self.with_state_mut(|state| {
                    if let Some(bucket) = state.car_expenses.get_mut(&expense.car_id) {
                        for entry in bucket.iter_mut() {
                            if entry.id == expense.id {
                                *entry = expense.clone();
                            }
                        }
                    }
                    for entry in state.recent_expenses.iter_mut() {
                        if entry.id == expense.id {
                            *entry = expense.clone();
                        }
                    }
                    if state.selected_expense.as_ref().map(|e| e.id.as_str()) == Some(expense_id) {
                        state.selected_expense = Some(expense.clone());
                    }
                    state.is_loading = false;
                });
                self.persist();
                Ok(expense)
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Deletes an entry and drops it from every cached collection.
    pub async fn delete_expense(&self, expense_id: &str) -> ClientResult<()> {
        self.begin();

        match self.service.delete_expense(expense_id).await {
            Ok(()) => {
                self.with_state_mut(|state| {
                    for bucket in state.car_expenses.values_mut() {
                        bucket.retain(|entry| entry.id != expense_id);
                    }
                    state.recent_expenses.retain(|entry| entry.id != expense_id);
                    if state.selected_expense.as_ref().map(|e| e.id.as_str()) == Some(expense_id) {
                        state.selected_expense = None;
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

    /// Date-bounded fetch; returned to the caller, not cached.
    pub async fn get_expenses_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ClientResult<Vec<CarExpense>> {
        self.begin();

        match self.service.get_expenses_by_date_range(start, end).await {
            Ok(expenses) => {
                self.with_state_mut(|state| state.is_loading = false);
                Ok(expenses)
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Remote aggregation; the stored field is best-effort only.
    pub async fn get_total_expenses(&self, car_id: &str) -> ClientResult<Money> {
        self.begin();

        match self.service.get_total_expenses(car_id).await {
            Ok(total) => {
                self.with_state_mut(|state| {
                    state.total_expenses = total;
                    state.is_loading = false;
                });
                Ok(total)
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Refreshes the recent feed (default cap when `limit` is `None`).
    pub async fn get_recent_expenses(&self, limit: Option<usize>) -> ClientResult<()> {
        self.begin();

        let limit = limit.unwrap_or(RECENT_FEED_LIMIT);
        match self.service.get_recent_expenses(limit).await {
            Ok(expenses) => {
                self.with_state_mut(|state| {
                    state.recent_expenses = expenses;
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

    // =========================================================================
    // Internals
    // =========================================================================

    fn with_state<R>(&self, f: impl FnOnce(&ExpenseState) -> R) -> R {
        let state = self.state.lock().expect("expense state poisoned");
        f(&state)
    }

    fn with_state_mut<R>(&self, f: impl FnOnce(&mut ExpenseState) -> R) -> R {
        let mut state = self.state.lock().expect("expense state poisoned");
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
        let snapshot = self.with_state(|state| ExpenseSnapshot {
            car_expenses: state.car_expenses.clone(),
            recent_expenses: state.recent_expenses.clone(),
        });
        storage::persist_snapshot(&*self.storage, EXPENSE_NAMESPACE, &snapshot);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use drivelink_core::ExpenseCategory;
    use drivelink_gateway::MemoryGateway;
    use crate::storage::MemoryStorage;

    fn store() -> (Arc<MemoryGateway>, Arc<MemoryStorage>, ExpenseStore) {
        let gateway = Arc::new(MemoryGateway::new());
        let storage = Arc::new(MemoryStorage::new());
        let store = ExpenseStore::new(gateway.clone(), storage.clone());
        (gateway, storage, store)
    }

    fn entry(car_id: &str, cents: i64) -> NewExpense {
        NewExpense {
            car_id: car_id.to_string(),
            amount_cents: cents,
            category: ExpenseCategory::Fuel,
            expense_date: "2025-01-10".parse().unwrap(),
            description: None,
            receipt_url: None,
            created_by: "user-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_recent_feed_capped_and_newest_first() {
        let (_gateway, _storage, store) = store();

        let mut created_ids = Vec::new();
        for i in 1..=12 {
            let expense = store.create_expense(&entry("c1", i * 100)).await.unwrap();
            created_ids.push(expense.id);
        }

        let recent = store.recent_expenses();
        assert_eq!(recent.len(), RECENT_FEED_LIMIT);
        let expected: Vec<&String> = created_ids.iter().rev().take(RECENT_FEED_LIMIT).collect();
        let actual: Vec<&String> = recent.iter().map(|e| &e.id).collect();
        assert_eq!(actual, expected);
    }

    #[tokio::test]
    async fn test_delete_drops_entry_everywhere() {
        let (_gateway, _storage, store) = store();
        let created = store.create_expense(&entry("c1", 100)).await.unwrap();
        store.set_selected_expense(Some(created.clone()));

        store.delete_expense(&created.id).await.unwrap();

        assert!(store.car_expenses("c1").is_empty());
        assert!(store.recent_expenses().is_empty());
        assert!(store.selected_expense().is_none());
    }

    #[tokio::test]
    async fn test_total_expenses_overwritten_per_call() {
        let (_gateway, _storage, store) = store();
        store.create_expense(&entry("c1", 1_500)).await.unwrap();
        store.create_expense(&entry("c1", 500)).await.unwrap();

        let total = store.get_total_expenses("c1").await.unwrap();
        assert_eq!(total.cents(), 2_000);
        assert_eq!(store.state().total_expenses.cents(), 2_000);

        store.get_total_expenses("c2").await.unwrap();
        assert_eq!(store.state().total_expenses.cents(), 0);
    }

    #[tokio::test]
    async fn test_failed_action_reports_and_preserves_cache() {
        let (gateway, _storage, store) = store();
        store.create_expense(&entry("c1", 100)).await.unwrap();

        gateway.fail_table("car_expense");
        assert!(store.get_car_expenses("c1").await.is_err());

        assert_eq!(store.car_expenses("c1").len(), 1);
        assert!(store.error().is_some());
    }

    #[tokio::test]
    async fn test_hydrate_round_trip() {
        let (gateway, storage, store) = store();
        store.create_expense(&entry("c1", 100)).await.unwrap();

        let restarted = ExpenseStore::new(gateway, storage);
        restarted.hydrate();

        assert_eq!(restarted.car_expenses("c1").len(), 1);
        assert_eq!(restarted.recent_expenses().len(), 1);
    }
}
