//! # Revenue Store
//!
//! Cache of revenue ledgers, keyed by car.
//!
//! ## Cache Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Revenue Store Cache                                  │
//! │                                                                         │
//! │  car_revenues: car_id → Vec<CarRevenue>   (per-car ledgers)            │
//! │  recent_revenues: Vec<CarRevenue>         (capped at 10, newest first) │
//! │  selected_revenue: Option<CarRevenue>                                  │
//! │  total_revenue: Money                     (best-effort, overwritten    │
//! │                                            by each get_total_revenue)  │
//! │                                                                         │
//! │  Totals and profit/loss always aggregate REMOTE rows; the cache is     │
//! │  only what the dashboards render between refreshes.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use drivelink_core::{CarRevenue, Money, ProfitLoss, RECENT_FEED_LIMIT};
use drivelink_gateway::Gateway;

use crate::error::{ClientError, ClientResult};
use crate::services::revenue::{NewRevenue, RevenuePatch, RevenueService};
use crate::storage::{self, KvStorage, REVENUE_NAMESPACE};

// =============================================================================
// State
// =============================================================================

/// The revenue store's readable state.
#[derive(Debug, Clone, Default)]
pub struct RevenueState {
    /// Per-car ledgers, as last fetched.
    pub car_revenues: HashMap<String, Vec<CarRevenue>>,
    /// The latest entries across all cars, capped at [`RECENT_FEED_LIMIT`].
    pub recent_revenues: Vec<CarRevenue>,
    pub selected_revenue: Option<CarRevenue>,
    /// Best-effort total from the last aggregation call.
    pub total_revenue: Money,
    pub is_loading: bool,
    pub error: Option<String>,
}

/// The persisted subset: loading/error are transient by design.
#[derive(Serialize, Deserialize)]
struct RevenueSnapshot {
    car_revenues: HashMap<String, Vec<CarRevenue>>,
    recent_revenues: Vec<CarRevenue>,
}

// =============================================================================
// Revenue Store
// =============================================================================

/// Revenue-ledger cache over the revenue service.
pub struct RevenueStore {
    service: RevenueService,
    storage: Arc<dyn KvStorage>,
    state: Mutex<RevenueState>,
}

impl RevenueStore {
    pub fn new(gateway: Arc<dyn Gateway>, storage: Arc<dyn KvStorage>) -> Self {
        RevenueStore {
            service: RevenueService::new(gateway),
            storage,
            state: Mutex::new(RevenueState::default()),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Restores the persisted snapshot; flags reset to defaults.
    pub fn hydrate(&self) {
        if let Some(snapshot) =
            storage::load_snapshot::<RevenueSnapshot>(&*self.storage, REVENUE_NAMESPACE)
        {
            self.with_state_mut(|state| {
                state.car_revenues = snapshot.car_revenues;
                state.recent_revenues = snapshot.recent_revenues;
                state.is_loading = false;
                state.error = None;
            });
        }
    }

    /// Persists the current snapshot and clears in-memory state.
    pub fn dispose(&self) {
        self.persist();
        self.with_state_mut(|state| *state = RevenueState::default());
    }

    /// Clears the cache entirely (memory and persisted snapshot).
    pub fn reset(&self) {
        self.with_state_mut(|state| *state = RevenueState::default());
        self.persist();
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn state(&self) -> RevenueState {
        self.with_state(RevenueState::clone)
    }

    /// The cached ledger of one car.
    pub fn car_revenues(&self, car_id: &str) -> Vec<CarRevenue> {
        self.with_state(|state| state.car_revenues.get(car_id).cloned().unwrap_or_default())
    }

    pub fn recent_revenues(&self) -> Vec<CarRevenue> {
        self.with_state(|state| state.recent_revenues.clone())
    }

    pub fn selected_revenue(&self) -> Option<CarRevenue> {
        self.with_state(|state| state.selected_revenue.clone())
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

    pub fn set_selected_revenue(&self, revenue: Option<CarRevenue>) {
        self.with_state_mut(|state| state.selected_revenue = revenue);
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Refreshes one car's ledger bucket.
    pub async fn get_car_revenue(&self, car_id: &str) -> ClientResult<()> {
        self.begin();

        match self.service.get_car_revenue(car_id).await {
            Ok(revenues) => {
                self.with_state_mut(|state| {
                    state.car_revenues.insert(car_id.to_string(), revenues);
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
    pub async fn get_revenue_by_id(&self, revenue_id: &str) -> ClientResult<Option<CarRevenue>> {
        self.begin();

        match self.service.get_revenue_by_id(revenue_id).await {
            Ok(revenue) => {
                self.with_state_mut(|state| {
                    state.selected_revenue = revenue.clone();
                    state.is_loading = false;
                });
                Ok(revenue)
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Appends an entry to the ledger and the recent feed.
    pub async fn create_revenue(&self, new_revenue: &NewRevenue) -> ClientResult<CarRevenue> {
        self.begin();

        match self.service.create_revenue(new_revenue).await {
            Ok(revenue) => {
                self.with_state_mut(|state| {
                    state
                        .car_revenues
                        .entry(revenue.car_id.clone())
                        .or_default()
                        .insert(0, revenue.clone());

                    state.recent_revenues.insert(0, revenue.clone());
                    state.recent_revenues.truncate(RECENT_FEED_LIMIT);

                    state.is_loading = false;
                });
                self.persist();
                Ok(revenue)
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Updates an entry in place wherever it is cached.
    pub async fn update_revenue(
        &self,
        revenue_id: &str,
        patch: &RevenuePatch,
    ) -> ClientResult<CarRevenue> {
        self.begin();

        match self.service.update_revenue(revenue_id, patch).await {
            Ok(revenue) => {
                self.with_state_mut(|state| {
                    if let Some(bucket) = state.car_revenues.get_mut(&revenue.car_id) {
                        for entry in bucket.iter_mut() {
                            if entry.id == revenue.id {
                                *entry = revenue.clone();
                            }
                        }
                    }
                    for entry in state.recent_revenues.iter_mut() {
                        if entry.id == revenue.id {
                            *entry = revenue.clone();
                        }
                    }
                    if state.selected_revenue.as_ref().map(|r| r.id.as_str()) == Some(revenue_id) {
                        state.selected_revenue = Some(revenue.clone());
                    }
                    state.is_loading = false;
                });
                self.persist();
                Ok(revenue)
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Deletes an entry and drops it from every cached collection.
    pub async fn delete_revenue(&self, revenue_id: &str) -> ClientResult<()> {
        self.begin();

        match self.service.delete_revenue(revenue_id).await {
            Ok(()) => {
                self.with_state_mut(|state| {
                    for bucket in state.car_revenues.values_mut() {
                        bucket.retain(|entry| entry.id != revenue_id);
                    }
                    state.recent_revenues.retain(|entry| entry.id != revenue_id);
                    if state.selected_revenue.as_ref().map(|r| r.id.as_str()) == Some(revenue_id) {
                        state.selected_revenue = None;
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
    pub async fn get_revenue_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ClientResult<Vec<CarRevenue>> {
        self.begin();

        match self.service.get_revenue_by_date_range(start, end).await {
            Ok(revenues) => {
                self.with_state_mut(|state| state.is_loading = false);
                Ok(revenues)
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Remote aggregation; the stored field is best-effort only.
    pub async fn get_total_revenue(&self, car_id: &str) -> ClientResult<Money> {
        self.begin();

        match self.service.get_total_revenue(car_id).await {
            Ok(total) => {
                self.with_state_mut(|state| {
                    state.total_revenue = total;
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
    pub async fn get_recent_revenue(&self, limit: Option<usize>) -> ClientResult<()> {
        self.begin();

        let limit = limit.unwrap_or(RECENT_FEED_LIMIT);
        match self.service.get_recent_revenue(limit).await {
            Ok(revenues) => {
                self.with_state_mut(|state| {
                    state.recent_revenues = revenues;
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

    /// Two parallel remote aggregations; never served from the cache.
    pub async fn get_profit_loss(
        &self,
        car_id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> ClientResult<ProfitLoss> {
        self.begin();

        match self.service.get_profit_loss(car_id, start, end).await {
            Ok(profit_loss) => {
                self.with_state_mut(|state| state.is_loading = false);
                Ok(profit_loss)
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

    fn with_state<R>(&self, f: impl FnOnce(&RevenueState) -> R) -> R {
        let state = self.state.lock().expect("revenue state poisoned");
        f(&state)
    }

    fn with_state_mut<R>(&self, f: impl FnOnce(&mut RevenueState) -> R) -> R {
        let mut state = self.state.lock().expect("revenue state poisoned");
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
        let snapshot = self.with_state(|state| RevenueSnapshot {
            car_revenues: state.car_revenues.clone(),
            recent_revenues: state.recent_revenues.clone(),
        });
        storage::persist_snapshot(&*self.storage, REVENUE_NAMESPACE, &snapshot);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use drivelink_core::RevenueSource;
    use drivelink_gateway::MemoryGateway;
    use crate::storage::MemoryStorage;

    fn store() -> (Arc<MemoryGateway>, Arc<MemoryStorage>, RevenueStore) {
        let gateway = Arc::new(MemoryGateway::new());
        let storage = Arc::new(MemoryStorage::new());
        let store = RevenueStore::new(gateway.clone(), storage.clone());
        (gateway, storage, store)
    }

    fn entry(car_id: &str, cents: i64) -> NewRevenue {
        NewRevenue {
            car_id: car_id.to_string(),
            amount_cents: cents,
            source: RevenueSource::Ride,
            revenue_date: "2025-01-10".parse().unwrap(),
            notes: None,
            trip_id: None,
            created_by: "user-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_recent_feed_capped_and_newest_first() {
        let (_gateway, _storage, store) = store();

        let mut created_ids = Vec::new();
        for i in 1..=12 {
            let revenue = store.create_revenue(&entry("c1", i * 100)).await.unwrap();
            created_ids.push(revenue.id);
        }

        let recent = store.recent_revenues();
        // Never more than the cap, newest insertion at the head
        assert_eq!(recent.len(), RECENT_FEED_LIMIT);
        let expected: Vec<&String> = created_ids.iter().rev().take(RECENT_FEED_LIMIT).collect();
        let actual: Vec<&String> = recent.iter().map(|r| &r.id).collect();
        assert_eq!(actual, expected);
    }

    #[tokio::test]
    async fn test_create_prepends_to_car_bucket() {
        let (_gateway, _storage, store) = store();
        store.create_revenue(&entry("c1", 100)).await.unwrap();
        let second = store.create_revenue(&entry("c1", 200)).await.unwrap();
        store.create_revenue(&entry("c2", 900)).await.unwrap();

        let bucket = store.car_revenues("c1");
        assert_eq!(bucket.len(), 2);
        assert_eq!(bucket[0].id, second.id);
        assert_eq!(store.car_revenues("c2").len(), 1);
    }

    #[tokio::test]
    async fn test_update_reaches_every_collection() {
        let (_gateway, _storage, store) = store();
        let created = store.create_revenue(&entry("c1", 100)).await.unwrap();
        store.set_selected_revenue(Some(created.clone()));

        store
            .update_revenue(
                &created.id,
                &RevenuePatch {
                    amount_cents: Some(750),
                    ..RevenuePatch::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(store.car_revenues("c1")[0].amount_cents, 750);
        assert_eq!(store.recent_revenues()[0].amount_cents, 750);
        assert_eq!(store.selected_revenue().unwrap().amount_cents, 750);
    }

    #[tokio::test]
    async fn test_delete_drops_entry_everywhere() {
        let (_gateway, _storage, store) = store();
        let created = store.create_revenue(&entry("c1", 100)).await.unwrap();
        store.set_selected_revenue(Some(created.clone()));

        store.delete_revenue(&created.id).await.unwrap();

        assert!(store.car_revenues("c1").is_empty());
        assert!(store.recent_revenues().is_empty());
        assert!(store.selected_revenue().is_none());
    }

    #[tokio::test]
    async fn test_total_revenue_is_best_effort_field() {
        let (_gateway, _storage, store) = store();
        store.create_revenue(&entry("c1", 1_000)).await.unwrap();
        store.create_revenue(&entry("c1", 2_000)).await.unwrap();

        let total = store.get_total_revenue("c1").await.unwrap();
        assert_eq!(total.cents(), 3_000);
        assert_eq!(store.state().total_revenue.cents(), 3_000);

        // The next call simply overwrites it
        let total = store.get_total_revenue("c2").await.unwrap();
        assert_eq!(total.cents(), 0);
        assert_eq!(store.state().total_revenue.cents(), 0);
    }

    #[tokio::test]
    async fn test_profit_loss_is_not_cached() {
        let (gateway, _storage, store) = store();
        store.create_revenue(&entry("c1", 100_000)).await.unwrap();
        gateway.seed(
            "car_expense",
            vec![serde_json::json!({
                "id": "e1",
                "car_id": "c1",
                "amount_cents": 40_000,
                "category": "fuel",
                "expense_date": "2025-01-11",
                "description": null,
                "receipt_url": null,
                "created_at": chrono::Utc::now(),
                "created_by": "user-1",
            })],
        );

        let pl = store.get_profit_loss("c1", None, None).await.unwrap();
        assert_eq!(pl.profit.cents(), 60_000);
        assert!((pl.profit_margin - 60.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_failed_create_keeps_cache_and_reports() {
        let (gateway, _storage, store) = store();
        store.create_revenue(&entry("c1", 100)).await.unwrap();

        gateway.fail_table("car_revenue");
        assert!(store.create_revenue(&entry("c1", 200)).await.is_err());

        assert_eq!(store.car_revenues("c1").len(), 1);
        assert!(store.error().is_some());
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_hydrate_round_trip() {
        let (gateway, storage, store) = store();
        store.create_revenue(&entry("c1", 100)).await.unwrap();

        let restarted = RevenueStore::new(gateway, storage);
        restarted.hydrate();

        assert_eq!(restarted.car_revenues("c1").len(), 1);
        assert_eq!(restarted.recent_revenues().len(), 1);
        assert!(restarted.error().is_none());
    }
}
