//! # Revenue Service
//!
//! Ledger operations for car revenue, plus the profit/loss aggregation.
//!
//! ## Profit/Loss Aggregation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                get_profit_loss(car, start?, end?)                       │
//! │                                                                         │
//! │        ┌── select car_revenue (amount_cents) ──┐                       │
//! │  fork ─┤                                        ├─ join ─► sum each    │
//! │        └── select car_expense (amount_cents) ──┘                       │
//! │                                                                         │
//! │  profit = revenue - expenses                                           │
//! │  margin = revenue > 0 ? profit / revenue × 100 : 0                     │
//! │                                                                         │
//! │  The two aggregate queries run in parallel; totals come from the       │
//! │  remote rows, never from the store cache.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

use drivelink_core::{validation, CarRevenue, Money, ProfitLoss, RevenueSource};
use drivelink_gateway::{Filter, Gateway, GatewayError};

use crate::error::{ClientError, ClientResult};
use crate::services::{decode, decode_rows, sum_amounts, tables};

// =============================================================================
// Inputs
// =============================================================================

/// Input for [`RevenueService::create_revenue`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRevenue {
    pub car_id: String,
    pub amount_cents: i64,
    pub source: RevenueSource,
    pub revenue_date: NaiveDate,
    pub notes: Option<String>,
    pub trip_id: Option<String>,
    pub created_by: String,
}

/// Fields that [`RevenueService::update_revenue`] may change. `None` = unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RevenuePatch {
    pub amount_cents: Option<i64>,
    pub source: Option<RevenueSource>,
    pub revenue_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub trip_id: Option<String>,
}

// =============================================================================
// Revenue Service
// =============================================================================

/// Stateless revenue-ledger operations over the gateway.
#[derive(Clone)]
pub struct RevenueService {
    gateway: Arc<dyn Gateway>,
}

impl RevenueService {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        RevenueService { gateway }
    }

    /// Every revenue entry of a car, most recent ledger date first.
    pub async fn get_car_revenue(&self, car_id: &str) -> ClientResult<Vec<CarRevenue>> {
        let rows = self
            .gateway
            .select(
                tables::CAR_REVENUE,
                Filter::new().eq("car_id", car_id).order_desc("revenue_date"),
            )
            .await?;
        decode_rows(rows)
    }

    /// One entry, or `None` when the id is unknown.
    pub async fn get_revenue_by_id(&self, revenue_id: &str) -> ClientResult<Option<CarRevenue>> {
        match self
            .gateway
            .select_single(tables::CAR_REVENUE, Filter::new().eq("id", revenue_id))
            .await
        {
            Ok(row) => Ok(Some(decode(row)?)),
            Err(GatewayError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Appends a ledger entry.
    pub async fn create_revenue(&self, new_revenue: &NewRevenue) -> ClientResult<CarRevenue> {
        validation::validate_amount_cents(new_revenue.amount_cents)?;

        debug!(car_id = %new_revenue.car_id, amount_cents = new_revenue.amount_cents, "create_revenue");

        let row = json!({
            "car_id": new_revenue.car_id,
            "amount_cents": new_revenue.amount_cents,
            "source": new_revenue.source,
            "revenue_date": new_revenue.revenue_date,
            "notes": new_revenue.notes,
            "trip_id": new_revenue.trip_id,
            "created_at": Utc::now(),
            "created_by": new_revenue.created_by,
        });

        let stored = self.gateway.insert(tables::CAR_REVENUE, row).await?;
        decode(stored)
    }

    /// Applies a patch and returns the entry as stored.
    pub async fn update_revenue(
        &self,
        revenue_id: &str,
        patch: &RevenuePatch,
    ) -> ClientResult<CarRevenue> {
        let mut fields = Map::new();
        if let Some(amount_cents) = patch.amount_cents {
            validation::validate_amount_cents(amount_cents)?;
            fields.insert("amount_cents".to_string(), json!(amount_cents));
        }
        if let Some(source) = patch.source {
            fields.insert("source".to_string(), json!(source));
        }
        if let Some(revenue_date) = patch.revenue_date {
            fields.insert("revenue_date".to_string(), json!(revenue_date));
        }
        if let Some(notes) = &patch.notes {
            fields.insert("notes".to_string(), json!(notes));
        }
        if let Some(trip_id) = &patch.trip_id {
            fields.insert("trip_id".to_string(), json!(trip_id));
        }

        let rows = self
            .gateway
            .update(
                tables::CAR_REVENUE,
                Filter::new().eq("id", revenue_id),
                Value::Object(fields),
            )
            .await?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::Query(format!("Revenue entry not found: {}", revenue_id)))?;
        decode(row)
    }

    /// Removes a ledger entry.
    pub async fn delete_revenue(&self, revenue_id: &str) -> ClientResult<()> {
        self.gateway
            .delete(tables::CAR_REVENUE, Filter::new().eq("id", revenue_id))
            .await?;
        Ok(())
    }

    /// Entries across all cars inside an inclusive date range.
    pub async fn get_revenue_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ClientResult<Vec<CarRevenue>> {
        let rows = self
            .gateway
            .select(
                tables::CAR_REVENUE,
                Filter::new()
                    .gte("revenue_date", start.to_string())
                    .lte("revenue_date", end.to_string())
                    .order_desc("revenue_date"),
            )
            .await?;
        decode_rows(rows)
    }

    /// Remote aggregation of a car's lifetime revenue.
    pub async fn get_total_revenue(&self, car_id: &str) -> ClientResult<Money> {
        let rows = self
            .gateway
            .select(tables::CAR_REVENUE, Filter::new().eq("car_id", car_id))
            .await?;
        Ok(Money::from_cents(sum_amounts(&rows)))
    }

    /// The latest entries across all cars, newest logged first.
    pub async fn get_recent_revenue(&self, limit: usize) -> ClientResult<Vec<CarRevenue>> {
        let rows = self
            .gateway
            .select(
                tables::CAR_REVENUE,
                Filter::new().order_desc("created_at").limit(limit),
            )
            .await?;
        decode_rows(rows)
    }

    /// Revenue minus expenses for one car, optionally date-bounded.
    pub async fn get_profit_loss(
        &self,
        car_id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> ClientResult<ProfitLoss> {
        let mut revenue_filter = Filter::new().eq("car_id", car_id);
        let mut expense_filter = Filter::new().eq("car_id", car_id);
        if let (Some(start), Some(end)) = (start, end) {
            revenue_filter = revenue_filter
                .gte("revenue_date", start.to_string())
                .lte("revenue_date", end.to_string());
            expense_filter = expense_filter
                .gte("expense_date", start.to_string())
                .lte("expense_date", end.to_string());
        }

        let (revenue_rows, expense_rows) = tokio::join!(
            self.gateway.select(tables::CAR_REVENUE, revenue_filter),
            self.gateway.select(tables::CAR_EXPENSE, expense_filter),
        );

        let total_revenue = Money::from_cents(sum_amounts(&revenue_rows?));
        let total_expenses = Money::from_cents(sum_amounts(&expense_rows?));

        Ok(ProfitLoss::from_totals(total_revenue, total_expenses))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use drivelink_gateway::MemoryGateway;

    fn service() -> (Arc<MemoryGateway>, RevenueService) {
        let gateway = Arc::new(MemoryGateway::new());
        let service = RevenueService::new(gateway.clone());
        (gateway, service)
    }

    fn entry(car_id: &str, cents: i64, date: &str) -> NewRevenue {
        NewRevenue {
            car_id: car_id.to_string(),
            amount_cents: cents,
            source: RevenueSource::Ride,
            revenue_date: date.parse().unwrap(),
            notes: None,
            trip_id: None,
            created_by: "user-1".to_string(),
        }
    }

    fn seed_expense(gateway: &MemoryGateway, car_id: &str, cents: i64, date: &str) {
        gateway.seed(
            tables::CAR_EXPENSE,
            vec![json!({
                "id": uuid::Uuid::new_v4().to_string(),
                "car_id": car_id,
                "amount_cents": cents,
                "category": "fuel",
                "expense_date": date,
                "description": null,
                "receipt_url": null,
                "created_at": Utc::now(),
                "created_by": "user-1",
            })],
        );
    }

    #[tokio::test]
    async fn test_create_and_list_sorted_by_ledger_date() {
        let (_gateway, service) = service();
        service.create_revenue(&entry("c1", 100, "2025-01-10")).await.unwrap();
        service.create_revenue(&entry("c1", 200, "2025-03-05")).await.unwrap();
        service.create_revenue(&entry("c1", 300, "2025-02-20")).await.unwrap();
        service.create_revenue(&entry("c2", 999, "2025-02-21")).await.unwrap();

        let entries = service.get_car_revenue("c1").await.unwrap();
        let dates: Vec<String> = entries.iter().map(|e| e.revenue_date.to_string()).collect();
        assert_eq!(dates, vec!["2025-03-05", "2025-02-20", "2025-01-10"]);
    }

    #[tokio::test]
    async fn test_create_rejects_non_positive_amounts() {
        let (_gateway, service) = service();
        assert!(matches!(
            service.create_revenue(&entry("c1", 0, "2025-01-10")).await.unwrap_err(),
            ClientError::Validation(_)
        ));
        assert!(service.create_revenue(&entry("c1", -50, "2025-01-10")).await.is_err());
    }

    #[tokio::test]
    async fn test_total_revenue_sums_remote_rows() {
        let (_gateway, service) = service();
        service.create_revenue(&entry("c1", 1_000, "2025-01-10")).await.unwrap();
        service.create_revenue(&entry("c1", 2_500, "2025-01-11")).await.unwrap();
        service.create_revenue(&entry("c2", 9_999, "2025-01-12")).await.unwrap();

        let total = service.get_total_revenue("c1").await.unwrap();
        assert_eq!(total.cents(), 3_500);
    }

    #[tokio::test]
    async fn test_date_range_is_inclusive() {
        let (_gateway, service) = service();
        service.create_revenue(&entry("c1", 100, "2025-01-10")).await.unwrap();
        service.create_revenue(&entry("c1", 200, "2025-01-20")).await.unwrap();
        service.create_revenue(&entry("c1", 300, "2025-02-01")).await.unwrap();

        let entries = service
            .get_revenue_by_date_range("2025-01-10".parse().unwrap(), "2025-01-20".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[tokio::test]
    async fn test_profit_loss_arithmetic() {
        let (gateway, service) = service();
        // 1000.00 revenue, 400.00 expenses
        service.create_revenue(&entry("c1", 60_000, "2025-01-10")).await.unwrap();
        service.create_revenue(&entry("c1", 40_000, "2025-01-11")).await.unwrap();
        seed_expense(&gateway, "c1", 40_000, "2025-01-12");
        // A different car's ledger must not bleed in
        seed_expense(&gateway, "c2", 77_000, "2025-01-12");

        let pl = service.get_profit_loss("c1", None, None).await.unwrap();
        assert_eq!(pl.total_revenue.cents(), 100_000);
        assert_eq!(pl.total_expenses.cents(), 40_000);
        assert_eq!(pl.profit.cents(), 60_000);
        assert!((pl.profit_margin - 60.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_profit_loss_respects_date_range() {
        let (gateway, service) = service();
        service.create_revenue(&entry("c1", 10_000, "2025-01-10")).await.unwrap();
        service.create_revenue(&entry("c1", 99_000, "2024-06-01")).await.unwrap();
        seed_expense(&gateway, "c1", 4_000, "2025-01-15");
        seed_expense(&gateway, "c1", 88_000, "2024-06-02");

        let pl = service
            .get_profit_loss(
                "c1",
                Some("2025-01-01".parse().unwrap()),
                Some("2025-01-31".parse().unwrap()),
            )
            .await
            .unwrap();
        assert_eq!(pl.total_revenue.cents(), 10_000);
        assert_eq!(pl.total_expenses.cents(), 4_000);
        assert_eq!(pl.profit.cents(), 6_000);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (_gateway, service) = service();
        let created = service.create_revenue(&entry("c1", 100, "2025-01-10")).await.unwrap();

        let updated = service
            .update_revenue(
                &created.id,
                &RevenuePatch {
                    amount_cents: Some(150),
                    ..RevenuePatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.amount_cents, 150);
        assert_eq!(updated.id, created.id);

        service.delete_revenue(&created.id).await.unwrap();
        assert!(service.get_revenue_by_id(&created.id).await.unwrap().is_none());
    }
}
