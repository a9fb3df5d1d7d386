//! # Expense Service
//!
//! Ledger operations for car expenses: the mirror image of the revenue
//! service over the `car_expense` table. Totals are aggregated remotely,
//! never from the store cache.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

use drivelink_core::{validation, CarExpense, ExpenseCategory, Money};
use drivelink_gateway::{Filter, Gateway, GatewayError};

use crate::error::{ClientError, ClientResult};
use crate::services::{decode, decode_rows, sum_amounts, tables};

// =============================================================================
// Inputs
// =============================================================================

/// Input for [`ExpenseService::create_expense`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExpense {
    pub car_id: String,
    pub amount_cents: i64,
    pub category: ExpenseCategory,
    pub expense_date: NaiveDate,
    pub description: Option<String>,
    pub receipt_url: Option<String>,
    pub created_by: String,
}

/// Fields that [`ExpenseService::update_expense`] may change. `None` = unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpensePatch {
    pub amount_cents: Option<i64>,
    pub category: Option<ExpenseCategory>,
    pub expense_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub receipt_url: Option<String>,
}

// =============================================================================
// Expense Service
// =============================================================================

/// Stateless expense-ledger operations over the gateway.
#[derive(Clone)]
pub struct ExpenseService {
    gateway: Arc<dyn Gateway>,
}

impl ExpenseService {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        ExpenseService { gateway }
    }

    /// Every expense entry of a car, most recent ledger date first.
    pub async fn get_car_expenses(&self, car_id: &str) -> ClientResult<Vec<CarExpense>> {
        let rows = self
            .gateway
            .select(
                tables::CAR_EXPENSE,
                Filter::new().eq("car_id", car_id).order_desc("expense_date"),
            )
            .await?;
        decode_rows(rows)
    }

    /// One entry, or `None` when the id is unknown.
    pub async fn get_expense_by_id(&self, expense_id: &str) -> ClientResult<Option<CarExpense>> {
        match self
            .gateway
            .select_single(tables::CAR_EXPENSE, Filter::new().eq("id", expense_id))
            .await
        {
            Ok(row) => Ok(Some(decode(row)?)),
            Err(GatewayError::NotFound { .. }) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Appends a ledger entry.
    pub async fn create_expense(&self, new_expense: &NewExpense) -> ClientResult<CarExpense> {
        validation::validate_amount_cents(new_expense.amount_cents)?;

        debug!(car_id = %new_expense.car_id, amount_cents = new_expense.amount_cents, "create_expense");

        let row = json!({
            "car_id": new_expense.car_id,
            "amount_cents": new_expense.amount_cents,
            "category": new_expense.category,
            "expense_date": new_expense.expense_date,
            "description": new_expense.description,
            "receipt_url": new_expense.receipt_url,
            "created_at": Utc::now(),
            "created_by": new_expense.created_by,
        });

        let stored = self.gateway.insert(tables::CAR_EXPENSE, row).await?;
        decode(stored)
    }

    /// Applies a patch and returns the entry as stored.
    pub async fn update_expense(
        &self,
        expense_id: &str,
        patch: &ExpensePatch,
    ) -> ClientResult<CarExpense> {
        let mut fields = Map::new();
        if let Some(amount_cents) = patch.amount_cents {
            validation::validate_amount_cents(amount_cents)?;
            fields.insert("amount_cents".to_string(), json!(amount_cents));
        }
        if let Some(category) = patch.category {
            fields.insert("category".to_string(), json!(category));
        }
        if let Some(expense_date) = patch.expense_date {
            fields.insert("expense_date".to_string(), json!(expense_date));
        }
        if let Some(description) = &patch.description {
            fields.insert("description".to_string(), json!(description));
        }
        if let Some(receipt_url) = &patch.receipt_url {
            fields.insert("receipt_url".to_string(), json!(receipt_url));
        }

        let rows = self
            .gateway
            .update(
                tables::CAR_EXPENSE,
                Filter::new().eq("id", expense_id),
                Value::Object(fields),
            )
            .await?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::Query(format!("Expense entry not found: {}", expense_id)))?;
        decode(row)
    }

    /// Removes a ledger entry.
    pub async fn delete_expense(&self, expense_id: &str) -> ClientResult<()> {
        self.gateway
            .delete(tables::CAR_EXPENSE, Filter::new().eq("id", expense_id))
            .await?;
        Ok(())
    }

    /// Entries across all cars inside an inclusive date range.
    pub async fn get_expenses_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ClientResult<Vec<CarExpense>> {
        let rows = self
            .gateway
            .select(
                tables::CAR_EXPENSE,
                Filter::new()
                    .gte("expense_date", start.to_string())
                    .lte("expense_date", end.to_string())
                    .order_desc("expense_date"),
            )
            .await?;
        decode_rows(rows)
    }

    /// Remote aggregation of a car's lifetime expenses.
    pub async fn get_total_expenses(&self, car_id: &str) -> ClientResult<Money> {
        let rows = self
            .gateway
            .select(tables::CAR_EXPENSE, Filter::new().eq("car_id", car_id))
            .await?;
        Ok(Money::from_cents(sum_amounts(&rows)))
    }

    /// The latest entries across all cars, newest logged first.
    pub async fn get_recent_expenses(&self, limit: usize) -> ClientResult<Vec<CarExpense>> {
        let rows = self
            .gateway
            .select(
                tables::CAR_EXPENSE,
                Filter::new().order_desc("created_at").limit(limit),
            )
            .await?;
        decode_rows(rows)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use drivelink_gateway::MemoryGateway;

    fn service() -> (Arc<MemoryGateway>, ExpenseService) {
        let gateway = Arc::new(MemoryGateway::new());
        let service = ExpenseService::new(gateway.clone());
        (gateway, service)
    }

    fn entry(car_id: &str, cents: i64, date: &str) -> NewExpense {
        NewExpense {
            car_id: car_id.to_string(),
            amount_cents: cents,
            category: ExpenseCategory::Fuel,
            expense_date: date.parse().unwrap(),
            description: Some("refuel".to_string()),
            receipt_url: None,
            created_by: "user-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_list_sorted_by_ledger_date() {
        let (_gateway, service) = service();
        service.create_expense(&entry("c1", 100, "2025-01-10")).await.unwrap();
        service.create_expense(&entry("c1", 200, "2025-02-20")).await.unwrap();
        service.create_expense(&entry("c2", 300, "2025-02-21")).await.unwrap();

        let entries = service.get_car_expenses("c1").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].expense_date.to_string(), "2025-02-20");
    }

    #[tokio::test]
    async fn test_total_expenses_sums_remote_rows() {
        let (_gateway, service) = service();
        service.create_expense(&entry("c1", 1_500, "2025-01-10")).await.unwrap();
        service.create_expense(&entry("c1", 2_500, "2025-01-11")).await.unwrap();

        let total = service.get_total_expenses("c1").await.unwrap();
        assert_eq!(total.cents(), 4_000);
    }

    #[tokio::test]
    async fn test_update_category_and_amount() {
        let (_gateway, service) = service();
        let created = service.create_expense(&entry("c1", 900, "2025-01-10")).await.unwrap();

        let updated = service
            .update_expense(
                &created.id,
                &ExpensePatch {
                    amount_cents: Some(1_200),
                    category: Some(ExpenseCategory::Repair),
                    ..ExpensePatch::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.amount_cents, 1_200);
        assert_eq!(updated.category, ExpenseCategory::Repair);
        assert_eq!(updated.description.as_deref(), Some("refuel"));
    }

    #[tokio::test]
    async fn test_recent_expenses_limit() {
        let (_gateway, service) = service();
        for i in 0..5 {
            service
                .create_expense(&entry("c1", 100 + i, "2025-01-10"))
                .await
                .unwrap();
        }

        let recent = service.get_recent_expenses(3).await.unwrap();
        assert_eq!(recent.len(), 3);
    }
}
