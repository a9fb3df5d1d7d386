//! # Row Filter Builder
//!
//! A small query builder shared by every gateway implementation.
//!
//! ## One Filter, Two Evaluators
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     How Filters Are Used                                │
//! │                                                                         │
//! │  Filter::new().eq("car_id", id).order_desc("revenue_date").limit(10)   │
//! │       │                                                                 │
//! │       ├──► RestGateway:   ?car_id=eq.<id>&order=revenue_date.desc      │
//! │       │                   &limit=10                                     │
//! │       │                                                                 │
//! │       └──► MemoryGateway: rows.filter(matches).sort().truncate(10)     │
//! │                                                                         │
//! │  Both paths MUST agree, so store tests over the in-memory backend      │
//! │  exercise the same query semantics production sees.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Comparison semantics: numbers compare numerically, strings
//! lexicographically (ISO-8601 dates are strings, so date ranges come out
//! right), anything else only supports equality.

use std::cmp::Ordering;

use serde_json::Value;

// =============================================================================
// Conditions
// =============================================================================

/// One column condition.
#[derive(Debug, Clone)]
enum Cond {
    Eq(String, Value),
    Gte(String, Value),
    Lte(String, Value),
    In(String, Vec<Value>),
    IsNull(String),
}

/// Sort directive.
#[derive(Debug, Clone)]
struct Order {
    column: String,
    descending: bool,
}

// =============================================================================
// Filter
// =============================================================================

/// A set of row conditions plus ordering and a row cap.
///
/// Built fluently and consumed by a gateway implementation.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    conds: Vec<Cond>,
    order: Option<Order>,
    limit: Option<usize>,
}

impl Filter {
    /// Creates an empty filter (matches every row).
    pub fn new() -> Self {
        Filter::default()
    }

    /// Requires `column == value`.
    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.conds.push(Cond::Eq(column.to_string(), value.into()));
        self
    }

    /// Requires `column >= value`.
    pub fn gte(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.conds.push(Cond::Gte(column.to_string(), value.into()));
        self
    }

    /// Requires `column <= value`.
    pub fn lte(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.conds.push(Cond::Lte(column.to_string(), value.into()));
        self
    }

    /// Requires `column` to be one of `values`.
    pub fn is_in(mut self, column: &str, values: Vec<Value>) -> Self {
        self.conds.push(Cond::In(column.to_string(), values));
        self
    }

    /// Requires `column` to be null or absent.
    pub fn is_null(mut self, column: &str) -> Self {
        self.conds.push(Cond::IsNull(column.to_string()));
        self
    }

    /// Sorts ascending by `column`.
    pub fn order_asc(mut self, column: &str) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            descending: false,
        });
        self
    }

    /// Sorts descending by `column` (newest-first for timestamps).
    pub fn order_desc(mut self, column: &str) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            descending: true,
        });
        self
    }

    /// Caps the number of returned rows.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    // =========================================================================
    // In-Memory Evaluation
    // =========================================================================

    /// Whether a row satisfies every condition.
    pub fn matches(&self, row: &Value) -> bool {
        self.conds.iter().all(|cond| match cond {
            Cond::Eq(column, value) => row.get(column) == Some(value),
            Cond::Gte(column, value) => row
                .get(column)
                .and_then(|v| compare(v, value))
                .map(|ord| ord != Ordering::Less)
                .unwrap_or(false),
            Cond::Lte(column, value) => row
                .get(column)
                .and_then(|v| compare(v, value))
                .map(|ord| ord != Ordering::Greater)
                .unwrap_or(false),
            Cond::In(column, values) => row
                .get(column)
                .map(|v| values.contains(v))
                .unwrap_or(false),
            Cond::IsNull(column) => match row.get(column) {
                None | Some(Value::Null) => true,
                Some(_) => false,
            },
        })
    }

    /// Filters, sorts, and truncates `rows` per this filter.
    pub fn apply(&self, rows: Vec<Value>) -> Vec<Value> {
        let mut rows: Vec<Value> = rows.into_iter().filter(|row| self.matches(row)).collect();

        if let Some(order) = &self.order {
            rows.sort_by(|a, b| {
                let ord = match (a.get(&order.column), b.get(&order.column)) {
                    (Some(x), Some(y)) => compare(x, y).unwrap_or(Ordering::Equal),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };
                if order.descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }

        if let Some(limit) = self.limit {
            rows.truncate(limit);
        }

        rows
    }

    // =========================================================================
    // Wire Rendering
    // =========================================================================

    /// Renders the filter as query pairs in the backend's REST dialect.
    ///
    /// ```text
    /// eq      → column=eq.<value>
    /// gte/lte → column=gte.<value> / column=lte.<value>
    /// in      → column=in.(a,b,c)
    /// is null → column=is.null
    /// order   → order=column.asc|desc
    /// limit   → limit=<n>
    /// ```
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.conds.len() + 2);

        for cond in &self.conds {
            match cond {
                Cond::Eq(column, value) => {
                    pairs.push((column.clone(), format!("eq.{}", literal(value))));
                }
                Cond::Gte(column, value) => {
                    pairs.push((column.clone(), format!("gte.{}", literal(value))));
                }
                Cond::Lte(column, value) => {
                    pairs.push((column.clone(), format!("lte.{}", literal(value))));
                }
                Cond::In(column, values) => {
                    let list = values
                        .iter()
                        .map(literal)
                        .collect::<Vec<_>>()
                        .join(",");
                    pairs.push((column.clone(), format!("in.({})", list)));
                }
                Cond::IsNull(column) => {
                    pairs.push((column.clone(), "is.null".to_string()));
                }
            }
        }

        if let Some(order) = &self.order {
            let direction = if order.descending { "desc" } else { "asc" };
            pairs.push(("order".to_string(), format!("{}.{}", order.column, direction)));
        }

        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }

        pairs
    }
}

// =============================================================================
// Value Helpers
// =============================================================================

/// Orders two JSON scalars, when they are comparable.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            x.as_f64().and_then(|x| y.as_f64().and_then(|y| x.partial_cmp(&y)))
        }
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Renders a JSON scalar as a bare wire literal (no quotes).
fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows() -> Vec<Value> {
        vec![
            json!({"id": "a", "status": "available", "amount_cents": 100, "revenue_date": "2025-01-10", "trip_id": null}),
            json!({"id": "b", "status": "active", "amount_cents": 300, "revenue_date": "2025-02-20", "trip_id": "t1"}),
            json!({"id": "c", "status": "available", "amount_cents": 200, "revenue_date": "2025-03-05"}),
        ]
    }

    #[test]
    fn test_eq_filter() {
        let out = Filter::new().eq("status", "available").apply(rows());
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|r| r["status"] == "available"));
    }

    #[test]
    fn test_date_range_filter() {
        // ISO dates as strings: lexicographic order is chronological order
        let out = Filter::new()
            .gte("revenue_date", "2025-01-15")
            .lte("revenue_date", "2025-03-01")
            .apply(rows());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["id"], "b");
    }

    #[test]
    fn test_numeric_range_filter() {
        let out = Filter::new().gte("amount_cents", 150).apply(rows());
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_is_null_matches_null_and_absent() {
        let out = Filter::new().is_null("trip_id").apply(rows());
        let ids: Vec<_> = out.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_is_in_filter() {
        let out = Filter::new()
            .is_in("id", vec![json!("a"), json!("c")])
            .apply(rows());
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_order_desc_and_limit() {
        let out = Filter::new()
            .order_desc("revenue_date")
            .limit(2)
            .apply(rows());
        let ids: Vec<_> = out.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["c", "b"]);
    }

    #[test]
    fn test_query_pair_rendering() {
        let pairs = Filter::new()
            .eq("car_id", "c1")
            .gte("expense_date", "2025-01-01")
            .is_null("unassigned_at")
            .is_in("id", vec![json!("a"), json!("b")])
            .order_desc("created_at")
            .limit(10)
            .to_query_pairs();

        assert_eq!(
            pairs,
            vec![
                ("car_id".to_string(), "eq.c1".to_string()),
                ("expense_date".to_string(), "gte.2025-01-01".to_string()),
                ("unassigned_at".to_string(), "is.null".to_string()),
                ("id".to_string(), "in.(a,b)".to_string()),
                ("order".to_string(), "created_at.desc".to_string()),
                ("limit".to_string(), "10".to_string()),
            ]
        );
    }
}
