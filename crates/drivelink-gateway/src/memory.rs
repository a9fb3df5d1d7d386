//! # In-Memory Gateway
//!
//! A complete `Gateway` implementation over plain HashMaps, used by store
//! tests and local development. It evaluates the same [`Filter`] semantics
//! the REST adapter renders to the wire, so tests against this backend
//! exercise the query behavior production sees.
//!
//! ## Fault Injection
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  gateway.fail_table("roles");                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  every select/insert/update/delete on "roles" now errors, while        │
//! │  other tables keep working → partial-failure paths become testable     │
//! │  (e.g. "role fetch fails during login leaves no partial session")      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::auth::{AuthUser, Session, SignIn};
use crate::error::{GatewayError, GatewayResult};
use crate::filter::Filter;
use crate::Gateway;

/// A registered auth identity.
#[derive(Debug, Clone)]
struct Account {
    user_id: String,
    email: String,
    password: String,
}

/// Gateway implementation holding every table in memory.
#[derive(Default)]
pub struct MemoryGateway {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    accounts: Mutex<Vec<Account>>,
    session: Mutex<Option<Session>>,
    failing_tables: Mutex<HashSet<String>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        MemoryGateway::default()
    }

    // =========================================================================
    // Test Support
    // =========================================================================

    /// Makes every subsequent operation on `table` fail.
    pub fn fail_table(&self, table: &str) {
        self.failing_tables
            .lock()
            .expect("failure set poisoned")
            .insert(table.to_string());
    }

    /// Lets `table` work again after [`fail_table`](Self::fail_table).
    pub fn restore_table(&self, table: &str) {
        self.failing_tables
            .lock()
            .expect("failure set poisoned")
            .remove(table);
    }

    /// Preloads rows into a table.
    pub fn seed(&self, table: &str, rows: Vec<Value>) {
        self.tables
            .lock()
            .expect("table store poisoned")
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    /// Snapshot of a table's rows, for assertions.
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .lock()
            .expect("table store poisoned")
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    fn check_available(&self, table: &str) -> GatewayResult<()> {
        if self
            .failing_tables
            .lock()
            .expect("failure set poisoned")
            .contains(table)
        {
            return Err(GatewayError::QueryFailed {
                status: 503,
                message: format!("{} is unavailable", table),
            });
        }
        Ok(())
    }

    fn issue_session(&self, user_id: &str) -> Session {
        let session = Session {
            user_id: user_id.to_string(),
            access_token: Uuid::new_v4().to_string(),
            refresh_token: Some(Uuid::new_v4().to_string()),
            expires_at: Utc::now() + Duration::hours(1),
        };
        *self.session.lock().expect("session poisoned") = Some(session.clone());
        session
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn sign_in(&self, email: &str, password: &str) -> GatewayResult<SignIn> {
        let account = {
            let accounts = self.accounts.lock().expect("accounts poisoned");
            accounts
                .iter()
                .find(|a| a.email == email && a.password == password)
                .cloned()
        };

        let account = account.ok_or_else(|| {
            GatewayError::AuthFailed("Invalid login credentials".to_string())
        })?;

        let session = self.issue_session(&account.user_id);
        Ok(SignIn {
            user: AuthUser {
                id: account.user_id,
                email: account.email,
            },
            session,
        })
    }

    async fn sign_up(&self, email: &str, password: &str, _metadata: Value) -> GatewayResult<SignIn> {
        let user_id = {
            let mut accounts = self.accounts.lock().expect("accounts poisoned");
            if accounts.iter().any(|a| a.email == email) {
                return Err(GatewayError::AuthFailed(
                    "User already registered".to_string(),
                ));
            }

            let user_id = Uuid::new_v4().to_string();
            accounts.push(Account {
                user_id: user_id.clone(),
                email: email.to_string(),
                password: password.to_string(),
            });
            user_id
        };

        let session = self.issue_session(&user_id);
        Ok(SignIn {
            user: AuthUser {
                id: user_id,
                email: email.to_string(),
            },
            session,
        })
    }

    async fn sign_out(&self) -> GatewayResult<()> {
        *self.session.lock().expect("session poisoned") = None;
        Ok(())
    }

    async fn current_user(&self) -> GatewayResult<Option<AuthUser>> {
        let user_id = {
            let session = self.session.lock().expect("session poisoned");
            session.as_ref().map(|s| s.user_id.clone())
        };

        let Some(user_id) = user_id else {
            return Ok(None);
        };

        let accounts = self.accounts.lock().expect("accounts poisoned");
        Ok(accounts.iter().find(|a| a.user_id == user_id).map(|a| AuthUser {
            id: a.user_id.clone(),
            email: a.email.clone(),
        }))
    }

    async fn select(&self, table: &str, filter: Filter) -> GatewayResult<Vec<Value>> {
        self.check_available(table)?;

        let rows = self.rows(table);
        Ok(filter.apply(rows))
    }

    async fn insert(&self, table: &str, mut row: Value) -> GatewayResult<Value> {
        self.check_available(table)?;

        // The remote store fills in the primary key when the caller omits it
        if let Some(object) = row.as_object_mut() {
            object
                .entry("id")
                .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        } else {
            return Err(GatewayError::InvalidPayload(
                "insert expects a JSON object".to_string(),
            ));
        }

        self.tables
            .lock()
            .expect("table store poisoned")
            .entry(table.to_string())
            .or_default()
            .push(row.clone());

        Ok(row)
    }

    async fn update(&self, table: &str, filter: Filter, patch: Value) -> GatewayResult<Vec<Value>> {
        self.check_available(table)?;

        let patch = patch
            .as_object()
            .ok_or_else(|| GatewayError::InvalidPayload("patch expects a JSON object".to_string()))?
            .clone();

        let mut tables = self.tables.lock().expect("table store poisoned");
        let rows = tables.entry(table.to_string()).or_default();

        let mut updated = Vec::new();
        for row in rows.iter_mut() {
            if filter.matches(row) {
                if let Some(object) = row.as_object_mut() {
                    for (key, value) in &patch {
                        object.insert(key.clone(), value.clone());
                    }
                }
                updated.push(row.clone());
            }
        }

        Ok(updated)
    }

    async fn delete(&self, table: &str, filter: Filter) -> GatewayResult<()> {
        self.check_available(table)?;

        let mut tables = self.tables.lock().expect("table store poisoned");
        if let Some(rows) = tables.get_mut(table) {
            rows.retain(|row| !filter.matches(row));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let gateway = MemoryGateway::new();

        let created = gateway
            .sign_up("m@x.com", "secret1", json!({}))
            .await
            .unwrap();
        assert_eq!(created.user.email, "m@x.com");

        let signin = gateway.sign_in("m@x.com", "secret1").await.unwrap();
        assert_eq!(signin.user.id, created.user.id);

        let err = gateway.sign_in("m@x.com", "wrong").await.unwrap_err();
        assert!(matches!(err, GatewayError::AuthFailed(_)));
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let gateway = MemoryGateway::new();
        gateway.sign_up("m@x.com", "secret1", json!({})).await.unwrap();

        let err = gateway
            .sign_up("m@x.com", "other66", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::AuthFailed(_)));
    }

    #[tokio::test]
    async fn test_current_user_follows_session() {
        let gateway = MemoryGateway::new();
        assert!(gateway.current_user().await.unwrap().is_none());

        gateway.sign_up("m@x.com", "secret1", json!({})).await.unwrap();
        assert!(gateway.current_user().await.unwrap().is_some());

        gateway.sign_out().await.unwrap();
        assert!(gateway.current_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_assigns_id() {
        let gateway = MemoryGateway::new();
        let row = gateway
            .insert("cars", json!({ "plate_no": "AA-12345" }))
            .await
            .unwrap();

        assert!(row["id"].as_str().is_some());
        assert_eq!(gateway.rows("cars").len(), 1);
    }

    #[tokio::test]
    async fn test_update_patches_matching_rows() {
        let gateway = MemoryGateway::new();
        gateway.seed(
            "cars",
            vec![
                json!({ "id": "a", "status": "available" }),
                json!({ "id": "b", "status": "active" }),
            ],
        );

        let updated = gateway
            .update(
                "cars",
                Filter::new().eq("id", "a"),
                json!({ "status": "maintenance" }),
            )
            .await
            .unwrap();

        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0]["status"], "maintenance");
        // The other row is untouched
        let rows = gateway.rows("cars");
        assert_eq!(rows.iter().find(|r| r["id"] == "b").unwrap()["status"], "active");
    }

    #[tokio::test]
    async fn test_select_single_errors_on_empty() {
        let gateway = MemoryGateway::new();
        let err = gateway
            .select_single("cars", Filter::new().eq("id", "missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let gateway = MemoryGateway::new();
        gateway.seed("roles", vec![json!({ "id": "r1" })]);

        gateway.fail_table("roles");
        assert!(gateway.select("roles", Filter::new()).await.is_err());
        // Other tables keep working
        assert!(gateway.select("cars", Filter::new()).await.is_ok());

        gateway.restore_table("roles");
        assert!(gateway.select("roles", Filter::new()).await.is_ok());
    }
}
