//! # REST Gateway Adapter
//!
//! HTTP adapter for the hosted backend: auth endpoints under `/auth/v1`,
//! row storage under `/rest/v1` in the PostgREST dialect.
//!
//! ## Session Handling
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Token Lifecycle                                      │
//! │                                                                         │
//! │  sign_in ──► { access_token, refresh_token, expires_at } stored here   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  every data call: expired? ──► POST token?grant_type=refresh_token     │
//! │       │                        (transparent to callers)                │
//! │       ▼                                                                 │
//! │  Authorization: Bearer <access_token>   (or the publishable key        │
//! │                                          when signed out)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No retries, no timeouts at this layer: a failure is returned to the
//! calling service as-is, and a hung request stays hung.

use std::sync::RwLock;

use chrono::{Duration, Utc};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

use async_trait::async_trait;

use crate::auth::{AuthUser, Session, SignIn};
use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::filter::Filter;
use crate::Gateway;

/// Gateway implementation backed by the hosted backend's REST surface.
pub struct RestGateway {
    config: GatewayConfig,
    http: Client,
    session: RwLock<Option<Session>>,
}

impl RestGateway {
    /// Creates a gateway for the given endpoint.
    pub fn new(config: GatewayConfig) -> Self {
        RestGateway {
            config,
            http: Client::new(),
            session: RwLock::new(None),
        }
    }

    /// Creates a gateway from `DRIVELINK_GATEWAY_*` environment variables.
    pub fn from_env() -> GatewayResult<Self> {
        Ok(RestGateway::new(GatewayConfig::from_env()?))
    }

    /// Returns a copy of the active session, if any.
    pub fn active_session(&self) -> Option<Session> {
        self.session.read().expect("session lock poisoned").clone()
    }

    /// Restores a session persisted by a previous run.
    ///
    /// Used on cold start before `current_user` so the stored bearer token
    /// is sent instead of the anonymous key.
    pub fn restore_session(&self, session: Session) {
        *self.session.write().expect("session lock poisoned") = Some(session);
    }

    fn set_session(&self, session: Option<Session>) {
        *self.session.write().expect("session lock poisoned") = session;
    }

    /// The bearer value for the next request: session token when signed in,
    /// otherwise the publishable key.
    fn bearer(&self) -> String {
        self.session
            .read()
            .expect("session lock poisoned")
            .as_ref()
            .map(|s| s.access_token.clone())
            .unwrap_or_else(|| self.config.api_key.clone())
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.config.base_url, path)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.config.base_url, table)
    }

    // =========================================================================
    // Session Refresh
    // =========================================================================

    /// Swaps an expired access token for a fresh one, when possible.
    ///
    /// Runs before every data call. A session without a refresh token is
    /// left in place; the backend will answer 401 and the caller sees that.
    async fn refresh_if_expired(&self) -> GatewayResult<()> {
        let refresh_token = {
            let session = self.session.read().expect("session lock poisoned");
            match session.as_ref() {
                Some(s) if s.is_expired(Utc::now()) => s.refresh_token.clone(),
                _ => None,
            }
        };

        let Some(refresh_token) = refresh_token else {
            return Ok(());
        };

        debug!("Access token expired, refreshing session");
        let body = self
            .auth_post(
                "token?grant_type=refresh_token",
                json!({ "refresh_token": refresh_token }),
            )
            .await?;
        let signin = parse_sign_in(&body)?;
        self.set_session(Some(signin.session));

        Ok(())
    }

    // =========================================================================
    // Request Helpers
    // =========================================================================

    /// POSTs to an auth endpoint and returns the parsed body.
    async fn auth_post(&self, path: &str, body: Value) -> GatewayResult<Value> {
        let response = self
            .http
            .post(self.auth_url(path))
            .header("apikey", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        if !status.is_success() {
            return Err(GatewayError::AuthFailed(auth_message(&body, status.as_u16())));
        }

        Ok(body)
    }

    /// Turns a non-success data response into a `QueryFailed` error.
    async fn query_error(response: reqwest::Response) -> GatewayError {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        GatewayError::QueryFailed { status, message }
    }
}

// =============================================================================
// Payload Parsing
// =============================================================================

/// Extracts a user-facing message from an auth error body.
fn auth_message(body: &Value, status: u16) -> String {
    for key in ["error_description", "msg", "message", "error"] {
        if let Some(message) = body.get(key).and_then(Value::as_str) {
            return message.to_string();
        }
    }
    format!("auth request rejected with status {}", status)
}

/// Parses a token-grant response into a SignIn.
fn parse_sign_in(body: &Value) -> GatewayResult<SignIn> {
    let user = body
        .get("user")
        .ok_or_else(|| GatewayError::InvalidPayload("missing user".to_string()))?;
    let user = AuthUser {
        id: string_field(user, "id")?,
        email: string_field(user, "email")?,
    };

    let access_token = string_field(body, "access_token")?;
    let refresh_token = body
        .get("refresh_token")
        .and_then(Value::as_str)
        .map(str::to_string);
    let expires_in = body.get("expires_in").and_then(Value::as_i64).unwrap_or(3600);

    Ok(SignIn {
        session: Session {
            user_id: user.id.clone(),
            access_token,
            refresh_token,
            expires_at: Utc::now() + Duration::seconds(expires_in),
        },
        user,
    })
}

fn string_field(value: &Value, key: &str) -> GatewayResult<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| GatewayError::InvalidPayload(format!("missing {}", key)))
}

// =============================================================================
// Gateway Implementation
// =============================================================================

#[async_trait]
impl Gateway for RestGateway {
    async fn sign_in(&self, email: &str, password: &str) -> GatewayResult<SignIn> {
        debug!(email = %email, "Gateway sign-in");

        let body = self
            .auth_post(
                "token?grant_type=password",
                json!({ "email": email, "password": password }),
            )
            .await?;
        let signin = parse_sign_in(&body)?;
        self.set_session(Some(signin.session.clone()));

        Ok(signin)
    }

    async fn sign_up(&self, email: &str, password: &str, metadata: Value) -> GatewayResult<SignIn> {
        debug!(email = %email, "Gateway sign-up");

        let body = self
            .auth_post(
                "signup",
                json!({ "email": email, "password": password, "data": metadata }),
            )
            .await?;
        // Instances with email confirmation enabled answer without a session;
        // this client requires immediate sessions.
        let signin = parse_sign_in(&body).map_err(|_| {
            GatewayError::AuthFailed("sign-up did not return a session".to_string())
        })?;
        self.set_session(Some(signin.session.clone()));

        Ok(signin)
    }

    async fn sign_out(&self) -> GatewayResult<()> {
        let Some(session) = self.active_session() else {
            return Ok(());
        };

        let response = self
            .http
            .post(self.auth_url("logout"))
            .header("apikey", &self.config.api_key)
            .header("Authorization", format!("Bearer {}", session.access_token))
            .send()
            .await?;

        // 401 means the token is already dead, which is the goal state.
        if !response.status().is_success() && response.status().as_u16() != 401 {
            return Err(Self::query_error(response).await);
        }

        self.set_session(None);
        Ok(())
    }

    async fn current_user(&self) -> GatewayResult<Option<AuthUser>> {
        self.refresh_if_expired().await?;

        let Some(session) = self.active_session() else {
            return Ok(None);
        };

        let response = self
            .http
            .get(self.auth_url("user"))
            .header("apikey", &self.config.api_key)
            .header("Authorization", format!("Bearer {}", session.access_token))
            .send()
            .await?;

        if response.status().as_u16() == 401 {
            warn!("Stored session rejected by the auth subsystem");
            self.set_session(None);
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::query_error(response).await);
        }

        let body: Value = response.json().await?;
        Ok(Some(AuthUser {
            id: string_field(&body, "id")?,
            email: string_field(&body, "email")?,
        }))
    }

    async fn select(&self, table: &str, filter: Filter) -> GatewayResult<Vec<Value>> {
        self.refresh_if_expired().await?;
        debug!(table = %table, "Gateway select");

        let response = self
            .http
            .get(self.rest_url(table))
            .query(&filter.to_query_pairs())
            .header("apikey", &self.config.api_key)
            .header("Authorization", format!("Bearer {}", self.bearer()))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::query_error(response).await);
        }

        let rows: Vec<Value> = response.json().await?;
        debug!(table = %table, count = rows.len(), "Select returned rows");
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Value) -> GatewayResult<Value> {
        self.refresh_if_expired().await?;
        debug!(table = %table, "Gateway insert");

        let response = self
            .http
            .post(self.rest_url(table))
            .header("apikey", &self.config.api_key)
            .header("Authorization", format!("Bearer {}", self.bearer()))
            .header("Prefer", "return=representation")
            .json(&json!([row]))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::query_error(response).await);
        }

        let mut rows: Vec<Value> = response.json().await?;
        if rows.is_empty() {
            return Err(GatewayError::InvalidPayload(
                "insert returned no representation".to_string(),
            ));
        }
        Ok(rows.remove(0))
    }

    async fn update(&self, table: &str, filter: Filter, patch: Value) -> GatewayResult<Vec<Value>> {
        self.refresh_if_expired().await?;
        debug!(table = %table, "Gateway update");

        let response = self
            .http
            .patch(self.rest_url(table))
            .query(&filter.to_query_pairs())
            .header("apikey", &self.config.api_key)
            .header("Authorization", format!("Bearer {}", self.bearer()))
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::query_error(response).await);
        }

        let rows: Vec<Value> = response.json().await?;
        Ok(rows)
    }

    async fn delete(&self, table: &str, filter: Filter) -> GatewayResult<()> {
        self.refresh_if_expired().await?;
        debug!(table = %table, "Gateway delete");

        let response = self
            .http
            .delete(self.rest_url(table))
            .query(&filter.to_query_pairs())
            .header("apikey", &self.config.api_key)
            .header("Authorization", format!("Bearer {}", self.bearer()))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::query_error(response).await);
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

    #[test]
    fn test_parse_sign_in() {
        let body = json!({
            "access_token": "tok",
            "refresh_token": "ref",
            "expires_in": 3600,
            "user": { "id": "u1", "email": "m@x.com" }
        });

        let signin = parse_sign_in(&body).unwrap();
        assert_eq!(signin.user.id, "u1");
        assert_eq!(signin.user.email, "m@x.com");
        assert_eq!(signin.session.user_id, "u1");
        assert_eq!(signin.session.access_token, "tok");
        assert_eq!(signin.session.refresh_token.as_deref(), Some("ref"));
        assert!(!signin.session.is_expired(Utc::now()));
    }

    #[test]
    fn test_parse_sign_in_missing_token() {
        let body = json!({ "user": { "id": "u1", "email": "m@x.com" } });
        assert!(parse_sign_in(&body).is_err());
    }

    #[test]
    fn test_auth_message_fallbacks() {
        let body = json!({ "error_description": "Invalid login credentials" });
        assert_eq!(auth_message(&body, 400), "Invalid login credentials");

        let body = json!({ "msg": "User already registered" });
        assert_eq!(auth_message(&body, 422), "User already registered");

        let body = Value::Null;
        assert_eq!(auth_message(&body, 500), "auth request rejected with status 500");
    }
}
