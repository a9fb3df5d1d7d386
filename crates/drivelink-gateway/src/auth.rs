//! Authentication payload types.
//!
//! These mirror what the hosted auth subsystem returns on sign-in/sign-up.
//! The session is owned by the gateway implementation; the auth store caches
//! a copy so it can restore "signed in" across process restarts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The authenticated identity, as the auth subsystem reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
}

/// An issued session: bearer token plus expiry bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub access_token: String,
    /// Present when the backend supports transparent refresh.
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Whether the access token has passed its expiry.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// The result of a successful sign-in or sign-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignIn {
    pub user: AuthUser,
    pub session: Session,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        let session = Session {
            user_id: "u1".to_string(),
            access_token: "tok".to_string(),
            refresh_token: None,
            expires_at: now + Duration::hours(1),
        };

        assert!(!session.is_expired(now));
        assert!(session.is_expired(now + Duration::hours(2)));
    }
}
