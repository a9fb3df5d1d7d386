//! Gateway endpoint configuration.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Explicit [`GatewayConfig::new`] (tests, previews)
//! 2. Environment variables (`DRIVELINK_*`)
//!
//! The publishable API key is not a secret: it identifies the project and is
//! shipped inside the app; row-level security on the backend does the real
//! gatekeeping.

use crate::error::{GatewayError, GatewayResult};

/// Connection settings for the hosted backend.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Project base URL, e.g. `https://fleet.example.dev` (no trailing slash).
    pub base_url: String,

    /// Publishable (anon) API key sent with every request.
    pub api_key: String,
}

impl GatewayConfig {
    /// Creates a config from explicit values.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        GatewayConfig {
            base_url,
            api_key: api_key.into(),
        }
    }

    /// Reads the config from the environment.
    ///
    /// ## Environment Variables
    /// - `DRIVELINK_GATEWAY_URL`: project base URL
    /// - `DRIVELINK_GATEWAY_KEY`: publishable API key
    pub fn from_env() -> GatewayResult<Self> {
        let base_url = std::env::var("DRIVELINK_GATEWAY_URL")
            .map_err(|_| GatewayError::Config("DRIVELINK_GATEWAY_URL is not set".to_string()))?;
        let api_key = std::env::var("DRIVELINK_GATEWAY_KEY")
            .map_err(|_| GatewayError::Config("DRIVELINK_GATEWAY_KEY is not set".to_string()))?;

        Ok(GatewayConfig::new(base_url, api_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_stripped() {
        let config = GatewayConfig::new("https://fleet.example.dev/", "key");
        assert_eq!(config.base_url, "https://fleet.example.dev");

        let config = GatewayConfig::new("https://fleet.example.dev", "key");
        assert_eq!(config.base_url, "https://fleet.example.dev");
    }
}
