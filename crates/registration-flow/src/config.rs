//! Configuration for the registration flow.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

/// Flow configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlowConfig {
    /// Verification session configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// Secure value recovery configuration
    #[serde(default)]
    pub svr: SvrConfig,

    /// Phone number handling configuration
    #[serde(default)]
    pub phone: PhoneConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// How long to wait for a push-delivered challenge token before
    /// proceeding without one
    #[serde(default = "default_push_challenge_timeout", with = "humantime_serde")]
    pub push_challenge_timeout: Duration,

    /// BCP-47 locale sent with verification code requests
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Whether the platform can auto-retrieve incoming verification SMS
    #[serde(default)]
    pub sms_retriever_supported: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SvrConfig {
    /// Maximum number of SVR credentials kept in the local append-only store
    #[serde(default = "default_max_stored_credentials")]
    pub max_stored_credentials: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhoneConfig {
    /// Region used to seed phone number entry before the user picks one
    #[serde(default = "default_region")]
    pub default_region: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            push_challenge_timeout: default_push_challenge_timeout(),
            locale: default_locale(),
            sms_retriever_supported: false,
        }
    }
}

impl Default for SvrConfig {
    fn default() -> Self {
        Self {
            max_stored_credentials: default_max_stored_credentials(),
        }
    }
}

impl Default for PhoneConfig {
    fn default() -> Self {
        Self {
            default_region: default_region(),
        }
    }
}

fn default_push_challenge_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_locale() -> String {
    "en-US".into()
}

fn default_max_stored_credentials() -> usize {
    10
}

fn default_region() -> String {
    "US".into()
}

impl FlowConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(false),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = FlowConfig::default();
        assert_eq!(config.session.push_challenge_timeout, Duration::from_secs(10));
        assert_eq!(config.session.locale, "en-US");
        assert!(!config.session.sms_retriever_supported);
        assert_eq!(config.svr.max_stored_credentials, 10);
        assert_eq!(config.phone.default_region, "US");
    }

    #[test]
    fn overrides_deserialize() {
        let config: FlowConfig = serde_json::from_value(serde_json::json!({
            "session": {
                "push_challenge_timeout": "30s",
                "locale": "de-DE"
            },
            "svr": { "max_stored_credentials": 3 }
        }))
        .unwrap();

        assert_eq!(config.session.push_challenge_timeout, Duration::from_secs(30));
        assert_eq!(config.session.locale, "de-DE");
        assert_eq!(config.svr.max_stored_credentials, 3);
        // Untouched sections fall back to defaults
        assert_eq!(config.phone.default_region, "US");
    }
}
