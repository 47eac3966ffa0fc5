//! Configuration
//!
//! Resolves provider credentials and mode flags from the environment.
//! Built once at start-up and shared by reference; in production a missing
//! provider secret aborts start-up instead of running with an empty value.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{CheckoutError, Result};

/// Provider base URL when `PIX_SANDBOX` is on
pub const SANDBOX_BASE_URL: &str = "https://pix-h.api.efipay.com.br";

/// Provider base URL in production
pub const PRODUCTION_BASE_URL: &str = "https://pix.api.efipay.com.br";

/// Receiving key used when `PIX_KEY` is not set
pub const DEFAULT_PIX_KEY: &str = "00000000-0000-0000-0000-000000000000";

const REQUIRED_IN_PRODUCTION: [&str; 3] = ["PIX_CLIENT_ID", "PIX_CLIENT_SECRET", "PIX_CERTIFICATE"];

/// Deployment environment
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "" | "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(CheckoutError::Configuration(format!(
                "APP_ENV must be 'production' or 'development', got '{other}'"
            ))),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

/// Settings used by the real Pix provider
#[derive(Clone, Debug)]
pub struct PixSettings {
    pub client_id: String,
    pub client_secret: String,

    /// PKCS#12 client certificate path
    pub certificate: Option<PathBuf>,
    pub certificate_password: String,
    pub sandbox: bool,
    pub test_mode: bool,

    /// Receiving Pix key
    pub pix_key: String,
    pub timeout: Duration,
}

impl PixSettings {
    pub const fn base_url(&self) -> &'static str {
        if self.sandbox {
            SANDBOX_BASE_URL
        } else {
            PRODUCTION_BASE_URL
        }
    }

    /// Test mode, or no certificate to authenticate with
    pub const fn uses_simulated_charges(&self) -> bool {
        self.test_mode || self.certificate.is_none()
    }
}

/// Marketing pixel ids. Carried for the pages, no effect on payments.
#[derive(Clone, Debug, Default)]
pub struct PixelIds {
    pub facebook: Option<String>,
    pub google_analytics: Option<String>,
    pub tiktok: Option<String>,
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: Environment,
    pub pix: PixSettings,
    pub api_base_url: String,
    pub webhook_secret: Option<String>,
    pub notifier_token: Option<String>,
    pub notifier_sender_id: Option<String>,
    pub pixels: PixelIds,
}

impl Config {
    /// Load from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let environment = Environment::parse(&get("APP_ENV").unwrap_or_default())?;

        if environment == Environment::Production {
            let missing: Vec<&str> = REQUIRED_IN_PRODUCTION
                .iter()
                .copied()
                .filter(|key| get(*key).is_none())
                .collect();
            if !missing.is_empty() {
                return Err(CheckoutError::Configuration(format!(
                    "missing required production settings: {}",
                    missing.join(", ")
                )));
            }
        }

        let timeout_secs = match get("PIX_HTTP_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                CheckoutError::Configuration(format!("PIX_HTTP_TIMEOUT_SECS is not a number: '{raw}'"))
            })?,
            None => 30,
        };

        let pix = PixSettings {
            client_id: get("PIX_CLIENT_ID").unwrap_or_default(),
            client_secret: get("PIX_CLIENT_SECRET").unwrap_or_default(),
            certificate: get("PIX_CERTIFICATE").map(PathBuf::from),
            certificate_password: get("PIX_CERTIFICATE_PASSWORD").unwrap_or_default(),
            sandbox: parse_bool("PIX_SANDBOX", get("PIX_SANDBOX"), true)?,
            test_mode: parse_bool("PIX_TEST_MODE", get("PIX_TEST_MODE"), false)?,
            pix_key: get("PIX_KEY").unwrap_or_else(|| DEFAULT_PIX_KEY.into()),
            timeout: Duration::from_secs(timeout_secs),
        };

        Ok(Self {
            environment,
            pix,
            api_base_url: get("API_BASE_URL").unwrap_or_else(|| "http://localhost:3000".into()),
            webhook_secret: get("PIX_WEBHOOK_SECRET"),
            notifier_token: get("NOTIFIER_API_TOKEN"),
            notifier_sender_id: get("NOTIFIER_SENDER_ID"),
            pixels: PixelIds {
                facebook: get("FACEBOOK_PIXEL_ID"),
                google_analytics: get("GOOGLE_ANALYTICS_ID"),
                tiktok: get("TIKTOK_PIXEL_ID"),
            },
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Messaging provider token and sender id both present
    pub const fn is_notifier_configured(&self) -> bool {
        self.notifier_token.is_some() && self.notifier_sender_id.is_some()
    }

    pub const fn uses_simulated_charges(&self) -> bool {
        self.pix.uses_simulated_charges()
    }

    pub const fn pix_base_url(&self) -> &'static str {
        self.pix.base_url()
    }
}

fn parse_bool(key: &str, value: Option<String>, default: bool) -> Result<bool> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(CheckoutError::Configuration(format!(
            "{key} must be a boolean, got '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_development_defaults() {
        let config = load(&[]).unwrap();
        assert!(!config.is_production());
        assert!(config.pix.sandbox);
        assert!(!config.pix.test_mode);
        assert!(config.uses_simulated_charges());
        assert_eq!(config.pix_base_url(), SANDBOX_BASE_URL);
        assert_eq!(config.pix.pix_key, DEFAULT_PIX_KEY);
        assert_eq!(config.pix.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_production_requires_secrets() {
        let err = load(&[("APP_ENV", "production"), ("PIX_CLIENT_ID", "id")]).unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, CheckoutError::Configuration(_)));
        assert!(message.contains("PIX_CLIENT_SECRET"));
        assert!(message.contains("PIX_CERTIFICATE"));
        assert!(!message.contains("PIX_CLIENT_ID,"));
    }

    #[test]
    fn test_production_with_secrets() {
        let config = load(&[
            ("APP_ENV", "production"),
            ("PIX_CLIENT_ID", "id"),
            ("PIX_CLIENT_SECRET", "secret"),
            ("PIX_CERTIFICATE", "/etc/pix/cert.p12"),
            ("PIX_SANDBOX", "false"),
        ])
        .unwrap();
        assert!(config.is_production());
        assert!(!config.uses_simulated_charges());
        assert_eq!(config.pix_base_url(), PRODUCTION_BASE_URL);
    }

    #[test]
    fn test_blank_values_count_as_missing() {
        let err = load(&[
            ("APP_ENV", "production"),
            ("PIX_CLIENT_ID", "  "),
            ("PIX_CLIENT_SECRET", "secret"),
            ("PIX_CERTIFICATE", "/etc/pix/cert.p12"),
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn test_test_mode_forces_simulation() {
        let config = load(&[("PIX_CERTIFICATE", "/etc/pix/cert.p12"), ("PIX_TEST_MODE", "yes")]).unwrap();
        assert!(config.uses_simulated_charges());
    }

    #[test]
    fn test_invalid_boolean() {
        assert!(load(&[("PIX_SANDBOX", "maybe")]).is_err());
        assert!(load(&[("PIX_SANDBOX", "off")]).is_err());
        assert!(load(&[("PIX_TEST_MODE", "on")]).is_err());
        assert!(load(&[("APP_ENV", "staging")]).is_err());
    }

    #[test]
    fn test_notifier_configured() {
        assert!(!load(&[("NOTIFIER_API_TOKEN", "t")]).unwrap().is_notifier_configured());
        assert!(load(&[("NOTIFIER_API_TOKEN", "t"), ("NOTIFIER_SENDER_ID", "s")])
            .unwrap()
            .is_notifier_configured());
    }
}
