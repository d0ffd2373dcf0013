use crate::services::credentials::CREDENTIAL_ENV;
use crate::services::mailer::DEFAULT_API_URL;
use std::env;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Process configuration read from the environment (and `.env`).
///
/// Credentials are optional here: a missing value only fails the requests that
/// need it.
#[derive(Clone, Default)]
pub struct Config {
    pub service_account_base64: Option<String>,
    pub resend_api_key: Option<String>,
    pub resend_api_url: String,
    pub bind_addr: String,
    pub cors_allow_origin: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok(); //loads environment variables
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            service_account_base64: get(CREDENTIAL_ENV),
            resend_api_key: get("RESEND_API_KEY"),
            resend_api_url: get("RESEND_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            cors_allow_origin: get("CORS_ALLOW_ORIGIN"),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("service_account_set", &self.service_account_base64.is_some())
            .field("resend_api_key_set", &self.resend_api_key.is_some())
            .field("resend_api_url", &self.resend_api_url)
            .field("bind_addr", &self.bind_addr)
            .field("cors_allow_origin", &self.cors_allow_origin)
            .finish()
    }
}
