//! Service-account bootstrap for the report store.
//!
//! The credential arrives base64-encoded in the environment. It is decoded and
//! turned into a [`ReportStore`] the first time a handler needs the store;
//! every later call gets the same handle back.

use crate::db::{ReportStore, init_db};
use crate::services::errors::{AppError, AppResult};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Deserialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Name of the environment variable holding the encoded credential.
pub const CREDENTIAL_ENV: &str = "DSME_SERVICE_ACCOUNT_BASE64";

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ServiceAccount {
    pub project_id: String,
    #[serde(default)]
    pub client_email: Option<String>,
    /// Where the report documents live. Defaults to a database file named
    /// after the project.
    #[serde(default)]
    pub database_url: Option<String>,
}

impl ServiceAccount {
    pub fn database_url(&self) -> String {
        self.database_url
            .clone()
            .unwrap_or_else(|| format!("sqlite://{}.db?mode=rwc", self.project_id))
    }
}

/// Decodes the base64 credential and parses the JSON inside it.
pub fn decode_service_account(encoded: &str) -> AppResult<ServiceAccount> {
    let bytes = STANDARD.decode(encoded.trim()).map_err(|e| {
        AppError::Configuration(format!("{} is not valid base64: {}", CREDENTIAL_ENV, e))
    })?;

    let json = String::from_utf8(bytes).map_err(|_| {
        AppError::Configuration(format!("{} does not decode to UTF-8 text", CREDENTIAL_ENV))
    })?;

    let account: ServiceAccount = serde_json::from_str(&json).map_err(|e| {
        AppError::Configuration(format!("The service account key is malformed: {}", e))
    })?;

    if account.project_id.trim().is_empty() {
        return Err(AppError::Configuration(
            "The service account key has an empty project_id".to_string(),
        ));
    }

    Ok(account)
}

/// Builds a store handle for the given account. The pool connects lazily; the
/// schema check is the only database round-trip made here.
pub async fn connect_store(account: &ServiceAccount) -> AppResult<ReportStore> {
    let url = account.database_url();
    let options = SqliteConnectOptions::from_str(&url).map_err(|e| {
        AppError::Configuration(format!("Invalid database url '{}': {}", url, e))
    })?;

    //max 5 connections
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_lazy_with(options);

    init_db(&pool).await?;
    Ok(ReportStore::new(pool))
}

// ====================================
// ONCE-ONLY INITIALIZATION

/// Initialise-once, read-many holder for the store handle. Concurrent first
/// callers wait on the same initialization; a failed attempt is not cached.
#[derive(Clone)]
pub struct StoreBootstrap {
    credential: Option<String>,
    cell: Arc<OnceCell<ReportStore>>,
}

impl std::fmt::Debug for StoreBootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreBootstrap")
            .field("credential_set", &self.credential.is_some())
            .field("initialized", &self.cell.initialized())
            .finish()
    }
}

impl StoreBootstrap {
    pub fn new(credential: Option<String>) -> Self {
        Self {
            credential,
            cell: Arc::new(OnceCell::new()),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }

    pub async fn store(&self) -> AppResult<ReportStore> {
        let store = self
            .cell
            .get_or_try_init(|| async {
                let encoded = self.credential.as_deref().ok_or_else(|| {
                    tracing::error!("{} is not set", CREDENTIAL_ENV);
                    AppError::Configuration(
                        "The report store configuration is incomplete.".to_string(),
                    )
                })?;

                let account = decode_service_account(encoded)?;
                tracing::info!(project_id = %account.project_id, "initializing report store");
                connect_store(&account).await
            })
            .await?;
        Ok(store.clone())
    }
}
