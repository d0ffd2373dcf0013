pub mod config;
pub mod db;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

use crate::config::Config;
use crate::services::credentials::StoreBootstrap;
use crate::services::mailer::Mailer;

#[derive(Clone, Debug)]
pub struct AppState {
    pub store: StoreBootstrap,
    pub mailer: Mailer,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            store: StoreBootstrap::new(config.service_account_base64.clone()),
            mailer: Mailer::new(config.resend_api_key.clone(), config.resend_api_url.clone()),
        }
    }
}
