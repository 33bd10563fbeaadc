pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod services;

pub use db::DbPool;

use config::Config;
use std::sync::Arc;

use crate::api::rate_limit::RateLimiter;
use crate::services::{AuthService, ClientService};

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub auth: AuthService,
    pub clients: ClientService,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(config: Config, db: DbPool) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
        let auth = AuthService::new(db.clone(), config.auth.clone());
        let clients = ClientService::new(db.clone());
        Self {
            config,
            db,
            auth,
            clients,
            rate_limiter,
        }
    }
}
