pub mod config;
pub mod db;
pub mod dtos;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod service;
pub mod utils;

use std::{fmt, sync::Arc};

use config::Config;
use db::Store;
use service::{referral_service::ReferralService, subscription_service::SubscriptionService};

#[derive(Clone)]
pub struct AppState {
    pub env: Config,
    pub referral_service: Arc<ReferralService>,
    pub subscription_service: Arc<SubscriptionService>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("env", &self.env)
            .finish()
    }
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        let referral_service = Arc::new(
            ReferralService::new(store.clone(), config.referral)
                .with_query_timeout(config.query_timeout),
        );
        let subscription_service = Arc::new(
            SubscriptionService::new(store).with_query_timeout(config.query_timeout),
        );

        Self {
            env: config,
            referral_service,
            subscription_service,
        }
    }
}
