#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Duration, Utc};
use premium_ledger::{
    config::{Config, ReferralConfig},
    db::{memory::MemoryStore, Store},
    models::{
        creditmodels::{CreditSource, PremiumCredit},
        subscriptionmodels::{Plan, Subscription},
    },
    routes::create_router,
    service::{referral_service::ReferralService, subscription_service::SubscriptionService},
    utils::token,
    AppState,
};
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "test-jwt-secret";
pub const TEST_APP_URL: &str = "https://meals.test";

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub config: ReferralConfig,
    pub referrals: ReferralService,
    pub subscriptions: SubscriptionService,
}

impl TestApp {
    pub fn spawn() -> Self {
        Self::with_config(ReferralConfig::default())
    }

    pub fn with_config(config: ReferralConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let dyn_store: Arc<dyn Store> = store.clone();

        TestApp {
            referrals: ReferralService::new(dyn_store.clone(), config),
            subscriptions: SubscriptionService::new(dyn_store),
            store,
            config,
        }
    }

    /// Creates a referrer with a code and returns `(referrer_id, code)`.
    pub async fn referrer(&self) -> (Uuid, String) {
        let referrer_id = Uuid::new_v4();
        let code = self
            .referrals
            .get_or_create_referral_code(referrer_id)
            .await
            .expect("Failed to create referral code");
        (referrer_id, code.code)
    }

    /// Records and completes one referral of a fresh user with `code`.
    pub async fn convert(&self, code: &str) -> Uuid {
        let referred_id = Uuid::new_v4();
        self.referrals
            .record_pending_referral(referred_id, code)
            .await
            .expect("Failed to record referral");
        self.referrals
            .complete_referral(referred_id)
            .await
            .expect("Failed to complete referral");
        referred_id
    }

    pub async fn seed_credit(&self, user_id: Uuid, days_amount: i32, expires_at: DateTime<Utc>, consumed: bool) {
        self.store
            .seed_credit(PremiumCredit {
                id: Uuid::new_v4(),
                user_id,
                days_amount,
                source: CreditSource::ReferralBonus,
                source_reference_id: None,
                expires_at,
                consumed,
                created_at: Utc::now(),
            })
            .await;
    }
}

pub fn premium_subscription(user_id: Uuid, status: &str) -> Subscription {
    let now = Utc::now();
    Subscription {
        user_id,
        stripe_customer_id: Some(format!("cus_{}", user_id.simple())),
        stripe_subscription_id: Some(format!("sub_{}", user_id.simple())),
        plan: Plan::Premium,
        status: status.to_string(),
        current_period_start: Some(now - Duration::days(3)),
        current_period_end: Some(now + Duration::days(27)),
        cancel_at_period_end: false,
        trial_end: None,
        updated_at: now,
    }
}

pub struct TestServer {
    pub store: Arc<MemoryStore>,
    pub router: Router,
}

impl TestServer {
    pub fn spawn() -> Self {
        let store = Arc::new(MemoryStore::new());
        let dyn_store: Arc<dyn Store> = store.clone();

        let config = Config {
            database_url: "postgres://unused".to_string(),
            app_url: TEST_APP_URL.to_string(),
            jwt_secret: TEST_JWT_SECRET.to_string(),
            port: 0,
            max_connections: 1,
            query_timeout: None,
            referral: ReferralConfig::default(),
        };

        let app_state = Arc::new(AppState::new(dyn_store, config));

        TestServer {
            store,
            router: create_router(app_state),
        }
    }
}

pub fn bearer_for(user_id: Uuid) -> String {
    let token = token::create_token(&user_id.to_string(), TEST_JWT_SECRET.as_bytes(), 3600)
        .expect("Failed to sign test token");
    format!("Bearer {}", token)
}
