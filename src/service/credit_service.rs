use std::{sync::Arc, time::Duration};

use chrono::Utc;
use uuid::Uuid;

use crate::{
    db::{query_timeout::QueryTimeout, Store},
    models::creditmodels::PremiumCredits,
    service::error::ServiceError,
};

/// Reads the earned premium-day balance of a user.
#[derive(Clone)]
pub struct CreditService {
    store: Arc<dyn Store>,
    query_timeout: Option<Duration>,
}

impl CreditService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            query_timeout: None,
        }
    }

    pub fn with_query_timeout(mut self, limit: Option<Duration>) -> Self {
        self.query_timeout = limit;
        self
    }

    pub async fn get_premium_credits(&self, user_id: Uuid) -> Result<PremiumCredits, ServiceError> {
        let now = Utc::now();
        let credits = QueryTimeout::bounded(
            self.query_timeout,
            self.store.get_active_premium_credits(user_id, now),
        )
        .await?;

        Ok(PremiumCredits::from_credits(credits, now))
    }
}
