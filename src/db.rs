use std::time::Duration;

use sqlx::{Pool, Postgres};

pub mod creditdb;
pub mod householddb;
pub mod memory;
pub mod query_timeout;
pub mod referraldb;
pub mod subscriptiondb;
pub mod usagedb;

use creditdb::CreditExt;
use householddb::HouseholdExt;
use referraldb::ReferralExt;
use subscriptiondb::SubscriptionExt;
use usagedb::UsageExt;

#[derive(Debug, Clone)]
pub struct DBClient {
    pool: Pool<Postgres>,
}

impl DBClient {
    pub fn new(pool: Pool<Postgres>) -> Self {
        DBClient { pool }
    }

}

/// Everything the entitlement core needs from storage.
pub trait Store: ReferralExt + CreditExt + SubscriptionExt + UsageExt + HouseholdExt {}

impl<T> Store for T where T: ReferralExt + CreditExt + SubscriptionExt + UsageExt + HouseholdExt {}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("storage call timed out after {0:?}")]
    Timeout(Duration),

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl StoreError {
    /// The only storage condition the core treats as an expected outcome.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_unique_violation() {
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                return StoreError::UniqueViolation(constraint);
            }
        }
        StoreError::Database(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unique_violations_are_conflicts() {
        assert!(StoreError::UniqueViolation("referrals_referred_id_key".into()).is_unique_violation());
        assert!(!StoreError::Timeout(Duration::from_secs(1)).is_unique_violation());
        assert!(!StoreError::from(sqlx::Error::RowNotFound).is_unique_violation());
    }
}
