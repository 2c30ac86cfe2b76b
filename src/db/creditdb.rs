use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{DBClient, StoreError};
use crate::models::creditmodels::{NewPremiumCredit, PremiumCredit};

#[async_trait]
pub trait CreditExt: Send + Sync {
    /// Fails with `UniqueViolation` when the referral already paid out this side.
    async fn insert_premium_credit(
        &self,
        credit: NewPremiumCredit,
    ) -> Result<PremiumCredit, StoreError>;

    /// Unconsumed credits expiring after `now`, soonest-expiring first.
    async fn get_active_premium_credits(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<PremiumCredit>, StoreError>;
}

#[async_trait]
impl CreditExt for DBClient {
    async fn insert_premium_credit(
        &self,
        credit: NewPremiumCredit,
    ) -> Result<PremiumCredit, StoreError> {
        let row = sqlx::query_as::<_, PremiumCredit>(
            r#"
            INSERT INTO premium_credits
            (user_id, days_amount, source, source_reference_id, expires_at, consumed)
            VALUES ($1, $2, $3, $4, $5, false)
            RETURNING id, user_id, days_amount, source, source_reference_id,
                      expires_at, consumed, created_at
            "#
        )
        .bind(credit.user_id)
        .bind(credit.days_amount)
        .bind(credit.source)
        .bind(credit.source_reference_id)
        .bind(credit.expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn get_active_premium_credits(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<PremiumCredit>, StoreError> {
        let credits = sqlx::query_as::<_, PremiumCredit>(
            r#"
            SELECT id, user_id, days_amount, source, source_reference_id,
                   expires_at, consumed, created_at
            FROM premium_credits
            WHERE user_id = $1 AND consumed = false AND expires_at > $2
            ORDER BY expires_at ASC
            "#
        )
        .bind(user_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(credits)
    }
}
