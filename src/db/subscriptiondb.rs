use async_trait::async_trait;
use uuid::Uuid;

use super::{DBClient, StoreError};
use crate::models::subscriptionmodels::Subscription;

#[async_trait]
pub trait SubscriptionExt: Send + Sync {
    async fn get_subscription(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Subscription>, StoreError>;

    /// Written by the billing webhook; the entitlement core only reads.
    async fn upsert_subscription(
        &self,
        subscription: &Subscription,
    ) -> Result<Subscription, StoreError>;
}

#[async_trait]
impl SubscriptionExt for DBClient {
    async fn get_subscription(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Subscription>, StoreError> {
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT user_id, stripe_customer_id, stripe_subscription_id, plan, status,
                   current_period_start, current_period_end, cancel_at_period_end,
                   trial_end, updated_at
            FROM subscriptions
            WHERE user_id = $1
            "#
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(subscription)
    }

    async fn upsert_subscription(
        &self,
        subscription: &Subscription,
    ) -> Result<Subscription, StoreError> {
        let row = sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions
            (user_id, stripe_customer_id, stripe_subscription_id, plan, status,
             current_period_start, current_period_end, cancel_at_period_end, trial_end)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (user_id) DO UPDATE
            SET stripe_customer_id = EXCLUDED.stripe_customer_id,
                stripe_subscription_id = EXCLUDED.stripe_subscription_id,
                plan = EXCLUDED.plan,
                status = EXCLUDED.status,
                current_period_start = EXCLUDED.current_period_start,
                current_period_end = EXCLUDED.current_period_end,
                cancel_at_period_end = EXCLUDED.cancel_at_period_end,
                trial_end = EXCLUDED.trial_end,
                updated_at = NOW()
            RETURNING user_id, stripe_customer_id, stripe_subscription_id, plan, status,
                      current_period_start, current_period_end, cancel_at_period_end,
                      trial_end, updated_at
            "#
        )
        .bind(subscription.user_id)
        .bind(&subscription.stripe_customer_id)
        .bind(&subscription.stripe_subscription_id)
        .bind(subscription.plan)
        .bind(&subscription.status)
        .bind(subscription.current_period_start)
        .bind(subscription.current_period_end)
        .bind(subscription.cancel_at_period_end)
        .bind(subscription.trial_end)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }
}
