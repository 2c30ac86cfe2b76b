use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{DBClient, StoreError};
use crate::models::referralmodel::{
    NewReferral, RecentReferral, Referral, ReferralCode, ReferralStats, ReferralStatus,
};

#[async_trait]
pub trait ReferralExt: Send + Sync {
    async fn get_referral_code_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<ReferralCode>, StoreError>;

    async fn get_active_referral_code(
        &self,
        code: &str,
    ) -> Result<Option<ReferralCode>, StoreError>;

    async fn referral_code_exists(&self, code: &str) -> Result<bool, StoreError>;

    async fn insert_referral_code(
        &self,
        user_id: Uuid,
        code: &str,
    ) -> Result<ReferralCode, StoreError>;

    async fn ensure_referral_stats(&self, user_id: Uuid) -> Result<(), StoreError>;

    async fn get_referral_by_referred(
        &self,
        referred_id: Uuid,
    ) -> Result<Option<Referral>, StoreError>;

    async fn get_pending_referral(
        &self,
        referred_id: Uuid,
    ) -> Result<Option<Referral>, StoreError>;

    async fn count_referrals(
        &self,
        referrer_id: Uuid,
        statuses: &[ReferralStatus],
    ) -> Result<i64, StoreError>;

    async fn insert_referral(&self, referral: NewReferral) -> Result<Referral, StoreError>;

    /// `None` when the referral is no longer pending.
    async fn mark_referral_completed(
        &self,
        referral_id: Uuid,
        referrer_rewarded: bool,
        referred_rewarded: bool,
        completed_at: DateTime<Utc>,
    ) -> Result<Option<Referral>, StoreError>;

    async fn recalculate_referral_stats(&self, user_id: Uuid) -> Result<(), StoreError>;

    async fn get_referral_stats(
        &self,
        user_id: Uuid,
    ) -> Result<Option<ReferralStats>, StoreError>;

    async fn get_recent_referrals(
        &self,
        referrer_id: Uuid,
        limit: i64,
    ) -> Result<Vec<RecentReferral>, StoreError>;
}

#[async_trait]
impl ReferralExt for DBClient {
    async fn get_referral_code_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<ReferralCode>, StoreError> {
        let code = sqlx::query_as::<_, ReferralCode>(
            r#"
            SELECT id, user_id, code, is_active, created_at
            FROM referral_codes
            WHERE user_id = $1
            "#
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(code)
    }

    async fn get_active_referral_code(
        &self,
        code: &str,
    ) -> Result<Option<ReferralCode>, StoreError> {
        let code = sqlx::query_as::<_, ReferralCode>(
            r#"
            SELECT id, user_id, code, is_active, created_at
            FROM referral_codes
            WHERE code = $1 AND is_active = true
            "#
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(code)
    }

    async fn referral_code_exists(&self, code: &str) -> Result<bool, StoreError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM referral_codes WHERE code = $1)"
        )
        .bind(code)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn insert_referral_code(
        &self,
        user_id: Uuid,
        code: &str,
    ) -> Result<ReferralCode, StoreError> {
        let row = sqlx::query_as::<_, ReferralCode>(
            r#"
            INSERT INTO referral_codes (user_id, code, is_active)
            VALUES ($1, $2, true)
            RETURNING id, user_id, code, is_active, created_at
            "#
        )
        .bind(user_id)
        .bind(code)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn ensure_referral_stats(&self, user_id: Uuid) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO referral_stats (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING"
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_referral_by_referred(
        &self,
        referred_id: Uuid,
    ) -> Result<Option<Referral>, StoreError> {
        let referral = sqlx::query_as::<_, Referral>(
            r#"
            SELECT id, referrer_id, referred_id, referral_code_id, status,
                   referrer_rewarded, referred_rewarded, created_at, completed_at
            FROM referrals
            WHERE referred_id = $1
            "#
        )
        .bind(referred_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(referral)
    }

    async fn get_pending_referral(
        &self,
        referred_id: Uuid,
    ) -> Result<Option<Referral>, StoreError> {
        let referral = sqlx::query_as::<_, Referral>(
            r#"
            SELECT id, referrer_id, referred_id, referral_code_id, status,
                   referrer_rewarded, referred_rewarded, created_at, completed_at
            FROM referrals
            WHERE referred_id = $1 AND status = 'pending'
            "#
        )
        .bind(referred_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(referral)
    }

    async fn count_referrals(
        &self,
        referrer_id: Uuid,
        statuses: &[ReferralStatus],
    ) -> Result<i64, StoreError> {
        let statuses: Vec<&str> = statuses.iter().map(|status| status.to_str()).collect();

        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM referrals
            WHERE referrer_id = $1 AND status::text = ANY($2)
            "#
        )
        .bind(referrer_id)
        .bind(statuses)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn insert_referral(&self, referral: NewReferral) -> Result<Referral, StoreError> {
        let row = sqlx::query_as::<_, Referral>(
            r#"
            INSERT INTO referrals (referrer_id, referred_id, referral_code_id, status)
            VALUES ($1, $2, $3, 'pending')
            RETURNING id, referrer_id, referred_id, referral_code_id, status,
                      referrer_rewarded, referred_rewarded, created_at, completed_at
            "#
        )
        .bind(referral.referrer_id)
        .bind(referral.referred_id)
        .bind(referral.referral_code_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn mark_referral_completed(
        &self,
        referral_id: Uuid,
        referrer_rewarded: bool,
        referred_rewarded: bool,
        completed_at: DateTime<Utc>,
    ) -> Result<Option<Referral>, StoreError> {
        // The status guard keeps completion one-way.
        let row = sqlx::query_as::<_, Referral>(
            r#"
            UPDATE referrals
            SET status = 'completed',
                referrer_rewarded = $2,
                referred_rewarded = $3,
                completed_at = $4
            WHERE id = $1 AND status = 'pending'
            RETURNING id, referrer_id, referred_id, referral_code_id, status,
                      referrer_rewarded, referred_rewarded, created_at, completed_at
            "#
        )
        .bind(referral_id)
        .bind(referrer_rewarded)
        .bind(referred_rewarded)
        .bind(completed_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn recalculate_referral_stats(&self, user_id: Uuid) -> Result<(), StoreError> {
        sqlx::query("SELECT calculate_referral_stats($1)")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get_referral_stats(
        &self,
        user_id: Uuid,
    ) -> Result<Option<ReferralStats>, StoreError> {
        let stats = sqlx::query_as::<_, ReferralStats>(
            r#"
            SELECT user_id, total_invited, total_converted, total_days_earned,
                   last_referral_at, updated_at
            FROM referral_stats
            WHERE user_id = $1
            "#
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(stats)
    }

    async fn get_recent_referrals(
        &self,
        referrer_id: Uuid,
        limit: i64,
    ) -> Result<Vec<RecentReferral>, StoreError> {
        let referrals = sqlx::query_as::<_, RecentReferral>(
            r#"
            SELECT id, status, referrer_rewarded, created_at, completed_at
            FROM referrals
            WHERE referrer_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#
        )
        .bind(referrer_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(referrals)
    }
}
