use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const MILLIS_PER_DAY: i64 = 86_400_000;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "credit_source", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CreditSource {
    ReferralBonus,
    ReferredWelcome,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, sqlx::FromRow)]
pub struct PremiumCredit {
    pub id: Uuid,
    pub user_id: Uuid,
    pub days_amount: i32,
    pub source: CreditSource,
    pub source_reference_id: Option<Uuid>,
    pub expires_at: DateTime<Utc>,
    pub consumed: bool,
    pub created_at: DateTime<Utc>,
}

impl PremiumCredit {
    /// A credit counts while it is unconsumed and not yet expired.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        !self.consumed && self.expires_at > now
    }
}

#[derive(Debug, Clone)]
pub struct NewPremiumCredit {
    pub user_id: Uuid,
    pub days_amount: i32,
    pub source: CreditSource,
    pub source_reference_id: Option<Uuid>,
    pub expires_at: DateTime<Utc>,
}

/// Live credit balance of a user.
///
/// `total_days` is the sum of the remaining validity windows of the live
/// credits, not the sum of their granted `days_amount`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PremiumCredits {
    pub has_credits: bool,
    pub total_days: i64,
    pub credits: Vec<PremiumCredit>,
}

impl PremiumCredits {
    /// Keeps the live credits, soonest-expiring first, and totals their remaining days.
    pub fn from_credits(credits: Vec<PremiumCredit>, now: DateTime<Utc>) -> Self {
        let mut credits: Vec<PremiumCredit> = credits
            .into_iter()
            .filter(|credit| credit.is_live(now))
            .collect();
        credits.sort_by_key(|credit| credit.expires_at);

        let total_days = credits
            .iter()
            .map(|credit| remaining_days(credit.expires_at, now))
            .sum();

        Self {
            has_credits: !credits.is_empty(),
            total_days,
            credits,
        }
    }
}

/// Whole days left until `expires_at`, rounded up, never negative.
pub fn remaining_days(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (expires_at - now).num_milliseconds();
    if millis <= 0 {
        return 0;
    }
    (millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn credit(user_id: Uuid, days_amount: i32, expires_at: DateTime<Utc>, consumed: bool) -> PremiumCredit {
        PremiumCredit {
            id: Uuid::new_v4(),
            user_id,
            days_amount,
            source: CreditSource::ReferralBonus,
            source_reference_id: None,
            expires_at,
            consumed,
            created_at: expires_at - Duration::days(365),
        }
    }

    #[test]
    fn remaining_days_rounds_partial_days_up() {
        let now = Utc::now();
        assert_eq!(remaining_days(now + Duration::days(3), now), 3);
        assert_eq!(remaining_days(now + Duration::days(3) + Duration::minutes(1), now), 4);
        assert_eq!(remaining_days(now + Duration::seconds(1), now), 1);
    }

    #[test]
    fn remaining_days_is_zero_once_expired() {
        let now = Utc::now();
        assert_eq!(remaining_days(now, now), 0);
        assert_eq!(remaining_days(now - Duration::days(2), now), 0);
    }

    #[test]
    fn balance_counts_validity_window_not_granted_amount() {
        let now = Utc::now();
        let user_id = Uuid::new_v4();
        let credits = vec![
            credit(user_id, 7, now + Duration::days(365), false),
            credit(user_id, 7, now + Duration::days(10) + Duration::hours(1), false),
        ];

        let balance = PremiumCredits::from_credits(credits, now);

        assert!(balance.has_credits);
        assert_eq!(balance.total_days, 365 + 11);
        assert_eq!(balance.credits[0].expires_at, now + Duration::days(10) + Duration::hours(1));
    }

    #[test]
    fn consumed_and_expired_credits_do_not_count() {
        let now = Utc::now();
        let user_id = Uuid::new_v4();
        let credits = vec![
            credit(user_id, 7, now + Duration::days(30), true),
            credit(user_id, 7, now - Duration::days(1), false),
        ];

        let balance = PremiumCredits::from_credits(credits, now);

        assert!(!balance.has_credits);
        assert_eq!(balance.total_days, 0);
        assert!(balance.credits.is_empty());
    }
}
