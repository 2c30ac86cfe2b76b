use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::models::{creditmodels::PremiumCredits, usagemodels::{UsageCounter, UsageCounters}};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "subscription_plan", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    Free,
    Premium,
}

impl Plan {
    pub fn limits(&self) -> PlanLimits {
        match self {
            Plan::Free => PlanLimits {
                meal_plans_per_month: Some(3),
                recipe_regenerations_per_month: Some(5),
                favorites_per_month: Some(10),
                max_family_members: 0,
                max_templates: Some(3),
            },
            Plan::Premium => PlanLimits {
                meal_plans_per_month: None, // Unlimited
                recipe_regenerations_per_month: None,
                favorites_per_month: None,
                max_family_members: 10,
                max_templates: None,
            },
        }
    }
}

/// Quotas of a plan. `None` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlanLimits {
    pub meal_plans_per_month: Option<u32>,
    pub recipe_regenerations_per_month: Option<u32>,
    pub favorites_per_month: Option<u32>,
    pub max_family_members: u32,
    pub max_templates: Option<u32>,
}

impl PlanLimits {
    pub fn monthly_limit(&self, counter: UsageCounter) -> Option<u32> {
        match counter {
            UsageCounter::MealPlansGenerated => self.meal_plans_per_month,
            UsageCounter::RecipesRegenerated => self.recipe_regenerations_per_month,
            UsageCounter::FavoritesCount => self.favorites_per_month,
        }
    }
}

/// Status reported by the billing processor.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
    Incomplete,
    IncompleteExpired,
    Unpaid,
    Paused,
    Unknown,
}

impl SubscriptionStatus {
    pub fn from_string(s: &str) -> Self {
        match s {
            "active" => SubscriptionStatus::Active,
            "trialing" => SubscriptionStatus::Trialing,
            "past_due" => SubscriptionStatus::PastDue,
            "canceled" => SubscriptionStatus::Canceled,
            "incomplete" => SubscriptionStatus::Incomplete,
            "incomplete_expired" => SubscriptionStatus::IncompleteExpired,
            "unpaid" => SubscriptionStatus::Unpaid,
            "paused" => SubscriptionStatus::Paused,
            _ => SubscriptionStatus::Unknown,
        }
    }
}

/// Mirror of the billing processor's subscription, written by its webhook handler.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, sqlx::FromRow)]
pub struct Subscription {
    pub user_id: Uuid,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub plan: Plan,
    pub status: String,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    pub trial_end: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    pub fn processor_status(&self) -> SubscriptionStatus {
        SubscriptionStatus::from_string(&self.status)
    }

    /// Paid premium counts only while active or trialing and inside the paid period.
    pub fn is_live_premium(&self, now: DateTime<Utc>) -> bool {
        let status_ok = matches!(
            self.processor_status(),
            SubscriptionStatus::Active | SubscriptionStatus::Trialing
        );
        let period_ok = self.current_period_end.map_or(true, |end| end > now);

        self.plan == Plan::Premium && status_ok && period_ok
    }
}

/// Why a user is on their plan. `Credit` means premium earned through referrals.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntitlementStatus {
    Active,
    Trialing,
    Credit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSubscription {
    pub plan: Plan,
    pub status: EntitlementStatus,
    pub subscription: Option<Subscription>,
    pub usage: Option<UsageCounters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub premium_credits: Option<PremiumCredits>,
}

impl UserSubscription {
    pub fn anonymous() -> Self {
        Self {
            plan: Plan::Free,
            status: EntitlementStatus::Active,
            subscription: None,
            usage: None,
            premium_credits: None,
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn subscription(plan: Plan, status: &str, period_end: Option<DateTime<Utc>>) -> Subscription {
        Subscription {
            user_id: Uuid::new_v4(),
            stripe_customer_id: Some("cus_123".to_string()),
            stripe_subscription_id: Some("sub_123".to_string()),
            plan,
            status: status.to_string(),
            current_period_start: None,
            current_period_end: period_end,
            cancel_at_period_end: false,
            trial_end: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn active_and_trialing_premium_is_live() {
        let now = Utc::now();
        let future = Some(now + Duration::days(20));

        assert!(subscription(Plan::Premium, "active", future).is_live_premium(now));
        assert!(subscription(Plan::Premium, "trialing", future).is_live_premium(now));
        assert!(subscription(Plan::Premium, "active", None).is_live_premium(now));
    }

    #[test]
    fn lapsed_or_unpaid_premium_is_not_live() {
        let now = Utc::now();

        assert!(!subscription(Plan::Premium, "past_due", None).is_live_premium(now));
        assert!(!subscription(Plan::Premium, "canceled", None).is_live_premium(now));
        assert!(!subscription(Plan::Premium, "active", Some(now - Duration::hours(1))).is_live_premium(now));
        assert!(!subscription(Plan::Free, "active", None).is_live_premium(now));
    }

    #[test]
    fn unrecognised_processor_status_is_unknown() {
        assert_eq!(SubscriptionStatus::from_string("past_due"), SubscriptionStatus::PastDue);
        assert_eq!(SubscriptionStatus::from_string("something_new"), SubscriptionStatus::Unknown);
    }

    #[test]
    fn premium_monthly_counters_are_unlimited() {
        let limits = Plan::Premium.limits();
        assert_eq!(limits.monthly_limit(UsageCounter::MealPlansGenerated), None);
        assert_eq!(Plan::Free.limits().monthly_limit(UsageCounter::MealPlansGenerated), Some(3));
        assert_eq!(Plan::Free.limits().max_family_members, 0);
    }
}
