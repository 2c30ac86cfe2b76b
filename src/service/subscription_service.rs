use std::{future::Future, sync::Arc, time::Duration};

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::{query_timeout::QueryTimeout, Store, StoreError},
    models::{
        subscriptionmodels::{EntitlementStatus, Plan, SubscriptionStatus, UserSubscription},
        usagemodels::{current_period_start, Action, ActionPolicy, UsageCounter, UsageCounters},
    },
    service::{credit_service::CreditService, error::ServiceError},
};

pub const UPGRADE_PATH: &str = "/pricing";

/// Why an action was refused, with enough data to render the upsell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Denial {
    pub reason: String,
    pub limit: u32,
    pub used: Option<i64>,
    pub upgrade_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionDecision {
    Allowed,
    Denied(Denial),
}

impl ActionDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, ActionDecision::Allowed)
    }
}

/// Only free users have somewhere to upgrade to.
fn upgrade_path_for(plan: Plan) -> Option<String> {
    match plan {
        Plan::Free => Some(UPGRADE_PATH.to_string()),
        Plan::Premium => None,
    }
}

fn monthly_limit_reason(counter: UsageCounter) -> &'static str {
    match counter {
        UsageCounter::MealPlansGenerated => "You have used all meal plans included this month",
        UsageCounter::RecipesRegenerated => "You have used all recipe swaps included this month",
        UsageCounter::FavoritesCount => "You have saved all favorites included this month",
    }
}

/// Decides who is premium and whether a quota-gated action may proceed.
#[derive(Clone)]
pub struct SubscriptionService {
    store: Arc<dyn Store>,
    credits: CreditService,
    query_timeout: Option<Duration>,
}

impl SubscriptionService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            credits: CreditService::new(store.clone()),
            store,
            query_timeout: None,
        }
    }

    pub fn with_query_timeout(mut self, limit: Option<Duration>) -> Self {
        self.query_timeout = limit;
        self.credits = self.credits.with_query_timeout(limit);
        self
    }

    async fn bounded<T, F>(&self, query_fn: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        QueryTimeout::bounded(self.query_timeout, query_fn).await
    }

    /// Paid subscription first, then earned credits, then free.
    pub async fn get_user_subscription(
        &self,
        user_id: Option<Uuid>,
    ) -> Result<UserSubscription, ServiceError> {
        let Some(user_id) = user_id else {
            return Ok(UserSubscription::anonymous());
        };

        let now = Utc::now();
        let period_start = current_period_start(now);

        let subscription = self.bounded(self.store.get_subscription(user_id)).await?;
        let usage = self
            .bounded(self.store.get_usage(user_id, period_start))
            .await?
            .unwrap_or_else(|| UsageCounters::empty(user_id, period_start));

        if let Some(paid) = subscription.as_ref().filter(|s| s.is_live_premium(now)) {
            let status = match paid.processor_status() {
                SubscriptionStatus::Trialing => EntitlementStatus::Trialing,
                _ => EntitlementStatus::Active,
            };

            return Ok(UserSubscription {
                plan: Plan::Premium,
                status,
                subscription,
                usage: Some(usage),
                premium_credits: None,
            });
        }

        let premium_credits = self.credits.get_premium_credits(user_id).await?;
        let (plan, status) = if premium_credits.has_credits {
            (Plan::Premium, EntitlementStatus::Credit)
        } else {
            (Plan::Free, EntitlementStatus::Active)
        };

        Ok(UserSubscription {
            plan,
            status,
            subscription,
            usage: Some(usage),
            premium_credits: Some(premium_credits),
        })
    }

    pub async fn can_perform_action(
        &self,
        user_id: Uuid,
        action: Action,
    ) -> Result<ActionDecision, ServiceError> {
        let entitlement = self.get_user_subscription(Some(user_id)).await?;
        let plan = entitlement.plan;

        match action.policy() {
            ActionPolicy::FamilyMembers => self.check_family_member_limit(user_id, plan).await,
            ActionPolicy::PremiumFeature(feature) => {
                if plan == Plan::Premium {
                    return Ok(ActionDecision::Allowed);
                }
                Ok(ActionDecision::Denied(Denial {
                    reason: feature.denial_reason().to_string(),
                    limit: 0,
                    used: None,
                    upgrade_path: upgrade_path_for(plan),
                }))
            }
            ActionPolicy::Templates => self.check_template_limit(user_id, plan).await,
            ActionPolicy::Monthly(counter) => {
                let Some(limit) = plan.limits().monthly_limit(counter) else {
                    return Ok(ActionDecision::Allowed);
                };
                let used = entitlement
                    .usage
                    .as_ref()
                    .map_or(0, |usage| usage.get(counter));

                if used < i64::from(limit) {
                    return Ok(ActionDecision::Allowed);
                }
                Ok(ActionDecision::Denied(Denial {
                    reason: monthly_limit_reason(counter).to_string(),
                    limit,
                    used: Some(used),
                    upgrade_path: upgrade_path_for(plan),
                }))
            }
        }
    }

    async fn check_family_member_limit(
        &self,
        user_id: Uuid,
        plan: Plan,
    ) -> Result<ActionDecision, ServiceError> {
        let limit = plan.limits().max_family_members;
        if limit == 0 {
            return Ok(ActionDecision::Denied(Denial {
                reason: "Family members are a premium feature".to_string(),
                limit: 0,
                used: Some(0),
                upgrade_path: upgrade_path_for(plan),
            }));
        }

        let used = match self.bounded(self.store.get_household_id(user_id)).await? {
            Some(household_id) => {
                self.bounded(self.store.count_family_members(household_id))
                    .await?
            }
            None => 0,
        };

        if used < i64::from(limit) {
            return Ok(ActionDecision::Allowed);
        }
        Ok(ActionDecision::Denied(Denial {
            reason: format!("Your household can have at most {} family members", limit),
            limit,
            used: Some(used),
            upgrade_path: upgrade_path_for(plan),
        }))
    }

    async fn check_template_limit(
        &self,
        user_id: Uuid,
        plan: Plan,
    ) -> Result<ActionDecision, ServiceError> {
        let Some(limit) = plan.limits().max_templates else {
            return Ok(ActionDecision::Allowed);
        };

        let used = self.bounded(self.store.count_meal_templates(user_id)).await?;
        if used < i64::from(limit) {
            return Ok(ActionDecision::Allowed);
        }
        Ok(ActionDecision::Denied(Denial {
            reason: format!("You can save at most {} meal plan templates", limit),
            limit,
            used: Some(used),
            upgrade_path: upgrade_path_for(plan),
        }))
    }

    /// Counts a completed action against this month's quota. No-op for unmetered actions.
    pub async fn increment_usage(&self, user_id: Uuid, action: Action) -> Result<(), ServiceError> {
        let Some(counter) = action.usage_counter() else {
            return Ok(());
        };

        let period_start = current_period_start(Utc::now());
        self.bounded(self.store.increment_usage(user_id, period_start, counter))
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn premium_users_get_no_upgrade_path() {
        assert_eq!(upgrade_path_for(Plan::Free).as_deref(), Some(UPGRADE_PATH));
        assert_eq!(upgrade_path_for(Plan::Premium), None);
    }
}
