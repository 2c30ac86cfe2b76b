//! In-memory store with the same uniqueness rules as the Postgres schema.
//!
//! Used by the test suites and for running the API without a database. Faults
//! and lost races can be injected to drive the recovery paths of the services.

use std::{
    collections::{HashMap, HashSet},
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    creditdb::CreditExt, householddb::HouseholdExt, referraldb::ReferralExt,
    subscriptiondb::SubscriptionExt, usagedb::UsageExt, StoreError,
};
use crate::models::{
    creditmodels::{CreditSource, NewPremiumCredit, PremiumCredit},
    referralmodel::{NewReferral, RecentReferral, Referral, ReferralCode, ReferralStats, ReferralStatus},
    subscriptionmodels::Subscription,
    usagemodels::{UsageCounter, UsageCounters},
};

#[derive(Default)]
struct MemoryState {
    codes: Vec<ReferralCode>,
    referrals: Vec<Referral>,
    credits: Vec<PremiumCredit>,
    stats: HashMap<Uuid, ReferralStats>,
    subscriptions: HashMap<Uuid, Subscription>,
    usage: HashMap<(Uuid, NaiveDate), UsageCounters>,
    households: HashMap<Uuid, Uuid>,
    family_members: HashMap<Uuid, i64>,
    templates: HashMap<Uuid, i64>,
    failing_credit_users: HashSet<Uuid>,
    fail_stats_recompute: bool,
    fail_next_completion_update: bool,
    pending_lookup_delay: Option<Duration>,
    code_insert_races: HashMap<Uuid, String>,
    referral_insert_races: HashMap<Uuid, Uuid>,
}

impl MemoryState {
    fn insert_code(&mut self, user_id: Uuid, code: &str) -> Result<ReferralCode, StoreError> {
        if self.codes.iter().any(|row| row.user_id == user_id) {
            return Err(StoreError::UniqueViolation("referral_codes_user_id_key".to_string()));
        }
        if self.codes.iter().any(|row| row.code == code) {
            return Err(StoreError::UniqueViolation("referral_codes_code_key".to_string()));
        }

        let row = ReferralCode {
            id: Uuid::new_v4(),
            user_id,
            code: code.to_string(),
            is_active: true,
            created_at: Utc::now(),
        };
        self.codes.push(row.clone());
        Ok(row)
    }

    fn insert_referral(&mut self, referral: NewReferral) -> Result<Referral, StoreError> {
        if self.referrals.iter().any(|row| row.referred_id == referral.referred_id) {
            return Err(StoreError::UniqueViolation("referrals_referred_id_key".to_string()));
        }

        let row = Referral {
            id: Uuid::new_v4(),
            referrer_id: referral.referrer_id,
            referred_id: referral.referred_id,
            referral_code_id: referral.referral_code_id,
            status: ReferralStatus::Pending,
            referrer_rewarded: false,
            referred_rewarded: false,
            created_at: Utc::now(),
            completed_at: None,
        };
        self.referrals.push(row.clone());
        Ok(row)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a credit row as-is, including consumed or already expired ones.
    pub async fn seed_credit(&self, credit: PremiumCredit) {
        self.state.lock().await.credits.push(credit);
    }

    pub async fn set_household(&self, user_id: Uuid, household_id: Uuid, members: i64) {
        let mut state = self.state.lock().await;
        state.households.insert(user_id, household_id);
        state.family_members.insert(household_id, members);
    }

    pub async fn set_template_count(&self, user_id: Uuid, templates: i64) {
        self.state.lock().await.templates.insert(user_id, templates);
    }

    pub async fn set_usage(&self, usage: UsageCounters) {
        self.state
            .lock()
            .await
            .usage
            .insert((usage.user_id, usage.period_start), usage);
    }

    /// Every later credit insert for `user_id` fails with `Unavailable`.
    pub async fn fail_credit_inserts_for(&self, user_id: Uuid) {
        self.state.lock().await.failing_credit_users.insert(user_id);
    }

    pub async fn fail_stats_recompute(&self) {
        self.state.lock().await.fail_stats_recompute = true;
    }

    /// The next completion update fails with `Unavailable`, after the credits were written.
    pub async fn fail_next_completion_update(&self) {
        self.state.lock().await.fail_next_completion_update = true;
    }

    /// Pending-referral lookups return only after `delay`, so concurrent completions
    /// all see the referral as pending.
    pub async fn delay_pending_lookups(&self, delay: Duration) {
        self.state.lock().await.pending_lookup_delay = Some(delay);
    }

    /// The next code insert for `user_id` loses to a concurrent insert of `competing_code`.
    pub async fn race_next_code_insert(&self, user_id: Uuid, competing_code: &str) {
        self.state
            .lock()
            .await
            .code_insert_races
            .insert(user_id, competing_code.to_string());
    }

    /// The next referral insert for `referred_id` loses to a concurrent one from `competing_referrer`.
    pub async fn race_next_referral_insert(&self, referred_id: Uuid, competing_referrer: Uuid) {
        self.state
            .lock()
            .await
            .referral_insert_races
            .insert(referred_id, competing_referrer);
    }

    pub async fn referral_codes_for(&self, user_id: Uuid) -> Vec<ReferralCode> {
        self.state
            .lock()
            .await
            .codes
            .iter()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect()
    }

    pub async fn referrals_for(&self, referred_id: Uuid) -> Vec<Referral> {
        self.state
            .lock()
            .await
            .referrals
            .iter()
            .filter(|row| row.referred_id == referred_id)
            .cloned()
            .collect()
    }

    pub async fn credits_for(&self, user_id: Uuid) -> Vec<PremiumCredit> {
        self.state
            .lock()
            .await
            .credits
            .iter()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ReferralExt for MemoryStore {
    async fn get_referral_code_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<ReferralCode>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.codes.iter().find(|row| row.user_id == user_id).cloned())
    }

    async fn get_active_referral_code(
        &self,
        code: &str,
    ) -> Result<Option<ReferralCode>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .codes
            .iter()
            .find(|row| row.code == code && row.is_active)
            .cloned())
    }

    async fn referral_code_exists(&self, code: &str) -> Result<bool, StoreError> {
        let state = self.state.lock().await;
        Ok(state.codes.iter().any(|row| row.code == code))
    }

    async fn insert_referral_code(
        &self,
        user_id: Uuid,
        code: &str,
    ) -> Result<ReferralCode, StoreError> {
        let mut state = self.state.lock().await;
        if let Some(competing_code) = state.code_insert_races.remove(&user_id) {
            state.insert_code(user_id, &competing_code)?;
        }
        state.insert_code(user_id, code)
    }

    async fn ensure_referral_stats(&self, user_id: Uuid) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state
            .stats
            .entry(user_id)
            .or_insert_with(|| ReferralStats::empty(user_id));
        Ok(())
    }

    async fn get_referral_by_referred(
        &self,
        referred_id: Uuid,
    ) -> Result<Option<Referral>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .referrals
            .iter()
            .find(|row| row.referred_id == referred_id)
            .cloned())
    }

    async fn get_pending_referral(
        &self,
        referred_id: Uuid,
    ) -> Result<Option<Referral>, StoreError> {
        let (referral, delay) = {
            let state = self.state.lock().await;
            let referral = state
                .referrals
                .iter()
                .find(|row| row.referred_id == referred_id && row.status == ReferralStatus::Pending)
                .cloned();
            (referral, state.pending_lookup_delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(referral)
    }

    async fn count_referrals(
        &self,
        referrer_id: Uuid,
        statuses: &[ReferralStatus],
    ) -> Result<i64, StoreError> {
        let state = self.state.lock().await;
        let count = state
            .referrals
            .iter()
            .filter(|row| row.referrer_id == referrer_id && statuses.contains(&row.status))
            .count();
        Ok(count as i64)
    }

    async fn insert_referral(&self, referral: NewReferral) -> Result<Referral, StoreError> {
        let mut state = self.state.lock().await;
        if let Some(competing_referrer) = state.referral_insert_races.remove(&referral.referred_id) {
            state.insert_referral(NewReferral {
                referrer_id: competing_referrer,
                ..referral
            })?;
        }
        state.insert_referral(referral)
    }

    async fn mark_referral_completed(
        &self,
        referral_id: Uuid,
        referrer_rewarded: bool,
        referred_rewarded: bool,
        completed_at: DateTime<Utc>,
    ) -> Result<Option<Referral>, StoreError> {
        let mut state = self.state.lock().await;
        if state.fail_next_completion_update {
            state.fail_next_completion_update = false;
            return Err(StoreError::Unavailable("referral update rejected".to_string()));
        }

        let Some(row) = state
            .referrals
            .iter_mut()
            .find(|row| row.id == referral_id && row.status == ReferralStatus::Pending)
        else {
            return Ok(None);
        };

        row.status = ReferralStatus::Completed;
        row.referrer_rewarded = referrer_rewarded;
        row.referred_rewarded = referred_rewarded;
        row.completed_at = Some(completed_at);
        Ok(Some(row.clone()))
    }

    async fn recalculate_referral_stats(&self, user_id: Uuid) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.fail_stats_recompute {
            return Err(StoreError::Unavailable("stats procedure unavailable".to_string()));
        }

        let made: Vec<&Referral> = state
            .referrals
            .iter()
            .filter(|row| row.referrer_id == user_id)
            .collect();
        let total_invited = made.len() as i32;
        let total_converted = made
            .iter()
            .filter(|row| row.status == ReferralStatus::Completed)
            .count() as i32;
        let last_referral_at = made.iter().map(|row| row.created_at).max();
        let total_days_earned = state
            .credits
            .iter()
            .filter(|credit| credit.user_id == user_id && credit.source == CreditSource::ReferralBonus)
            .map(|credit| credit.days_amount)
            .sum();

        state.stats.insert(
            user_id,
            ReferralStats {
                user_id,
                total_invited,
                total_converted,
                total_days_earned,
                last_referral_at,
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn get_referral_stats(
        &self,
        user_id: Uuid,
    ) -> Result<Option<ReferralStats>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.stats.get(&user_id).cloned())
    }

    async fn get_recent_referrals(
        &self,
        referrer_id: Uuid,
        limit: i64,
    ) -> Result<Vec<RecentReferral>, StoreError> {
        let state = self.state.lock().await;
        let mut made: Vec<&Referral> = state
            .referrals
            .iter()
            .filter(|row| row.referrer_id == referrer_id)
            .collect();
        made.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(made
            .into_iter()
            .take(usize::try_from(limit).unwrap_or(0))
            .map(RecentReferral::from)
            .collect())
    }
}

#[async_trait]
impl CreditExt for MemoryStore {
    async fn insert_premium_credit(
        &self,
        credit: NewPremiumCredit,
    ) -> Result<PremiumCredit, StoreError> {
        let mut state = self.state.lock().await;
        if state.failing_credit_users.contains(&credit.user_id) {
            return Err(StoreError::Unavailable(format!(
                "credit write rejected for user {}",
                credit.user_id
            )));
        }
        if credit.source_reference_id.is_some()
            && state.credits.iter().any(|row| {
                row.source == credit.source && row.source_reference_id == credit.source_reference_id
            })
        {
            return Err(StoreError::UniqueViolation(
                "premium_credits_source_reference_key".to_string(),
            ));
        }

        let row = PremiumCredit {
            id: Uuid::new_v4(),
            user_id: credit.user_id,
            days_amount: credit.days_amount,
            source: credit.source,
            source_reference_id: credit.source_reference_id,
            expires_at: credit.expires_at,
            consumed: false,
            created_at: Utc::now(),
        };
        state.credits.push(row.clone());
        Ok(row)
    }

    async fn get_active_premium_credits(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<PremiumCredit>, StoreError> {
        let state = self.state.lock().await;
        let mut credits: Vec<PremiumCredit> = state
            .credits
            .iter()
            .filter(|credit| credit.user_id == user_id && credit.is_live(now))
            .cloned()
            .collect();
        credits.sort_by_key(|credit| credit.expires_at);
        Ok(credits)
    }
}

#[async_trait]
impl SubscriptionExt for MemoryStore {
    async fn get_subscription(
        &self,
        user_id: Uuid,
    ) -> Result<Option<Subscription>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.subscriptions.get(&user_id).cloned())
    }

    async fn upsert_subscription(
        &self,
        subscription: &Subscription,
    ) -> Result<Subscription, StoreError> {
        let mut state = self.state.lock().await;
        let row = Subscription {
            updated_at: Utc::now(),
            ..subscription.clone()
        };
        state.subscriptions.insert(row.user_id, row.clone());
        Ok(row)
    }
}

#[async_trait]
impl UsageExt for MemoryStore {
    async fn get_usage(
        &self,
        user_id: Uuid,
        period_start: NaiveDate,
    ) -> Result<Option<UsageCounters>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.usage.get(&(user_id, period_start)).cloned())
    }

    async fn increment_usage(
        &self,
        user_id: Uuid,
        period_start: NaiveDate,
        counter: UsageCounter,
    ) -> Result<UsageCounters, StoreError> {
        let mut state = self.state.lock().await;
        let usage = state
            .usage
            .entry((user_id, period_start))
            .or_insert_with(|| UsageCounters::empty(user_id, period_start));
        usage.increment(counter);
        Ok(usage.clone())
    }
}

#[async_trait]
impl HouseholdExt for MemoryStore {
    async fn get_household_id(&self, user_id: Uuid) -> Result<Option<Uuid>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.households.get(&user_id).copied())
    }

    async fn count_family_members(&self, household_id: Uuid) -> Result<i64, StoreError> {
        let state = self.state.lock().await;
        Ok(state.family_members.get(&household_id).copied().unwrap_or(0))
    }

    async fn count_meal_templates(&self, user_id: Uuid) -> Result<i64, StoreError> {
        let state = self.state.lock().await;
        Ok(state.templates.get(&user_id).copied().unwrap_or(0))
    }
}
