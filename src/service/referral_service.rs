use std::{fmt, future::Future, sync::Arc, time::Duration};

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    config::ReferralConfig,
    db::{query_timeout::QueryTimeout, Store, StoreError},
    models::{
        creditmodels::{CreditSource, NewPremiumCredit, PremiumCredits},
        referralmodel::{NewReferral, RecentReferral, Referral, ReferralCode, ReferralStats, ReferralStatus},
    },
    service::{credit_service::CreditService, error::ServiceError, referral},
};

pub const MAX_CODE_ATTEMPTS: u32 = 10;
const RECENT_REFERRALS_LIMIT: i64 = 10;

/// Why a referral could not be recorded. Shown to the user as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferralRejection {
    MissingParameters,
    InvalidCode,
    SelfReferral,
    AlreadyReferred,
}

impl ReferralRejection {
    pub fn code(&self) -> &'static str {
        match self {
            ReferralRejection::MissingParameters => "missing_parameters",
            ReferralRejection::InvalidCode => "invalid_code",
            ReferralRejection::SelfReferral => "self_referral",
            ReferralRejection::AlreadyReferred => "already_referred",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ReferralRejection::MissingParameters => "A user and a referral code are required",
            ReferralRejection::InvalidCode => "Invalid referral code",
            ReferralRejection::SelfReferral => "You cannot refer yourself",
            ReferralRejection::AlreadyReferred => "You have already been referred",
        }
    }
}

impl fmt::Display for ReferralRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordReferralOutcome {
    Recorded(Referral),
    Rejected(ReferralRejection),
}

/// Bonus days actually granted by a completion. The referrer side is 0 when capped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReferralBonuses {
    pub referral_id: Uuid,
    pub referrer_id: Uuid,
    pub referrer_bonus_days: i32,
    pub referred_bonus_days: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompleteReferralOutcome {
    NoPendingReferral,
    Completed(ReferralBonuses),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CodeOwner {
    pub user_id: Uuid,
    pub code_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferralOverview {
    pub referral_code: ReferralCode,
    pub is_code_active: bool,
    pub stats: ReferralStats,
    pub recent_referrals: Vec<RecentReferral>,
    pub premium_credits: PremiumCredits,
    pub config: ReferralConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReferredState {
    pub was_referred: bool,
    pub status: Option<ReferralStatus>,
}

/// Issues referral codes and drives referrals from `pending` to `completed`.
#[derive(Clone)]
pub struct ReferralService {
    store: Arc<dyn Store>,
    credits: CreditService,
    config: ReferralConfig,
    code_generator: fn() -> String,
    query_timeout: Option<Duration>,
}

impl ReferralService {
    pub fn new(store: Arc<dyn Store>, config: ReferralConfig) -> Self {
        Self {
            credits: CreditService::new(store.clone()),
            store,
            config,
            code_generator: referral::generate_referral_code,
            query_timeout: None,
        }
    }

    pub fn with_code_generator(mut self, code_generator: fn() -> String) -> Self {
        self.code_generator = code_generator;
        self
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

    /// Returns the user's code, creating it on first request.
    pub async fn get_or_create_referral_code(&self, user_id: Uuid) -> Result<ReferralCode, ServiceError> {
        if let Some(existing) = self.bounded(self.store.get_referral_code_by_user(user_id)).await? {
            return Ok(existing);
        }

        let code = self.generate_unique_code().await?;

        let row = match self.bounded(self.store.insert_referral_code(user_id, &code)).await {
            Ok(row) => row,
            Err(e) if e.is_unique_violation() => {
                tracing::info!("Referral code insert for {} lost a race, returning the stored code", user_id);
                self.bounded(self.store.get_referral_code_by_user(user_id))
                    .await?
                    .ok_or(ServiceError::CodeReconcileFailed(user_id))?
            }
            Err(e) => return Err(e.into()),
        };

        self.bounded(self.store.ensure_referral_stats(user_id)).await?;

        Ok(row)
    }

    async fn generate_unique_code(&self) -> Result<String, ServiceError> {
        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let candidate = (self.code_generator)();
            if !self.bounded(self.store.referral_code_exists(&candidate)).await? {
                return Ok(candidate);
            }
            tracing::debug!("Referral code collision on attempt {}", attempt);
        }

        tracing::error!("Referral code space exhausted after {} attempts", MAX_CODE_ATTEMPTS);
        Err(ServiceError::CodeGenerationExhausted(MAX_CODE_ATTEMPTS))
    }

    /// Owner of an active code, or `None`. Malformed codes never reach storage.
    pub async fn validate_referral_code(&self, code: &str) -> Result<Option<CodeOwner>, ServiceError> {
        let Some(code) = referral::normalize_referral_code(code) else {
            return Ok(None);
        };

        let owner = self
            .bounded(self.store.get_active_referral_code(&code))
            .await?
            .map(|row| CodeOwner {
                user_id: row.user_id,
                code_id: row.id,
            });

        Ok(owner)
    }

    /// Signup hook: records `referred_user_id` as referred by the owner of `code`.
    pub async fn record_pending_referral(
        &self,
        referred_user_id: Uuid,
        code: &str,
    ) -> Result<RecordReferralOutcome, ServiceError> {
        if referred_user_id.is_nil() || code.trim().is_empty() {
            return Ok(RecordReferralOutcome::Rejected(ReferralRejection::MissingParameters));
        }

        let Some(owner) = self.validate_referral_code(code).await? else {
            return Ok(RecordReferralOutcome::Rejected(ReferralRejection::InvalidCode));
        };

        if owner.user_id == referred_user_id {
            return Ok(RecordReferralOutcome::Rejected(ReferralRejection::SelfReferral));
        }

        // Advisory only, the unique index on referred_id decides races.
        if self
            .bounded(self.store.get_referral_by_referred(referred_user_id))
            .await?
            .is_some()
        {
            return Ok(RecordReferralOutcome::Rejected(ReferralRejection::AlreadyReferred));
        }

        let open_referrals = self
            .bounded(self.store.count_referrals(
                owner.user_id,
                &[ReferralStatus::Pending, ReferralStatus::Completed],
            ))
            .await?;
        if open_referrals >= self.config.max_referrals_per_user {
            tracing::warn!(
                "Referrer {} is at the referral cap ({}/{}), recording without referrer reward guarantee",
                owner.user_id,
                open_referrals,
                self.config.max_referrals_per_user
            );
        }

        let new_referral = NewReferral {
            referrer_id: owner.user_id,
            referred_id: referred_user_id,
            referral_code_id: owner.code_id,
        };

        match self.bounded(self.store.insert_referral(new_referral)).await {
            Ok(referral) => {
                tracing::info!(
                    "Referral recorded: {} referred {} (pending)",
                    referral.referrer_id,
                    referral.referred_id
                );
                Ok(RecordReferralOutcome::Recorded(referral))
            }
            Err(e) if e.is_unique_violation() => {
                Ok(RecordReferralOutcome::Rejected(ReferralRejection::AlreadyReferred))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Verification hook: completes the pending referral of `referred_user_id` and awards credits.
    ///
    /// Each side is credited at most once per referral. A credit that already exists counts as
    /// granted, so a retry after a failed completion finishes the job without paying twice.
    pub async fn complete_referral(
        &self,
        referred_user_id: Uuid,
    ) -> Result<CompleteReferralOutcome, ServiceError> {
        let Some(referral) = self
            .bounded(self.store.get_pending_referral(referred_user_id))
            .await?
        else {
            return Ok(CompleteReferralOutcome::NoPendingReferral);
        };

        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(self.config.credit_validity_days);

        let completed = self
            .bounded(self.store.count_referrals(referral.referrer_id, &[ReferralStatus::Completed]))
            .await?;
        let referrer_can_receive_bonus = completed < self.config.max_referrals_per_user;

        // The referred side's reward must land or the whole completion fails.
        let welcome = self
            .bounded(self.store.insert_premium_credit(NewPremiumCredit {
                user_id: referral.referred_id,
                days_amount: self.config.referred_bonus_days,
                source: CreditSource::ReferredWelcome,
                source_reference_id: Some(referral.id),
                expires_at,
            }))
            .await;
        match welcome {
            Ok(_) => {}
            Err(e) if e.is_unique_violation() => {
                tracing::info!("Welcome credit for referral {} already granted", referral.id);
            }
            Err(e) => return Err(e.into()),
        }

        let referrer_rewarded = if referrer_can_receive_bonus {
            let award = self
                .bounded(self.store.insert_premium_credit(NewPremiumCredit {
                    user_id: referral.referrer_id,
                    days_amount: self.config.referrer_bonus_days,
                    source: CreditSource::ReferralBonus,
                    source_reference_id: Some(referral.id),
                    expires_at,
                }))
                .await;

            match award {
                Ok(_) => true,
                Err(e) if e.is_unique_violation() => true,
                Err(e) => {
                    tracing::warn!(
                        "Failed to award referrer {} for referral {}: {}",
                        referral.referrer_id,
                        referral.id,
                        e
                    );
                    false
                }
            }
        } else {
            tracing::info!(
                "Referrer {} reached {} completed referrals, no bonus for referral {}",
                referral.referrer_id,
                completed,
                referral.id
            );
            false
        };

        let marked = self
            .bounded(self.store.mark_referral_completed(referral.id, referrer_rewarded, true, now))
            .await?;
        if marked.is_none() {
            tracing::info!("Referral {} was completed by a concurrent call", referral.id);
            return Ok(CompleteReferralOutcome::NoPendingReferral);
        }

        if let Err(e) = self
            .bounded(self.store.recalculate_referral_stats(referral.referrer_id))
            .await
        {
            tracing::warn!("Failed to refresh referral stats for {}: {}", referral.referrer_id, e);
        }

        let referrer_bonus_days = if referrer_rewarded { self.config.referrer_bonus_days } else { 0 };

        tracing::info!(
            "Referral {} completed: referred {} +{} days, referrer {} +{} days",
            referral.id,
            referral.referred_id,
            self.config.referred_bonus_days,
            referral.referrer_id,
            referrer_bonus_days
        );

        Ok(CompleteReferralOutcome::Completed(ReferralBonuses {
            referral_id: referral.id,
            referrer_id: referral.referrer_id,
            referrer_bonus_days,
            referred_bonus_days: self.config.referred_bonus_days,
        }))
    }

    pub async fn get_referral_stats(&self, user_id: Uuid) -> Result<ReferralOverview, ServiceError> {
        let referral_code = self.get_or_create_referral_code(user_id).await?;

        let stats = self
            .bounded(self.store.get_referral_stats(user_id))
            .await?
            .unwrap_or_else(|| ReferralStats::empty(user_id));

        let recent_referrals = self
            .bounded(self.store.get_recent_referrals(user_id, RECENT_REFERRALS_LIMIT))
            .await?;

        let premium_credits = self.credits.get_premium_credits(user_id).await?;

        Ok(ReferralOverview {
            is_code_active: referral_code.is_active,
            referral_code,
            stats,
            recent_referrals,
            premium_credits,
            config: self.config,
        })
    }

    pub async fn was_user_referred(&self, user_id: Uuid) -> Result<ReferredState, ServiceError> {
        let referral = self
            .bounded(self.store.get_referral_by_referred(user_id))
            .await?;

        Ok(ReferredState {
            was_referred: referral.is_some(),
            status: referral.map(|row| row.status),
        })
    }
}
