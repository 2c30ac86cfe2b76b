use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    models::referralmodel::ReferralCode,
    service::referral_service::{CompleteReferralOutcome, ReferralOverview, ReferralRejection},
};

#[derive(Debug, Clone, Validate, Deserialize, Serialize)]
pub struct ReferralCodeDto {
    #[validate(length(min = 1, max = 64, message = "Referral code is required"))]
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateReferralCodeResponseDto {
    pub valid: bool,
}

/// Body of a refused referral: `code` is stable, `message` is display copy.
#[derive(Debug, Serialize)]
pub struct ReferralRejectionResponseDto {
    pub status: &'static str,
    pub code: &'static str,
    pub message: &'static str,
}

impl From<ReferralRejection> for ReferralRejectionResponseDto {
    fn from(rejection: ReferralRejection) -> Self {
        Self {
            status: "fail",
            code: rejection.code(),
            message: rejection.message(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReferralCodeResponseDto {
    pub referral_code: ReferralCode,
    pub referral_link: String,
}

#[derive(Debug, Serialize)]
pub struct ReferralStatsResponseDto {
    #[serde(flatten)]
    pub overview: ReferralOverview,
    pub referral_link: String,
}

#[derive(Debug, Serialize)]
pub struct CompleteReferralResponseDto {
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer_bonus_days: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referred_bonus_days: Option<i32>,
}

impl From<CompleteReferralOutcome> for CompleteReferralResponseDto {
    fn from(outcome: CompleteReferralOutcome) -> Self {
        match outcome {
            CompleteReferralOutcome::NoPendingReferral => Self {
                completed: false,
                reason: Some("no_pending_referral"),
                referrer_bonus_days: None,
                referred_bonus_days: None,
            },
            CompleteReferralOutcome::Completed(bonuses) => Self {
                completed: true,
                reason: None,
                referrer_bonus_days: Some(bonuses.referrer_bonus_days),
                referred_bonus_days: Some(bonuses.referred_bonus_days),
            },
        }
    }
}
