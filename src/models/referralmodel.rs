use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, sqlx::FromRow)]
pub struct ReferralCode {
    pub id: Uuid,
    pub user_id: Uuid,
    pub code: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "referral_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReferralStatus {
    Pending,
    Completed,
}

impl ReferralStatus {
    pub fn to_str(&self) -> &'static str {
        match self {
            ReferralStatus::Pending => "pending",
            ReferralStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, sqlx::FromRow)]
pub struct Referral {
    pub id: Uuid,
    pub referrer_id: Uuid,
    pub referred_id: Uuid,
    pub referral_code_id: Uuid,
    pub status: ReferralStatus,
    pub referrer_rewarded: bool,
    pub referred_rewarded: bool,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy)]
pub struct NewReferral {
    pub referrer_id: Uuid,
    pub referred_id: Uuid,
    pub referral_code_id: Uuid,
}

/// Cached aggregate over a referrer's history. Re-derivable at any time.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, sqlx::FromRow)]
pub struct ReferralStats {
    pub user_id: Uuid,
    pub total_invited: i32,
    pub total_converted: i32,
    pub total_days_earned: i32,
    pub last_referral_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl ReferralStats {
    pub fn empty(user_id: Uuid) -> Self {
        Self {
            user_id,
            total_invited: 0,
            total_converted: 0,
            total_days_earned: 0,
            last_referral_at: None,
            updated_at: Utc::now(),
        }
    }
}

/// A referral made by the user, without anything identifying the referred person.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, sqlx::FromRow)]
pub struct RecentReferral {
    pub id: Uuid,
    pub status: ReferralStatus,
    pub referrer_rewarded: bool,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&Referral> for RecentReferral {
    fn from(referral: &Referral) -> Self {
        Self {
            id: referral.id,
            status: referral.status,
            referrer_rewarded: referral.referrer_rewarded,
            created_at: referral.created_at,
            completed_at: referral.completed_at,
        }
    }
}
