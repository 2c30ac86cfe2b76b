use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::service::subscription_service::ActionDecision;

#[derive(Debug, Clone, Validate, Deserialize, Serialize)]
pub struct ActionRequestDto {
    #[validate(length(min = 1, max = 64, message = "Action is required"))]
    pub action: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CanPerformActionResponseDto {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upgrade_path: Option<String>,
}

impl CanPerformActionResponseDto {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
            limit: None,
            used: None,
            upgrade_path: None,
        }
    }
}

impl From<ActionDecision> for CanPerformActionResponseDto {
    fn from(decision: ActionDecision) -> Self {
        match decision {
            ActionDecision::Allowed => Self::allowed(),
            ActionDecision::Denied(denial) => Self {
                allowed: false,
                reason: Some(denial.reason),
                limit: Some(denial.limit),
                used: denial.used,
                upgrade_path: denial.upgrade_path,
            },
        }
    }
}
