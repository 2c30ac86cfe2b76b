pub mod credit_service;
pub mod error;
pub mod referral;
pub mod referral_service;
pub mod subscription_service;
