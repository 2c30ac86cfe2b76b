pub mod referral;
pub mod subscription;
