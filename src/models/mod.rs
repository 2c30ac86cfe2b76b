pub mod creditmodels;
pub mod referralmodel;
pub mod subscriptionmodels;
pub mod usagemodels;
