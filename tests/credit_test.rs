mod common;

use chrono::{Duration, Utc};
use common::TestApp;
use premium_ledger::service::credit_service::CreditService;
use uuid::Uuid;

fn credit_service(app: &TestApp) -> CreditService {
    CreditService::new(app.store.clone())
}

#[tokio::test]
async fn user_without_credits_has_an_empty_balance() {
    let app = TestApp::spawn();

    let balance = credit_service(&app).get_premium_credits(Uuid::new_v4()).await.unwrap();

    assert!(!balance.has_credits);
    assert_eq!(balance.total_days, 0);
    assert!(balance.credits.is_empty());
}

#[tokio::test]
async fn consumed_and_expired_credits_are_ignored() {
    let app = TestApp::spawn();
    let user_id = Uuid::new_v4();
    let now = Utc::now();

    app.seed_credit(user_id, 7, now + Duration::days(10), true).await;
    app.seed_credit(user_id, 7, now - Duration::hours(1), false).await;

    let balance = credit_service(&app).get_premium_credits(user_id).await.unwrap();

    assert!(!balance.has_credits);
    assert_eq!(balance.total_days, 0);
}

#[tokio::test]
async fn live_credits_are_ordered_by_expiry_and_summed_by_remaining_days() {
    let app = TestApp::spawn();
    let user_id = Uuid::new_v4();
    let now = Utc::now();

    app.seed_credit(user_id, 7, now + Duration::days(30) + Duration::hours(1), false).await;
    app.seed_credit(user_id, 7, now + Duration::days(2) + Duration::hours(1), false).await;
    app.seed_credit(user_id, 7, now - Duration::days(1), false).await;
    app.seed_credit(Uuid::new_v4(), 7, now + Duration::days(50), false).await;

    let balance = credit_service(&app).get_premium_credits(user_id).await.unwrap();

    assert!(balance.has_credits);
    assert_eq!(balance.credits.len(), 2);
    assert!(balance.credits[0].expires_at < balance.credits[1].expires_at);
    // 31 + 3 remaining days, not 7 + 7 granted days.
    assert_eq!(balance.total_days, 34);
}

#[tokio::test]
async fn completed_referral_shows_up_in_the_referred_balance() {
    let app = TestApp::spawn();
    let (_, code) = app.referrer().await;
    let referred_id = app.convert(&code).await;

    let balance = credit_service(&app).get_premium_credits(referred_id).await.unwrap();

    assert!(balance.has_credits);
    assert_eq!(balance.credits.len(), 1);
    assert_eq!(balance.total_days, app.config.credit_validity_days);
}
