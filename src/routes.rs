use std::sync::Arc;

use axum::{middleware, routing::{get, post}, Extension, Json, Router};
use tower_http::trace::TraceLayer;
use serde_json::json;

use crate::{
    handler::{
        referral::{referral_handler, validate_referral_code},
        subscription::subscription_handler,
    },
    middleware::auth,
    AppState,
};

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running"
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let protected_referral_routes = referral_handler().layer(middleware::from_fn(auth));

    let public_referral_routes = Router::new()
        .route("/validate", post(validate_referral_code));

    let api_route = Router::new()
        .route("/healthchecker", get(health_check))
        .nest(
            "/referral",
            Router::new()
                .merge(protected_referral_routes)
                .merge(public_referral_routes),
        )
        .nest(
            "/subscription",
            subscription_handler()
                .layer(middleware::from_fn(auth)),
        )
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state));

    Router::new().nest("/api", api_route)
}
