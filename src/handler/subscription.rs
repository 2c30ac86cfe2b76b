use std::sync::Arc;

use axum::{
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use validator::Validate;

use crate::{
    dtos::{
        subscriptiondtos::{ActionRequestDto, CanPerformActionResponseDto},
        DataResponse, Response,
    },
    error::HttpError,
    middleware::AuthenticatedUser,
    models::usagemodels::Action,
    AppState,
};

pub fn subscription_handler() -> Router {
    Router::new()
        .route("/", get(get_subscription))
        .route("/check", post(check_action))
        .route("/usage", post(record_usage))
}

pub async fn get_subscription(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, HttpError> {
    let subscription = app_state
        .subscription_service
        .get_user_subscription(Some(user.user_id))
        .await?;

    Ok(Json(DataResponse::success(subscription)))
}

pub async fn check_action(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<ActionRequestDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    // Unknown action names are not gated.
    let action = match body.action.parse::<Action>() {
        Ok(action) => action,
        Err(e) => {
            tracing::warn!("Allowing {} for user {}: no quota policy", e, user.user_id);
            return Ok(Json(CanPerformActionResponseDto::allowed()));
        }
    };

    let decision = app_state
        .subscription_service
        .can_perform_action(user.user_id, action)
        .await?;

    Ok(Json(CanPerformActionResponseDto::from(decision)))
}

pub async fn record_usage(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<ActionRequestDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    match body.action.parse::<Action>() {
        Ok(action) => {
            app_state
                .subscription_service
                .increment_usage(user.user_id, action)
                .await?;
        }
        Err(e) => tracing::warn!("Not counting usage for {}: no quota policy", e),
    }

    Ok(Json(Response {
        status: "success",
        message: "Usage recorded".to_string(),
    }))
}
