use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response as HttpResponse},
    routing::{get, post},
    Extension, Json, Router,
};
use validator::Validate;

use crate::{
    dtos::{
        referraldtos::{
            CompleteReferralResponseDto, ReferralCodeDto, ReferralCodeResponseDto,
            ReferralRejectionResponseDto, ReferralStatsResponseDto,
            ValidateReferralCodeResponseDto,
        },
        DataResponse, Response,
    },
    error::HttpError,
    middleware::AuthenticatedUser,
    service::{referral::generate_referral_link, referral_service::RecordReferralOutcome},
    AppState,
};

pub fn referral_handler() -> Router {
    Router::new()
        .route("/code", get(get_referral_code))
        .route("/record", post(record_referral))
        .route("/complete", post(complete_referral))
        .route("/stats", get(get_referral_stats))
        .route("/status", get(get_referral_status))
}

pub async fn validate_referral_code(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<ReferralCodeDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let owner = app_state
        .referral_service
        .validate_referral_code(&body.code)
        .await?;

    Ok(Json(DataResponse::success(ValidateReferralCodeResponseDto {
        valid: owner.is_some(),
    })))
}

pub async fn get_referral_code(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, HttpError> {
    let referral_code = app_state
        .referral_service
        .get_or_create_referral_code(user.user_id)
        .await?;

    let referral_link = generate_referral_link(&app_state.env.app_url, &referral_code.code);

    Ok(Json(DataResponse::success(ReferralCodeResponseDto {
        referral_code,
        referral_link,
    })))
}

pub async fn record_referral(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<ReferralCodeDto>,
) -> Result<HttpResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let outcome = app_state
        .referral_service
        .record_pending_referral(user.user_id, &body.code)
        .await?;

    let response = match outcome {
        RecordReferralOutcome::Recorded(_) => (
            StatusCode::CREATED,
            Json(Response {
                status: "success",
                message: "Referral recorded".to_string(),
            }),
        )
            .into_response(),
        RecordReferralOutcome::Rejected(rejection) => (
            StatusCode::BAD_REQUEST,
            Json(ReferralRejectionResponseDto::from(rejection)),
        )
            .into_response(),
    };

    Ok(response)
}

pub async fn complete_referral(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, HttpError> {
    let outcome = app_state
        .referral_service
        .complete_referral(user.user_id)
        .await?;

    Ok(Json(DataResponse::success(CompleteReferralResponseDto::from(outcome))))
}

pub async fn get_referral_stats(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, HttpError> {
    let overview = app_state
        .referral_service
        .get_referral_stats(user.user_id)
        .await?;

    let referral_link = generate_referral_link(&app_state.env.app_url, &overview.referral_code.code);

    Ok(Json(DataResponse::success(ReferralStatsResponseDto {
        overview,
        referral_link,
    })))
}

pub async fn get_referral_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, HttpError> {
    let state = app_state
        .referral_service
        .was_user_referred(user.user_id)
        .await?;

    Ok(Json(DataResponse::success(state)))
}
