//! Login, device, and settings handlers.

use axum::Json;
use axum::extract::State;

use crate::dto::request::{LoginBody, RegisterDeviceBody, SettingsBody};
use crate::dto::response::{
    ApiResponse, DeviceResponse, LoginResponse, MessageResponse, RegisterDeviceResponse,
};
use crate::error::ApiError;
use crate::extractors::{AuthAccount, ValidatedJson};
use crate::state::AppState;

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<LoginBody>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let outcome = state.accounts.login(body.into()).await?;
    let key = outcome.account.key();
    let device_token = outcome.device.as_ref().map(|d| d.token.as_str());
    let (token, expires_at) = state.jwt_encoder.issue(&key, device_token)?;

    Ok(Json(ApiResponse::ok(LoginResponse {
        token,
        expires_at,
        created: outcome.created,
        full_name: outcome.account.full_name,
        student_class: outcome.account.student_class,
        establishment: outcome.account.establishment,
        device: outcome.device.map(DeviceResponse::from),
    })))
}

/// POST /device
pub async fn register_device(
    State(state): State<AppState>,
    auth: AuthAccount,
    ValidatedJson(body): ValidatedJson<RegisterDeviceBody>,
) -> Result<Json<ApiResponse<RegisterDeviceResponse>>, ApiError> {
    let device = state
        .accounts
        .register_device(&auth.key, &body.device_token, body.device_id.as_deref())
        .await?;
    let (token, expires_at) = state.jwt_encoder.issue(&auth.key, Some(&device.token))?;

    Ok(Json(ApiResponse::ok(RegisterDeviceResponse {
        token,
        expires_at,
        device: device.into(),
    })))
}

/// POST /logout
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthAccount,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.accounts.logout_device(&auth.key, auth.device()?).await?;
    Ok(Json(ApiResponse::ok(MessageResponse::new("Logged out"))))
}

/// POST /settings
pub async fn update_settings(
    State(state): State<AppState>,
    auth: AuthAccount,
    ValidatedJson(body): ValidatedJson<SettingsBody>,
) -> Result<Json<ApiResponse<DeviceResponse>>, ApiError> {
    let device = state
        .accounts
        .update_settings(&auth.key, auth.device()?, &body.into())
        .await?;
    Ok(Json(ApiResponse::ok(device.into())))
}
