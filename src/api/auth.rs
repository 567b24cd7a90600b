//! Registration and login endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::user::{LoginRequest, RegisterRequest, Role, User},
};

use super::ValidatedJson;

/// Login response
#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    /// JWT bearer token, valid for one hour by default
    pub token: String,
    pub user: User,
}

/// Register a new user account
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = User),
        (status = 400, description = "Invalid input or email already registered", body = crate::error::ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<crate::AppState>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = state
        .services
        .auth
        .register(&request.name, &request.email, &request.password, Role::User)
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Authenticate with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Unknown email or invalid password", body = crate::error::ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<crate::AppState>,
    body: Result<ValidatedJson<LoginRequest>, AppError>,
) -> AppResult<Json<LoginResponse>> {
    let ValidatedJson(request) = body.map_err(login_failure)?;

    let (token, user) = state
        .services
        .auth
        .login(&request.email, &request.password)
        .await
        .map_err(login_failure)?;

    Ok(Json(LoginResponse { token, user }))
}

/// Every client-side login failure is reported as 401
fn login_failure(e: AppError) -> AppError {
    match e {
        AppError::Validation(msg) | AppError::NotFound(msg) => AppError::Authentication(msg),
        other => other,
    }
}
