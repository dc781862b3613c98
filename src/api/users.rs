//! User registration, login and lookup handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::info;

use crate::error::{AppError, Result};
use crate::user_models::{
    LoginRequest, LoginResponse, PublicUser, RegisterRequest, RegisterResponse, User, UserSummary,
};
use crate::AppState;

/// POST /api/users
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    let (name, email, password) = match (payload.name, payload.email, payload.password) {
        (Some(name), Some(email), Some(password))
            if !name.trim().is_empty() && !email.trim().is_empty() && !password.is_empty() =>
        {
            (name.trim().to_string(), email.trim().to_string(), password)
        }
        _ => {
            return Err(AppError::BadRequest(
                "Please provide name, email and password".to_string(),
            ))
        }
    };

    let password_hash = state.credentials.hash_password(&password).await?;
    let user = state
        .users
        .create_user(User::new(name, email, password_hash))
        .await?;
    let token = state.credentials.issue_token(&user.id)?;

    info!(user_id = %user.id, "Registered user");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            id: user.id,
            name: user.name,
            email: user.email,
            token,
        }),
    ))
}

/// POST /api/users/login
pub async fn login_user(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let invalid = || AppError::BadRequest("Invalid email or password".to_string());

    let (Some(email), Some(password)) = (payload.email, payload.password) else {
        return Err(AppError::BadRequest(
            "Please provide email and password".to_string(),
        ));
    };

    let user = state
        .users
        .get_user_by_email(email.trim())
        .await?
        .ok_or_else(invalid)?;

    if !state
        .credentials
        .verify_password(&password, &user.password_hash)
        .await?
    {
        return Err(invalid());
    }

    let token = state.credentials.issue_token(&user.id)?;
    info!(user_id = %user.id, "User logged in");

    Ok(Json(LoginResponse {
        success: true,
        token,
        user: UserSummary {
            id: user.id,
            name: user.name,
            email: user.email,
        },
    }))
}

/// GET /api/users/me
pub async fn get_me(Extension(user): Extension<PublicUser>) -> Json<PublicUser> {
    Json(user)
}

/// GET /api/users/:id - the user's name as a bare JSON string
pub async fn get_user_name(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<String>> {
    let user = state
        .users
        .get_user(&id)
        .await?
        .ok_or_else(|| AppError::BadRequest("User does not exist".to_string()))?;

    Ok(Json(user.name))
}
