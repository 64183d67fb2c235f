use axum::{Extension, Json, extract::State, http::StatusCode};
use serde_json::json;

use crate::{
    AppState,
    error::{AppError, Result},
    models::{AuthResponse, LoginRequest, RegisterRequest, UserRole},
    queries::user_queries,
    utils::jwt::{self, Claims},
};

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    if payload.username.is_empty() || payload.password.is_empty() {
        return Err(AppError::BadRequest(
            "Необходимо указать имя пользователя и пароль".to_string(),
        ));
    }

    // One message for unknown user and wrong password
    let user = user_queries::find_by_username(&state.db, &payload.username)
        .await?
        .ok_or_else(|| {
            AppError::Unauthorized("Неверное имя пользователя или пароль".to_string())
        })?;

    let is_valid = bcrypt::verify(&payload.password, &user.password)
        .map_err(|e| AppError::InternalError(format!("Password verification failed: {}", e)))?;

    if !is_valid {
        return Err(AppError::Unauthorized(
            "Неверное имя пользователя или пароль".to_string(),
        ));
    }

    let token = jwt::generate_token(&state.auth, user.id, user.role)?;

    Ok(Json(AuthResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        role: user.role,
        token,
    }))
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    if payload.username.is_empty() || payload.password.is_empty() {
        return Err(AppError::BadRequest(
            "Необходимо указать имя пользователя и пароль".to_string(),
        ));
    }

    if user_queries::find_by_username(&state.db, &payload.username)
        .await?
        .is_some()
    {
        return Err(AppError::BadRequest(
            "Пользователь с таким именем уже существует".to_string(),
        ));
    }

    let password_hash = bcrypt::hash(&payload.password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::InternalError(format!("Password hashing failed: {}", e)))?;

    // Self-registration always gets the least-privileged role; admins are
    // created through the back office.
    let user = user_queries::create_user(
        &state.db,
        &payload.username,
        &password_hash,
        payload.email.as_deref(),
        UserRole::User,
    )
    .await?;

    let token = jwt::generate_token(&state.auth, user.id, user.role)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            token,
        }),
    ))
}

pub async fn me(Extension(claims): Extension<Claims>) -> Json<serde_json::Value> {
    Json(json!({
        "id": claims.sub,
        "role": claims.role,
    }))
}
