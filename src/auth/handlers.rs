use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RefreshRequest, RegisterResponse},
        extractors::AuthUser,
        jwt::JwtKeys,
        repo_types::Account,
        services::{account, authenticate, is_valid_email},
    },
    error::internal,
    state::AppState,
    users::{
        dto::Registration,
        services::{register as register_user, RegisterOutcome},
    },
};

type ApiError = (StatusCode, String);

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn issue_tokens(state: &AppState, account: Account) -> Result<Json<AuthResponse>, ApiError> {
    let keys = JwtKeys::from_ref(state);
    let sign_failed = |e: anyhow::Error| {
        error!(error = %e, "jwt sign failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
    };
    let access_token = keys.sign_access(account.user_id).map_err(sign_failed)?;
    let refresh_token = keys.sign_refresh(account.user_id).map_err(sign_failed)?;
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser {
            id: account.user_id,
            username: account.username,
            is_admin: account.is_admin,
        },
    }))
}

/// Active account for a token subject; suspended accounts get no tokens.
async fn active_account(state: &AppState, user_id: i64) -> Result<Account, ApiError> {
    let account = account(&state.db, user_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::UNAUTHORIZED, "user not found".to_string()))?;
    if account.suspended {
        warn!(user_id, "suspended account");
        return Err((StatusCode::FORBIDDEN, "account suspended".into()));
    }
    Ok(account)
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<Registration>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    payload.username = payload.username.trim().to_string();
    payload.email = payload.email.trim().to_lowercase();

    if payload.username.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "username is required".into()));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "invalid email".into()));
    }
    if payload.password.len() < 8 {
        warn!("password too short");
        return Err((StatusCode::BAD_REQUEST, "password too short".into()));
    }

    let username = payload.username.clone();
    match register_user(&state.db, payload).await.map_err(internal)? {
        RegisterOutcome::Created(id) => {
            info!(user_id = id, username = %username, "account opened");
            Ok((StatusCode::CREATED, Json(RegisterResponse { id, username })))
        }
        RegisterOutcome::AlreadyExists => {
            Err((StatusCode::CONFLICT, "username already taken".into()))
        }
        RegisterOutcome::Failed => Err((StatusCode::BAD_REQUEST, "registration failed".into())),
    }
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let username = payload.username.trim();
    let Some(credential) = authenticate(&state.db, username, &payload.password).await else {
        return Err((StatusCode::UNAUTHORIZED, "invalid credentials".into()));
    };
    let account = active_account(&state, credential.user_id).await?;
    info!(user_id = account.user_id, "user logged in");
    issue_tokens(&state, account)
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify_refresh(&payload.refresh_token).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        (StatusCode::UNAUTHORIZED, "invalid refresh token".to_string())
    })?;
    let account = active_account(&state, claims.sub).await?;
    issue_tokens(&state, account)
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    let account = account(&state.db, user_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::UNAUTHORIZED, "user not found".to_string()))?;
    Ok(Json(PublicUser {
        id: account.user_id,
        username: account.username,
        is_admin: account.is_admin,
    }))
}
