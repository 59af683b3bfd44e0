use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        extractors::AuthUser,
        services::{can_delete_user, can_edit_user, can_moderate_user, is_admin, is_valid_email},
    },
    dto::MessageResponse,
    error::{forbidden, internal, not_found},
    sparse::Field,
    state::AppState,
    users::{
        dto::{Profile, UserUpdate},
        repo_types::UserSummary,
        services,
    },
};

type ApiError = (StatusCode, String);

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route(
            "/users/:id",
            get(get_profile).put(update_user).delete(delete_user),
        )
        .route("/users/:id/suspend", post(suspend_user))
        .route("/users/:id/unsuspend", post(unsuspend_user))
}

fn validate_update(update: &mut UserUpdate) -> Result<(), ApiError> {
    if let Field::Set(username) = &mut update.username {
        *username = username.trim().to_string();
        if username.is_empty() {
            return Err((StatusCode::BAD_REQUEST, "username cannot be blank".into()));
        }
    }
    if let Field::Set(email) = &mut update.email {
        *email = email.trim().to_lowercase();
        if !is_valid_email(email) {
            return Err((StatusCode::BAD_REQUEST, "invalid email".into()));
        }
    }
    if let Field::Set(password) = &update.password {
        if password.len() < 8 {
            return Err((StatusCode::BAD_REQUEST, "password too short".into()));
        }
    }
    Ok(())
}

/// Administration listing.
#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    if !is_admin(&state.db, requester).await {
        warn!(requester, "user listing denied");
        return Err(forbidden());
    }
    let users = services::list_users(&state.db).await.map_err(internal)?;
    Ok(Json(users))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(_requester): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Profile>, ApiError> {
    services::get_profile(&state.db, id)
        .await
        .map_err(internal)?
        .map(Json)
        .ok_or_else(|| not_found("user"))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    Path(id): Path<i64>,
    Json(mut payload): Json<UserUpdate>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !can_edit_user(&state.db, id, requester).await {
        warn!(target_id = id, requester, "user edit denied");
        return Err(forbidden());
    }
    validate_update(&mut payload)?;
    if services::update_user(&state.db, id, payload)
        .await
        .map_err(internal)?
    {
        Ok(Json(MessageResponse::new("profile updated")))
    } else {
        Err((
            StatusCode::CONFLICT,
            "profile could not be updated (unknown user or username taken)".into(),
        ))
    }
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !can_delete_user(&state.db, id, requester).await {
        warn!(target_id = id, requester, "user delete denied");
        return Err(forbidden());
    }
    if services::delete_user(&state.db, id).await.map_err(internal)? {
        info!(target_id = id, requester, "user removed");
        Ok(Json(MessageResponse::new("user deleted")))
    } else {
        Err(not_found("user"))
    }
}

#[instrument(skip(state))]
pub async fn suspend_user(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !can_moderate_user(&state.db, id, requester).await {
        warn!(target_id = id, requester, "suspend denied");
        return Err(forbidden());
    }
    if services::suspend_user(&state.db, id).await.map_err(internal)? {
        Ok(Json(MessageResponse::new("user suspended")))
    } else {
        Err(not_found("user"))
    }
}

#[instrument(skip(state))]
pub async fn unsuspend_user(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !can_moderate_user(&state.db, id, requester).await {
        warn!(target_id = id, requester, "unsuspend denied");
        return Err(forbidden());
    }
    if services::unsuspend_user(&state.db, id).await.map_err(internal)? {
        Ok(Json(MessageResponse::new("user reinstated")))
    } else {
        Err(not_found("user"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_validation_normalizes_and_rejects() {
        let body = r#"{"email": "  Ada@Example.COM ", "username": " ada "}"#;
        let mut update: UserUpdate = serde_json::from_str(body).unwrap();
        validate_update(&mut update).unwrap();
        assert_eq!(update.email, Field::Set("ada@example.com".to_string()));
        assert_eq!(update.username, Field::Set("ada".to_string()));

        let mut short: UserUpdate = serde_json::from_str(r#"{"password": "abc"}"#).unwrap();
        assert_eq!(validate_update(&mut short).unwrap_err().0, StatusCode::BAD_REQUEST);

        let mut blank: UserUpdate = serde_json::from_str(r#"{"username": "   "}"#).unwrap();
        assert!(validate_update(&mut blank).is_err());

        let mut empty = UserUpdate::default();
        assert!(validate_update(&mut empty).is_ok());
    }
}
