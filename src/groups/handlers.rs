use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::extractors::AuthUser,
    dto::{CreatedResponse, MessageResponse},
    error::{forbidden, internal, not_found},
    groups::{
        dto::{CreateGroupRequest, NewGroup},
        repo_types::{Group, GroupPatch, GroupWithMembers},
        services,
    },
    state::AppState,
};

type ApiError = (StatusCode, String);

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/groups", get(list_groups).post(create_group))
        .route(
            "/groups/:id",
            get(get_group).put(update_group).delete(delete_group),
        )
        .route("/groups/:id/join", post(join_group))
        .route("/groups/:id/leave", post(leave_group))
        .route("/users/:id/groups", get(groups_of_user))
}

/// Load the group and make sure the requester administers it.
async fn owned_group(state: &AppState, id: i64, requester: i64) -> Result<Group, ApiError> {
    let group = services::get_group(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("group"))?
        .group;
    if group.admin_id != requester {
        warn!(group_id = id, requester, "group change denied");
        return Err(forbidden());
    }
    Ok(group)
}

#[instrument(skip(state))]
pub async fn list_groups(
    State(state): State<AppState>,
    AuthUser(_requester): AuthUser,
) -> Result<Json<Vec<Group>>, ApiError> {
    let groups = services::list_groups(&state.db).await.map_err(internal)?;
    Ok(Json(groups))
}

#[instrument(skip(state))]
pub async fn groups_of_user(
    State(state): State<AppState>,
    AuthUser(_requester): AuthUser,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<Group>>, ApiError> {
    let groups = services::groups_for_user(&state.db, user_id)
        .await
        .map_err(internal)?;
    Ok(Json(groups))
}

#[instrument(skip(state))]
pub async fn get_group(
    State(state): State<AppState>,
    AuthUser(_requester): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<GroupWithMembers>, ApiError> {
    services::get_group(&state.db, id)
        .await
        .map_err(internal)?
        .map(Json)
        .ok_or_else(|| not_found("group"))
}

#[instrument(skip(state, payload))]
pub async fn create_group(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    Json(payload): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "group name is required".into()));
    }
    let group = NewGroup {
        admin_id: requester,
        name,
        description: payload.description,
    };
    match services::create_group(&state.db, group).await.map_err(internal)? {
        Some(id) => Ok((StatusCode::CREATED, Json(CreatedResponse { id }))),
        None => Err(not_found("user")),
    }
}

#[instrument(skip(state, payload))]
pub async fn update_group(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<GroupPatch>,
) -> Result<Json<MessageResponse>, ApiError> {
    owned_group(&state, id, requester).await?;
    if services::update_group(&state.db, id, payload)
        .await
        .map_err(internal)?
    {
        Ok(Json(MessageResponse::new("group updated")))
    } else {
        Err((StatusCode::CONFLICT, "group could not be updated".into()))
    }
}

#[instrument(skip(state))]
pub async fn delete_group(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    owned_group(&state, id, requester).await?;
    if services::delete_group(&state.db, id).await.map_err(internal)? {
        info!(group_id = id, requester, "group removed");
        Ok(Json(MessageResponse::new("group deleted")))
    } else {
        Err((StatusCode::CONFLICT, "group could not be deleted".into()))
    }
}

#[instrument(skip(state))]
pub async fn join_group(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    if services::join_group(&state.db, requester, id)
        .await
        .map_err(internal)?
    {
        Ok(Json(MessageResponse::new("joined group")))
    } else {
        Err((
            StatusCode::CONFLICT,
            "already a member or group does not exist".into(),
        ))
    }
}

#[instrument(skip(state))]
pub async fn leave_group(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let group = services::get_group(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("group"))?
        .group;
    if group.admin_id == requester {
        return Err((
            StatusCode::CONFLICT,
            "the group admin cannot leave; delete or hand over the group".into(),
        ));
    }
    if services::leave_group(&state.db, requester, id)
        .await
        .map_err(internal)?
    {
        Ok(Json(MessageResponse::new("left group")))
    } else {
        Err(not_found("membership"))
    }
}
