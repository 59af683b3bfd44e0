use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    auth::{extractors::AuthUser, services::is_admin},
    dto::{CreatedResponse, MessageResponse},
    error::{forbidden, internal, not_found},
    jobs::{
        dto::{ApplyResponse, NewCompany, NewJob, SearchQuery},
        repo_types::{Company, Job, JobPatch},
        services,
    },
    state::AppState,
};

type ApiError = (StatusCode, String);

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/jobs", get(list_jobs).post(create_job))
        .route("/jobs/:id", get(get_job).put(update_job).delete(delete_job))
        .route("/jobs/:id/apply", post(apply))
        .route("/companies", get(list_companies).post(create_company))
        .route("/companies/:id", get(get_company))
}

async fn ensure_admin(state: &AppState, requester: i64) -> Result<(), ApiError> {
    if is_admin(&state.db, requester).await {
        Ok(())
    } else {
        warn!(requester, "admin action denied");
        Err(forbidden())
    }
}

/// `GET /jobs?q=rust&mode=all`; without `q` every posting is listed.
#[instrument(skip(state))]
pub async fn list_jobs(
    State(state): State<AppState>,
    AuthUser(_requester): AuthUser,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Job>>, ApiError> {
    let jobs = match query.q.as_deref() {
        Some(q) => services::search_jobs(&state.db, q, query.mode).await,
        None => services::list_jobs(&state.db).await,
    }
    .map_err(internal)?;
    Ok(Json(jobs))
}

#[instrument(skip(state))]
pub async fn get_job(
    State(state): State<AppState>,
    AuthUser(_requester): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Job>, ApiError> {
    services::get_job(&state.db, id)
        .await
        .map_err(internal)?
        .map(Json)
        .ok_or_else(|| not_found("job"))
}

#[instrument(skip(state, payload))]
pub async fn create_job(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    Json(payload): Json<NewJob>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    ensure_admin(&state, requester).await?;
    if payload.title.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "title is required".into()));
    }
    match services::create_job(&state.db, payload).await.map_err(internal)? {
        Some(id) => Ok((StatusCode::CREATED, Json(CreatedResponse { id }))),
        None => Err(not_found("company")),
    }
}

#[instrument(skip(state, payload))]
pub async fn update_job(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<JobPatch>,
) -> Result<Json<MessageResponse>, ApiError> {
    ensure_admin(&state, requester).await?;
    if services::update_job(&state.db, id, payload)
        .await
        .map_err(internal)?
    {
        Ok(Json(MessageResponse::new("job updated")))
    } else {
        Err(not_found("job or company"))
    }
}

#[instrument(skip(state))]
pub async fn delete_job(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    ensure_admin(&state, requester).await?;
    if services::delete_job(&state.db, id).await.map_err(internal)? {
        Ok(Json(MessageResponse::new("job deleted")))
    } else {
        Err(not_found("job"))
    }
}

#[instrument(skip(state))]
pub async fn apply(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ApplyResponse>, ApiError> {
    services::apply_to_job(&state.db, id, requester)
        .await
        .map_err(internal)?
        .map(Json)
        .ok_or_else(|| not_found("job"))
}

#[instrument(skip(state))]
pub async fn list_companies(
    State(state): State<AppState>,
    AuthUser(_requester): AuthUser,
) -> Result<Json<Vec<Company>>, ApiError> {
    let companies = services::list_companies(&state.db)
        .await
        .map_err(internal)?;
    Ok(Json(companies))
}

#[instrument(skip(state))]
pub async fn get_company(
    State(state): State<AppState>,
    AuthUser(_requester): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Company>, ApiError> {
    services::get_company(&state.db, id)
        .await
        .map_err(internal)?
        .map(Json)
        .ok_or_else(|| not_found("company"))
}

#[instrument(skip(state, payload))]
pub async fn create_company(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    Json(payload): Json<NewCompany>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    ensure_admin(&state, requester).await?;
    if payload.name.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "company name is required".into()));
    }
    match services::create_company(&state.db, payload)
        .await
        .map_err(internal)?
    {
        Some(id) => Ok((StatusCode::CREATED, Json(CreatedResponse { id }))),
        None => Err((StatusCode::BAD_REQUEST, "company rejected".into())),
    }
}
