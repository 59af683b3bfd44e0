use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    auth::{extractors::AuthUser, services::can_edit_user},
    dto::{CreatedResponse, MessageResponse},
    error::{forbidden, internal, not_found},
    profile::{
        dto::{NewEducation, NewExperience, NewSkill},
        repo_types::{Education, EducationPatch, Experience, ExperiencePatch, Skill, SkillPatch},
        services,
    },
    sparse::Field,
    state::AppState,
};

type ApiError = (StatusCode, String);

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/:id/skills", get(list_skills).post(add_skill))
        .route("/users/:id/education", get(list_education).post(add_education))
        .route("/users/:id/experience", get(list_experience).post(add_experience))
        .route("/skills/:id", put(edit_skill).delete(remove_skill))
        .route("/education/:id", put(edit_education).delete(remove_education))
        .route("/experience/:id", put(edit_experience).delete(remove_experience))
}

async fn ensure_owner(state: &AppState, owner: i64, requester: i64) -> Result<(), ApiError> {
    if can_edit_user(&state.db, owner, requester).await {
        Ok(())
    } else {
        warn!(owner, requester, "profile edit denied");
        Err(forbidden())
    }
}

fn blank(field: &Field<String>) -> bool {
    matches!(field, Field::Set(v) if v.trim().is_empty())
}

fn validate_skill_patch(patch: &SkillPatch) -> Result<(), ApiError> {
    if blank(&patch.description) || matches!(patch.years, Field::Set(y) if y < 0) {
        return Err((StatusCode::BAD_REQUEST, "invalid skill".into()));
    }
    Ok(())
}

fn validate_education_patch(patch: &EducationPatch) -> Result<(), ApiError> {
    if blank(&patch.school) {
        return Err((StatusCode::BAD_REQUEST, "school is required".into()));
    }
    Ok(())
}

fn validate_experience_patch(patch: &ExperiencePatch) -> Result<(), ApiError> {
    if blank(&patch.company) || blank(&patch.job_title) {
        return Err((
            StatusCode::BAD_REQUEST,
            "company and job_title are required".into(),
        ));
    }
    Ok(())
}

fn created(id: Option<i64>) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    match id {
        Some(id) => Ok((StatusCode::CREATED, Json(CreatedResponse { id }))),
        None => Err(not_found("user")),
    }
}

fn changed(done: bool, what: &str, message: &str) -> Result<Json<MessageResponse>, ApiError> {
    if done {
        Ok(Json(MessageResponse::new(message)))
    } else {
        Err(not_found(what))
    }
}

// ---- Skills ----

#[instrument(skip(state))]
pub async fn list_skills(
    State(state): State<AppState>,
    AuthUser(_requester): AuthUser,
    Path(owner): Path<i64>,
) -> Result<Json<Vec<Skill>>, ApiError> {
    let skills = services::list_skills_by_user(&state.db, owner)
        .await
        .map_err(internal)?;
    Ok(Json(skills))
}

#[instrument(skip(state, payload))]
pub async fn add_skill(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    Path(owner): Path<i64>,
    Json(payload): Json<NewSkill>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    ensure_owner(&state, owner, requester).await?;
    if payload.description.trim().is_empty() || payload.years < 0 {
        return Err((StatusCode::BAD_REQUEST, "invalid skill".into()));
    }
    let id = services::create_skill(&state.db, owner, payload)
        .await
        .map_err(internal)?;
    created(id)
}

#[instrument(skip(state, payload))]
pub async fn edit_skill(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<SkillPatch>,
) -> Result<Json<MessageResponse>, ApiError> {
    validate_skill_patch(&payload)?;
    let skill = services::get_skill(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("skill"))?;
    ensure_owner(&state, skill.user_id, requester).await?;
    let done = services::update_skill(&state.db, id, payload)
        .await
        .map_err(internal)?;
    changed(done, "skill", "skill updated")
}

#[instrument(skip(state))]
pub async fn remove_skill(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let skill = services::get_skill(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("skill"))?;
    ensure_owner(&state, skill.user_id, requester).await?;
    let done = services::delete_skill(&state.db, id)
        .await
        .map_err(internal)?;
    changed(done, "skill", "skill deleted")
}

// ---- Education ----

#[instrument(skip(state))]
pub async fn list_education(
    State(state): State<AppState>,
    AuthUser(_requester): AuthUser,
    Path(owner): Path<i64>,
) -> Result<Json<Vec<Education>>, ApiError> {
    let education = services::list_education_by_user(&state.db, owner)
        .await
        .map_err(internal)?;
    Ok(Json(education))
}

#[instrument(skip(state, payload))]
pub async fn add_education(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    Path(owner): Path<i64>,
    Json(payload): Json<NewEducation>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    ensure_owner(&state, owner, requester).await?;
    if payload.school.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "school is required".into()));
    }
    let id = services::create_education(&state.db, owner, payload)
        .await
        .map_err(internal)?;
    created(id)
}

#[instrument(skip(state, payload))]
pub async fn edit_education(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<EducationPatch>,
) -> Result<Json<MessageResponse>, ApiError> {
    validate_education_patch(&payload)?;
    let education = services::get_education(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("education"))?;
    ensure_owner(&state, education.user_id, requester).await?;
    let done = services::update_education(&state.db, id, payload)
        .await
        .map_err(internal)?;
    changed(done, "education", "education updated")
}

#[instrument(skip(state))]
pub async fn remove_education(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let education = services::get_education(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("education"))?;
    ensure_owner(&state, education.user_id, requester).await?;
    let done = services::delete_education(&state.db, id)
        .await
        .map_err(internal)?;
    changed(done, "education", "education deleted")
}

// ---- Experience ----

#[instrument(skip(state))]
pub async fn list_experience(
    State(state): State<AppState>,
    AuthUser(_requester): AuthUser,
    Path(owner): Path<i64>,
) -> Result<Json<Vec<Experience>>, ApiError> {
    let experience = services::list_experience_by_user(&state.db, owner)
        .await
        .map_err(internal)?;
    Ok(Json(experience))
}

#[instrument(skip(state, payload))]
pub async fn add_experience(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    Path(owner): Path<i64>,
    Json(payload): Json<NewExperience>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    ensure_owner(&state, owner, requester).await?;
    if payload.company.trim().is_empty() || payload.job_title.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "company and job_title are required".into(),
        ));
    }
    let id = services::create_experience(&state.db, owner, payload)
        .await
        .map_err(internal)?;
    created(id)
}

#[instrument(skip(state, payload))]
pub async fn edit_experience(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<ExperiencePatch>,
) -> Result<Json<MessageResponse>, ApiError> {
    validate_experience_patch(&payload)?;
    let experience = services::get_experience(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("experience"))?;
    ensure_owner(&state, experience.user_id, requester).await?;
    let done = services::update_experience(&state.db, id, payload)
        .await
        .map_err(internal)?;
    changed(done, "experience", "experience updated")
}

#[instrument(skip(state))]
pub async fn remove_experience(
    State(state): State<AppState>,
    AuthUser(requester): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let experience = services::get_experience(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found("experience"))?;
    ensure_owner(&state, experience.user_id, requester).await?;
    let done = services::delete_experience(&state.db, id)
        .await
        .map_err(internal)?;
    changed(done, "experience", "experience deleted")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skill_edits_follow_creation_rules() {
        let negative: SkillPatch = serde_json::from_str(r#"{"years": -1}"#).unwrap();
        assert_eq!(validate_skill_patch(&negative).unwrap_err().0, StatusCode::BAD_REQUEST);

        let blank: SkillPatch = serde_json::from_str(r#"{"description": "  "}"#).unwrap();
        assert!(validate_skill_patch(&blank).is_err());

        let fine: SkillPatch =
            serde_json::from_str(r#"{"years": 0, "description": null}"#).unwrap();
        assert!(validate_skill_patch(&fine).is_ok());
        assert!(validate_skill_patch(&SkillPatch::default()).is_ok());
    }

    #[test]
    fn required_text_cannot_be_blanked() {
        let school: EducationPatch = serde_json::from_str(r#"{"school": ""}"#).unwrap();
        assert!(validate_education_patch(&school).is_err());

        let title: ExperiencePatch = serde_json::from_str(r#"{"job_title": " "}"#).unwrap();
        assert!(validate_experience_patch(&title).is_err());

        let end: ExperiencePatch =
            serde_json::from_str(r#"{"end_date": "2024-01-31", "current_job": false}"#).unwrap();
        assert!(validate_experience_patch(&end).is_ok());
    }
}
