//! Skills, education and experience entries. Every mutation is its own
//! transaction; ownership checks happen in the handlers.

use tracing::{debug, info, warn};

use crate::db::{finish_insert, finish_single, Database};
use crate::error::ServiceResult;
use crate::profile::dto::{NewEducation, NewExperience, NewSkill};
use crate::profile::repo;
use crate::profile::repo_types::{
    Education, EducationPatch, Experience, ExperiencePatch, Skill, SkillPatch,
};

fn log_insert(entity: &str, user_id: i64, id: Option<i64>) {
    match id {
        Some(id) => info!(entity, user_id, id, "profile entry created"),
        None => warn!(entity, user_id, "profile entry rejected"),
    }
}

fn log_change(action: &str, entity: &str, id: i64, done: bool) {
    if done {
        info!(entity, id, action, "profile entry changed");
    } else {
        warn!(entity, id, action, "profile entry not found");
    }
}

// ---- Skills ----

pub async fn create_skill(
    db: &Database,
    user_id: i64,
    skill: NewSkill,
) -> ServiceResult<Option<i64>> {
    debug!(user_id, "create_skill");
    let id = db
        .run(async {
            let mut tx = db.pool().begin().await?;
            let inserted = repo::insert_skill(&mut *tx, user_id, &skill).await;
            finish_insert(tx, inserted).await
        })
        .await?;
    log_insert("skill", user_id, id);
    Ok(id)
}

pub async fn update_skill(db: &Database, id: i64, patch: SkillPatch) -> ServiceResult<bool> {
    let done = db
        .run(async {
            let mut tx = db.pool().begin().await?;
            let rows = repo::update_skill(&mut *tx, id, patch).await?;
            finish_single(tx, rows).await
        })
        .await?;
    log_change("update", "skill", id, done);
    Ok(done)
}

pub async fn delete_skill(db: &Database, id: i64) -> ServiceResult<bool> {
    let done = db
        .run(async {
            let mut tx = db.pool().begin().await?;
            let rows = repo::delete_skill(&mut *tx, id).await?;
            finish_single(tx, rows).await
        })
        .await?;
    log_change("delete", "skill", id, done);
    Ok(done)
}

pub async fn get_skill(db: &Database, id: i64) -> ServiceResult<Option<Skill>> {
    db.run(async {
        let mut conn = db.pool().acquire().await?;
        Ok(repo::find_skill(&mut conn, id).await?)
    })
    .await
}

pub async fn list_skills_by_user(db: &Database, user_id: i64) -> ServiceResult<Vec<Skill>> {
    db.run(async {
        let mut conn = db.pool().acquire().await?;
        Ok(repo::skills_by_user(&mut conn, user_id).await?)
    })
    .await
}

// ---- Education ----

pub async fn create_education(
    db: &Database,
    user_id: i64,
    education: NewEducation,
) -> ServiceResult<Option<i64>> {
    debug!(user_id, "create_education");
    let id = db
        .run(async {
            let mut tx = db.pool().begin().await?;
            let inserted = repo::insert_education(&mut *tx, user_id, &education).await;
            finish_insert(tx, inserted).await
        })
        .await?;
    log_insert("education", user_id, id);
    Ok(id)
}

pub async fn update_education(
    db: &Database,
    id: i64,
    patch: EducationPatch,
) -> ServiceResult<bool> {
    let done = db
        .run(async {
            let mut tx = db.pool().begin().await?;
            let rows = repo::update_education(&mut *tx, id, patch).await?;
            finish_single(tx, rows).await
        })
        .await?;
    log_change("update", "education", id, done);
    Ok(done)
}

pub async fn delete_education(db: &Database, id: i64) -> ServiceResult<bool> {
    let done = db
        .run(async {
            let mut tx = db.pool().begin().await?;
            let rows = repo::delete_education(&mut *tx, id).await?;
            finish_single(tx, rows).await
        })
        .await?;
    log_change("delete", "education", id, done);
    Ok(done)
}

pub async fn get_education(db: &Database, id: i64) -> ServiceResult<Option<Education>> {
    db.run(async {
        let mut conn = db.pool().acquire().await?;
        Ok(repo::find_education(&mut conn, id).await?)
    })
    .await
}

pub async fn list_education_by_user(db: &Database, user_id: i64) -> ServiceResult<Vec<Education>> {
    db.run(async {
        let mut conn = db.pool().acquire().await?;
        Ok(repo::education_by_user(&mut conn, user_id).await?)
    })
    .await
}

// ---- Experience ----

pub async fn create_experience(
    db: &Database,
    user_id: i64,
    experience: NewExperience,
) -> ServiceResult<Option<i64>> {
    debug!(user_id, "create_experience");
    let id = db
        .run(async {
            let mut tx = db.pool().begin().await?;
            let inserted = repo::insert_experience(&mut *tx, user_id, &experience).await;
            finish_insert(tx, inserted).await
        })
        .await?;
    log_insert("experience", user_id, id);
    Ok(id)
}

pub async fn update_experience(
    db: &Database,
    id: i64,
    patch: ExperiencePatch,
) -> ServiceResult<bool> {
    let done = db
        .run(async {
            let mut tx = db.pool().begin().await?;
            let rows = repo::update_experience(&mut *tx, id, patch).await?;
            finish_single(tx, rows).await
        })
        .await?;
    log_change("update", "experience", id, done);
    Ok(done)
}

pub async fn delete_experience(db: &Database, id: i64) -> ServiceResult<bool> {
    let done = db
        .run(async {
            let mut tx = db.pool().begin().await?;
            let rows = repo::delete_experience(&mut *tx, id).await?;
            finish_single(tx, rows).await
        })
        .await?;
    log_change("delete", "experience", id, done);
    Ok(done)
}

pub async fn get_experience(db: &Database, id: i64) -> ServiceResult<Option<Experience>> {
    db.run(async {
        let mut conn = db.pool().acquire().await?;
        Ok(repo::find_experience(&mut conn, id).await?)
    })
    .await
}

pub async fn list_experience_by_user(
    db: &Database,
    user_id: i64,
) -> ServiceResult<Vec<Experience>> {
    db.run(async {
        let mut conn = db.pool().acquire().await?;
        Ok(repo::experience_by_user(&mut conn, user_id).await?)
    })
    .await
}
