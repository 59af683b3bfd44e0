use sqlx::SqliteConnection;

use crate::profile::dto::{NewEducation, NewExperience, NewSkill};
use crate::profile::repo_types::{
    Education, EducationPatch, Experience, ExperiencePatch, Skill, SkillPatch,
};
use crate::sparse::SparseUpdate;

async fn delete_by_id(
    conn: &mut SqliteConnection,
    table: &str,
    id: i64,
) -> Result<u64, sqlx::Error> {
    let res = sqlx::query(&format!("DELETE FROM {table} WHERE id = ?"))
        .bind(id)
        .execute(conn)
        .await?;
    Ok(res.rows_affected())
}

async fn delete_by_owner(
    conn: &mut SqliteConnection,
    table: &str,
    user_id: i64,
) -> Result<u64, sqlx::Error> {
    let res = sqlx::query(&format!("DELETE FROM {table} WHERE user_id = ?"))
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(res.rows_affected())
}

// ---- Skills ----

pub async fn insert_skill(
    conn: &mut SqliteConnection,
    user_id: i64,
    s: &NewSkill,
) -> Result<i64, sqlx::Error> {
    let res = sqlx::query("INSERT INTO skills (user_id, description, years) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(&s.description)
        .bind(s.years)
        .execute(conn)
        .await?;
    Ok(res.last_insert_rowid())
}

pub async fn find_skill(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<Skill>, sqlx::Error> {
    sqlx::query_as::<_, Skill>("SELECT id, user_id, description, years FROM skills WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await
}

pub async fn skills_by_user(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<Vec<Skill>, sqlx::Error> {
    sqlx::query_as::<_, Skill>(
        "SELECT id, user_id, description, years FROM skills WHERE user_id = ? ORDER BY id",
    )
    .bind(user_id)
    .fetch_all(conn)
    .await
}

pub async fn update_skill(
    conn: &mut SqliteConnection,
    id: i64,
    patch: SkillPatch,
) -> Result<u64, sqlx::Error> {
    SparseUpdate::new("skills")
        .set("description", patch.description)
        .set("years", patch.years)
        .execute(conn, id)
        .await
}

pub async fn delete_skill(conn: &mut SqliteConnection, id: i64) -> Result<u64, sqlx::Error> {
    delete_by_id(conn, "skills", id).await
}

pub async fn delete_skills_by_user(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<u64, sqlx::Error> {
    delete_by_owner(conn, "skills", user_id).await
}

// ---- Education ----

pub async fn insert_education(
    conn: &mut SqliteConnection,
    user_id: i64,
    e: &NewEducation,
) -> Result<i64, sqlx::Error> {
    let res = sqlx::query("INSERT INTO education (user_id, school, description) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(&e.school)
        .bind(&e.description)
        .execute(conn)
        .await?;
    Ok(res.last_insert_rowid())
}

pub async fn find_education(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<Education>, sqlx::Error> {
    sqlx::query_as::<_, Education>(
        "SELECT id, user_id, school, description FROM education WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(conn)
    .await
}

pub async fn education_by_user(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<Vec<Education>, sqlx::Error> {
    sqlx::query_as::<_, Education>(
        "SELECT id, user_id, school, description FROM education WHERE user_id = ? ORDER BY id",
    )
    .bind(user_id)
    .fetch_all(conn)
    .await
}

pub async fn update_education(
    conn: &mut SqliteConnection,
    id: i64,
    patch: EducationPatch,
) -> Result<u64, sqlx::Error> {
    SparseUpdate::new("education")
        .set("school", patch.school)
        .set("description", patch.description)
        .execute(conn, id)
        .await
}

pub async fn delete_education(conn: &mut SqliteConnection, id: i64) -> Result<u64, sqlx::Error> {
    delete_by_id(conn, "education", id).await
}

pub async fn delete_education_by_user(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<u64, sqlx::Error> {
    delete_by_owner(conn, "education", user_id).await
}

// ---- Experience ----

const EXPERIENCE_COLUMNS: &str =
    "id, user_id, company, job_title, description, start_date, end_date, current_job";

pub async fn insert_experience(
    conn: &mut SqliteConnection,
    user_id: i64,
    e: &NewExperience,
) -> Result<i64, sqlx::Error> {
    let res = sqlx::query(
        r#"
        INSERT INTO experience
            (user_id, company, job_title, description, start_date, end_date, current_job)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(&e.company)
    .bind(&e.job_title)
    .bind(&e.description)
    .bind(&e.start_date)
    .bind(&e.end_date)
    .bind(e.current_job)
    .execute(conn)
    .await?;
    Ok(res.last_insert_rowid())
}

pub async fn find_experience(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<Experience>, sqlx::Error> {
    sqlx::query_as::<_, Experience>(&format!(
        "SELECT {EXPERIENCE_COLUMNS} FROM experience WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await
}

pub async fn experience_by_user(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<Vec<Experience>, sqlx::Error> {
    sqlx::query_as::<_, Experience>(&format!(
        "SELECT {EXPERIENCE_COLUMNS} FROM experience WHERE user_id = ? ORDER BY start_date DESC, id"
    ))
    .bind(user_id)
    .fetch_all(conn)
    .await
}

pub async fn update_experience(
    conn: &mut SqliteConnection,
    id: i64,
    patch: ExperiencePatch,
) -> Result<u64, sqlx::Error> {
    SparseUpdate::new("experience")
        .set("company", patch.company)
        .set("job_title", patch.job_title)
        .set("description", patch.description)
        .set("start_date", patch.start_date)
        .set("end_date", patch.end_date)
        .set("current_job", patch.current_job)
        .execute(conn, id)
        .await
}

pub async fn delete_experience(conn: &mut SqliteConnection, id: i64) -> Result<u64, sqlx::Error> {
    delete_by_id(conn, "experience", id).await
}

pub async fn delete_experience_by_user(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<u64, sqlx::Error> {
    delete_by_owner(conn, "experience", user_id).await
}
