use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::sparse::Field;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Skill {
    pub id: i64,
    pub user_id: i64,
    pub description: String,
    pub years: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Education {
    pub id: i64,
    pub user_id: i64,
    pub school: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Experience {
    pub id: i64,
    pub user_id: i64,
    pub company: String,
    pub job_title: String,
    pub description: String,
    pub start_date: String,          // YYYY-MM-DD
    pub end_date: Option<String>,    // None while ongoing
    pub current_job: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SkillPatch {
    pub description: Field<String>,
    pub years: Field<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EducationPatch {
    pub school: Field<String>,
    pub description: Field<String>,
}

/// `current_job: false` is a value like any other and gets written.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ExperiencePatch {
    pub company: Field<String>,
    pub job_title: Field<String>,
    pub description: Field<String>,
    pub start_date: Field<String>,
    pub end_date: Field<String>,
    pub current_job: Field<bool>,
}
