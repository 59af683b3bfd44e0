use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::sparse::Field;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Company {
    pub id: i64,
    pub name: String,
}

/// Job posting in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Job {
    pub id: i64,
    pub company_id: i64,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct JobPatch {
    pub company_id: Field<i64>,
    pub title: Field<String>,
    pub description: Field<String>,
}
