use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::sparse::Field;

/// Interest group. `admin_id` owns the group and is always one of its members.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Group {
    pub id: i64,
    pub admin_id: i64,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Member {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Serialize)]
pub struct GroupWithMembers {
    #[serde(flatten)]
    pub group: Group,
    pub members: Vec<Member>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GroupPatch {
    pub name: Field<String>,
    pub description: Field<String>,
    pub admin_id: Field<i64>,
}
