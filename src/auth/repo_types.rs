use serde::Serialize;
use sqlx::FromRow;

use crate::sparse::Field;

/// Login record, one per user.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Credential {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string, never exposed
}

#[derive(Debug, Default)]
pub struct CredentialPatch {
    pub username: Field<String>,
    pub password_hash: Field<String>,
}

/// Login view of a user: credential, suspension and admin flag together.
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub user_id: i64,
    pub username: String,
    pub suspended: bool,
    pub is_admin: bool,
}
