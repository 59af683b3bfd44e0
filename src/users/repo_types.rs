use serde::Serialize;
use sqlx::FromRow;

use crate::sparse::Field;

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub suspended: bool,
    pub birthday: Option<String>, // YYYY-MM-DD
    pub tagline: Option<String>,
    pub photo: Option<String>,    // reference to the stored image
}

/// Row for the administration listing.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserSummary {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub suspended: bool,
    pub is_admin: bool,
}

#[derive(Debug, Default)]
pub struct UserPatch {
    pub first_name: Field<String>,
    pub last_name: Field<String>,
    pub email: Field<String>,
    pub city: Field<String>,
    pub state: Field<String>,
    pub suspended: Field<bool>,
    pub birthday: Field<String>,
    pub tagline: Field<String>,
    pub photo: Field<String>,
}
