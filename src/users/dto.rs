use serde::{Deserialize, Serialize};

use crate::groups::repo_types::Group;
use crate::profile::repo_types::{Education, Experience, Skill};
use crate::sparse::Field;
use crate::users::repo_types::{User, UserPatch};

/// Everything needed to open an account.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub birthday: Option<String>,
    pub tagline: Option<String>,
    pub photo: Option<String>,
}

/// Profile edit. Omitted fields keep their stored values.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UserUpdate {
    pub username: Field<String>,
    pub password: Field<String>,
    pub first_name: Field<String>,
    pub last_name: Field<String>,
    pub email: Field<String>,
    pub city: Field<String>,
    pub state: Field<String>,
    pub birthday: Field<String>,
    pub tagline: Field<String>,
    pub photo: Field<String>,
}

impl UserUpdate {
    /// Split into the credential part and the user-row part.
    pub fn into_parts(self) -> (Field<String>, Field<String>, UserPatch) {
        let patch = UserPatch {
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            city: self.city,
            state: self.state,
            suspended: Field::Unchanged,
            birthday: self.birthday,
            tagline: self.tagline,
            photo: self.photo,
        };
        (self.username, self.password, patch)
    }
}

/// Full profile page data.
#[derive(Debug, Serialize)]
pub struct Profile {
    #[serde(flatten)]
    pub user: User,
    pub username: Option<String>,
    pub is_admin: bool,
    pub skills: Vec<Skill>,
    pub education: Vec<Education>,
    pub experience: Vec<Experience>,
    pub groups: Vec<Group>,
}
