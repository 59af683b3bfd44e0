use serde::Deserialize;

/// Group as handed to the service; `admin_id` becomes its first member.
#[derive(Debug, Clone)]
pub struct NewGroup {
    pub admin_id: i64,
    pub name: String,
    pub description: String,
}

/// Request body for creating a group. The creator is taken from the token.
#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}
