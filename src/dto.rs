use serde::Serialize;

/// Plain confirmation body for actions that return no resource.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Body returned after a resource was created.
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: i64,
}
