use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct NewSkill {
    pub description: String,
    pub years: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewEducation {
    pub school: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewExperience {
    pub company: String,
    pub job_title: String,
    pub description: String,
    pub start_date: String,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub current_job: bool,
}
