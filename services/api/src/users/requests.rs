use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub expertise: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct QuestionsQuery {
    pub email: String,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
