use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub topic: String,
    pub question: String,
    pub asked_by: String,
}
