use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub from: String,
    pub text: String,
}
