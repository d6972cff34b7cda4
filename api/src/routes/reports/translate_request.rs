use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    #[serde(default)]
    pub text: String,
    pub lang: Option<String>,
}
