use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct TranslateResponse {
    pub translated: String,
}
