use serde::Deserialize;

/// Form body of `POST /analyze`.
#[derive(Debug, Deserialize)]
pub struct AnalyzeForm {
    pub url: Option<String>,
}

/// Query string of `GET /proxy`.
#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    pub url: Option<String>,
}

/// Trimmed, non-empty URL or `None`.
pub fn required_url(url: Option<String>) -> Option<String> {
    url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty())
}
