use serde::{Deserialize, Serialize};

/// Error envelope returned by the v1.1 API. Most endpoints use `errors`;
/// a few older ones answer with a bare `error` string.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    #[serde(default)]
    pub errors: Vec<ErrorDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    pub message: String,
}

impl ErrorResponse {
    /// First (code, message) pair the envelope carries, if any.
    pub fn first(&self) -> Option<(Option<i64>, &str)> {
        if let Some(detail) = self.errors.first() {
            return Some((detail.code, detail.message.as_str()));
        }
        self.error.as_deref().map(|message| (None, message))
    }
}
