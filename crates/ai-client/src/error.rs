use brief_core::BriefError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AiError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("{service} returned HTTP {status}: {message}")]
    Api {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Missing API key: {0}")]
    MissingApiKey(&'static str),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type AiResult<T> = Result<T, AiError>;

impl AiError {
    /// Build an `Api` error from a non-success response, keeping a short body excerpt
    pub(crate) async fn from_response(service: &'static str, response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| {
                v.pointer("/error/message")
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| body.chars().take(200).collect());
        AiError::Api {
            service,
            status,
            message,
        }
    }
}

impl From<AiError> for BriefError {
    fn from(err: AiError) -> Self {
        match err {
            AiError::RequestFailed(e) if e.is_timeout() => BriefError::Timeout(e.to_string()),
            AiError::RequestFailed(e) => BriefError::Upstream(e.to_string()),
            AiError::Api { status: 401 | 403, .. } => BriefError::Unauthorized(err.to_string()),
            // Gemini answers a bad key with 400 INVALID_ARGUMENT
            AiError::Api { status: 400, ref message, .. } if message.contains("API key") => {
                BriefError::Unauthorized(err.to_string())
            }
            AiError::Api { status: 404, .. } => BriefError::NotConfigured(err.to_string()),
            AiError::Api { .. } => BriefError::Upstream(err.to_string()),
            AiError::InvalidResponse(msg) => BriefError::InvalidResponse(msg),
            AiError::Serialization(e) => BriefError::InvalidResponse(e.to_string()),
            AiError::MissingApiKey(name) => BriefError::NotConfigured(format!("{} is not set", name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brief_core::ErrorKind;

    fn api(status: u16, message: &str) -> AiError {
        AiError::Api {
            service: "gemini",
            status,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_error_kind_mapping() {
        let kind = |e: AiError| BriefError::from(e).kind();
        assert_eq!(kind(api(401, "nope")), ErrorKind::Misconfigured);
        assert_eq!(kind(api(400, "API key not valid. Please pass a valid API key.")), ErrorKind::Misconfigured);
        assert_eq!(kind(api(400, "bad request")), ErrorKind::Transient);
        assert_eq!(kind(api(503, "overloaded")), ErrorKind::Transient);
        assert_eq!(kind(AiError::MissingApiKey("GEMINI_API_KEY")), ErrorKind::Misconfigured);
    }
}
