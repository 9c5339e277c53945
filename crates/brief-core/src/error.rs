use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification of a failure, so callers can tell an empty source
/// from a flaky one from a broken deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The source answered but had nothing for this ticker.
    NoData,
    /// Network, timeout, rate limit or a malformed upstream response.
    Transient,
    /// Missing credentials, bad configuration, rejected auth.
    Misconfigured,
}

#[derive(Error, Debug)]
pub enum BriefError {
    #[error("No data: {0}")]
    NoData(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    #[error("Index error: {0}")]
    Index(String),
}

impl BriefError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BriefError::NoData(_) => ErrorKind::NoData,
            BriefError::Upstream(_)
            | BriefError::InvalidResponse(_)
            | BriefError::Timeout(_)
            | BriefError::Index(_) => ErrorKind::Transient,
            BriefError::NotConfigured(_) | BriefError::Unauthorized(_) => {
                ErrorKind::Misconfigured
            }
        }
    }
}

pub type BriefResult<T> = Result<T, BriefError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(BriefError::NoData("empty".into()).kind(), ErrorKind::NoData);
        assert_eq!(BriefError::Timeout("slow".into()).kind(), ErrorKind::Transient);
        assert_eq!(
            BriefError::Unauthorized("401".into()).kind(),
            ErrorKind::Misconfigured
        );
        assert_eq!(
            BriefError::NotConfigured("GEMINI_API_KEY".into()).kind(),
            ErrorKind::Misconfigured
        );
    }
}
