//! Crate-wide error type.
//!
//! Every failure the detection flow can hit maps to one variant here so the
//! controller (and tests) can tell a bad upload from a dead network from a
//! model that answered with garbage.

use reqwest::StatusCode;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The image could not be read, decoded, or is not a supported format.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// A request value broke its own contract (e.g. empty disease name).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("no API key configured for {provider} (set {env_key} or save one in settings)")]
    MissingApiKey {
        provider: &'static str,
        env_key: &'static str,
    },

    #[error("request to {0} timed out")]
    Timeout(String),

    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("service returned {status}: {body}")]
    Api { status: StatusCode, body: String },

    /// The service answered, but not with something matching the output schema.
    #[error("malformed model output: {0}")]
    MalformedOutput(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("keychain error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for failures that came from the remote side of a call
    /// (network, status, or unusable output).
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            Error::Timeout(_) | Error::Transport(_) | Error::Api { .. } | Error::MalformedOutput(_)
        )
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            let target = e
                .url()
                .and_then(|u| u.host_str().map(str::to_string))
                .unwrap_or_else(|| "remote service".to_string());
            Error::Timeout(target)
        } else {
            Error::Transport(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_failures_are_external() {
        assert!(Error::Timeout("api.example.com".to_string()).is_external());
        assert!(Error::MalformedOutput("not json".to_string()).is_external());
        assert!(Error::Api {
            status: StatusCode::BAD_GATEWAY,
            body: String::new(),
        }
        .is_external());
    }

    #[test]
    fn local_failures_are_not_external() {
        assert!(!Error::InvalidImage("empty".to_string()).is_external());
        assert!(!Error::Config("bad".to_string()).is_external());
        assert!(!Error::MissingApiKey {
            provider: "gemini",
            env_key: "GEMINI_API_KEY",
        }
        .is_external());
    }
}
