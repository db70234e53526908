use thiserror::Error;

/// Classifier failures are fail-soft: the caller treats any of these exactly
/// like an unrecognized intent.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("classifier transport failure: {0}")]
    Transport(String),
    #[error("classifier returned status {0}")]
    Status(u16),
    #[error("classifier response could not be parsed: {0}")]
    MalformedResponse(String),
}

/// Failures from the remote enumeration path. Never fatal; surfaced to the
/// user only as reply text.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("authorization rejected: {0}")]
    Auth(String),
    #[error("lookup transport failure: {0}")]
    Transport(String),
    #[error("lookup response could not be parsed: {0}")]
    MalformedResponse(String),
}

impl LookupError {
    /// Reply text shown to the user when a lookup cannot complete.
    pub fn user_reply(&self) -> &'static str {
        match self {
            Self::Auth(_) => "Those credentials were rejected. Please check them and try again.",
            Self::Transport(_) | Self::MalformedResponse(_) => {
                "I couldn't reach the resource service. Please try again later."
            }
        }
    }
}
