//! Error kinds recognized by the core.
//!
//! `ConfigurationError` is detected before any network call and routes the
//! UI to the setup screen. `RemoteCallError` is raised by a streaming adapter
//! during an active turn and is turned into a fallback reply at the turn
//! boundary.

use thiserror::Error;

/// The API key is absent or obviously not a real key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("{var} is not set")]
    MissingApiKey { var: &'static str },
    #[error("{var} is set to a placeholder value")]
    PlaceholderApiKey { var: &'static str },
}

/// Failure of the outbound completion call or of its streamed response.
#[derive(Debug, Error)]
pub enum RemoteCallError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed fragment: {0}")]
    MalformedFragment(String),
    #[error("response blocked by provider: {0}")]
    Blocked(String),
}

/// Misuse of the transcript's single in-flight record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TranscriptError {
    #[error("a streaming reply is already open")]
    AlreadyStreaming,
    #[error("no streaming reply is open")]
    NotStreaming,
}

/// Why a submission did not start a turn. The transcript is untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TurnRejected {
    #[error("message is empty")]
    EmptyInput,
    #[error("a reply is still streaming")]
    Busy,
}

/// A mood name outside the fixed set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown mood: {0}")]
pub struct UnknownMood(pub String);
