//! Contract between the conversation and a streaming model backend.

use std::pin::Pin;

use futures_util::Stream;

use crate::config::ChatSettings;
use crate::error::RemoteCallError;
use crate::resources::SYSTEM_INSTRUCTION;
use crate::state::{ChatMessage, ChatRole, Citation};

/// One incremental piece of a streamed reply. `text` is a delta, not the
/// reply so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    pub text: String,
    pub citations: Vec<Citation>,
}

impl Fragment {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            citations: Vec::new(),
        }
    }
}

/// Single-pass, single-consumer sequence of fragments for one turn.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment, RemoteCallError>> + Send>>;

/// A backend able to stream a reply to the last user message of a transcript.
///
/// Implementations must not touch the network until the returned stream is
/// first polled, must make at most one outbound call per stream, and must not
/// retry. If the transcript does not end in a non-empty user message the
/// stream is empty.
pub trait ChatStream: Send + Sync {
    fn name(&self) -> &str;

    fn stream_reply(&self, transcript: &[ChatMessage]) -> FragmentStream;
}

/// Provider-neutral request for one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Prior turns, oldest first, excluding the latest user message.
    pub history: Vec<(ChatRole, String)>,
    pub message: String,
    pub system_instruction: String,
    pub web_search: bool,
    pub temperature: f32,
}

impl ChatRequest {
    /// Build the request for a transcript ending in a user message, or `None`
    /// if there is nothing to answer.
    pub fn from_transcript(transcript: &[ChatMessage], settings: &ChatSettings) -> Option<Self> {
        let (last, prior) = transcript.split_last()?;
        if last.role != ChatRole::User || last.text.trim().is_empty() {
            return None;
        }

        let history = prior
            .iter()
            .filter(|m| !m.fallback && !m.streaming && !m.text.trim().is_empty())
            .map(|m| (m.role, m.text.clone()))
            .collect();

        Some(Self {
            history,
            message: last.text.clone(),
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
            web_search: settings.web_search,
            temperature: settings.temperature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Transcript;

    #[test]
    fn no_request_without_trailing_user_message() {
        let settings = ChatSettings::default();
        let mut transcript = Transcript::new();
        assert!(ChatRequest::from_transcript(transcript.messages(), &settings).is_none());

        transcript.push_user("hello");
        transcript.push_assistant("hi there");
        assert!(ChatRequest::from_transcript(transcript.messages(), &settings).is_none());

        transcript.push_user("   ");
        assert!(ChatRequest::from_transcript(transcript.messages(), &settings).is_none());
    }

    #[test]
    fn history_skips_fallbacks_and_empty_replies() {
        let settings = ChatSettings::default();
        let mut transcript = Transcript::new();
        transcript.push_user("first");
        transcript.open_stream().unwrap();
        transcript.close_stream();
        transcript.push_fallback("I'm having trouble connecting.");
        transcript.push_user("second");
        transcript.push_assistant("reply");
        transcript.push_user("third");

        let request = ChatRequest::from_transcript(transcript.messages(), &settings).unwrap();
        assert_eq!(request.message, "third");
        assert_eq!(
            request.history,
            vec![
                (ChatRole::User, "first".to_string()),
                (ChatRole::User, "second".to_string()),
                (ChatRole::Assistant, "reply".to_string()),
            ]
        );
        assert!(request.web_search);
        assert!((request.temperature - 0.7).abs() < f32::EPSILON);
    }
}
