//! UI-agnostic conversation state
//!
//! The `Transcript` is the single source of truth for what the chat view
//! renders. It is append-only; the only record that may change after being
//! appended is the one in-flight assistant reply, reachable through an index
//! rather than by searching or splicing the list.

use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::TranscriptError;

/// Identifier of a message, unique and increasing within one transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg-{}", self.0)
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    User,
    Assistant,
}

/// A web source attached to an assistant reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub title: String,
    pub uri: String,
}

impl Citation {
    pub fn new(title: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            uri: uri.into(),
        }
    }
}

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub role: ChatRole,
    pub text: String,
    pub timestamp: DateTime<Local>,
    /// True only for the assistant reply currently being streamed.
    pub streaming: bool,
    pub citations: Vec<Citation>,
    /// Set on the fixed apology appended after a failed turn.
    pub fallback: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
    streaming: Option<usize>,
    next_id: u64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn get(&self, id: MessageId) -> Option<&ChatMessage> {
        self.position(id).map(|idx| &self.messages[idx])
    }

    pub fn push_user(&mut self, text: impl Into<String>) -> MessageId {
        self.append(ChatRole::User, text.into(), false, false)
    }

    pub fn push_assistant(&mut self, text: impl Into<String>) -> MessageId {
        self.append(ChatRole::Assistant, text.into(), false, false)
    }

    pub fn push_fallback(&mut self, text: impl Into<String>) -> MessageId {
        self.append(ChatRole::Assistant, text.into(), false, true)
    }

    /// Append the empty assistant placeholder that the next reply streams into.
    pub fn open_stream(&mut self) -> Result<MessageId, TranscriptError> {
        if self.streaming.is_some() {
            return Err(TranscriptError::AlreadyStreaming);
        }
        let id = self.append(ChatRole::Assistant, String::new(), true, false);
        self.streaming = Some(self.messages.len() - 1);
        Ok(id)
    }

    /// Replace the in-flight record's text and citation snapshot.
    pub fn refresh_stream(
        &mut self,
        text: &str,
        citations: &[Citation],
    ) -> Result<(), TranscriptError> {
        let idx = self.streaming.ok_or(TranscriptError::NotStreaming)?;
        let message = &mut self.messages[idx];
        message.text.clear();
        message.text.push_str(text);
        message.citations = citations.to_vec();
        Ok(())
    }

    /// Freeze the in-flight record. Returns its id, or `None` if nothing was open.
    pub fn close_stream(&mut self) -> Option<MessageId> {
        let idx = self.streaming.take()?;
        let message = &mut self.messages[idx];
        message.streaming = false;
        Some(message.id)
    }

    pub fn streaming_message(&self) -> Option<&ChatMessage> {
        self.streaming.map(|idx| &self.messages[idx])
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming.is_some()
    }

    /// Messages strictly before `id`, or the whole transcript if `id` is unknown.
    pub fn history_before(&self, id: MessageId) -> &[ChatMessage] {
        match self.position(id) {
            Some(idx) => &self.messages[..idx],
            None => &self.messages,
        }
    }

    fn position(&self, id: MessageId) -> Option<usize> {
        // Ids are assigned in append order, so the list is sorted by id.
        self.messages.binary_search_by_key(&id, |m| m.id).ok()
    }

    fn append(&mut self, role: ChatRole, text: String, streaming: bool, fallback: bool) -> MessageId {
        let id = MessageId(self.next_id);
        self.next_id += 1;
        self.messages.push(ChatMessage {
            id,
            role,
            text,
            timestamp: Local::now(),
            streaming,
            citations: Vec::new(),
            fallback,
        });
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_increase_in_append_order() {
        let mut transcript = Transcript::new();
        let a = transcript.push_user("hi");
        let b = transcript.open_stream().unwrap();
        transcript.close_stream();
        let c = transcript.push_fallback("sorry");

        assert!(a < b && b < c);
        assert_eq!(transcript.get(b).map(|m| m.role), Some(ChatRole::Assistant));
        assert!(transcript.get(c).unwrap().fallback);
    }

    #[test]
    fn only_one_stream_may_be_open() {
        let mut transcript = Transcript::new();
        transcript.push_user("hi");
        transcript.open_stream().unwrap();

        assert_eq!(transcript.open_stream(), Err(TranscriptError::AlreadyStreaming));
        assert_eq!(
            transcript.messages().iter().filter(|m| m.streaming).count(),
            1
        );
    }

    #[test]
    fn refresh_replaces_text_and_citations() {
        let mut transcript = Transcript::new();
        transcript.push_user("hi");
        let id = transcript.open_stream().unwrap();

        transcript
            .refresh_stream("Hel", &[Citation::new("A", "u1")])
            .unwrap();
        transcript.refresh_stream("Hello", &[]).unwrap();

        let message = transcript.get(id).unwrap();
        assert_eq!(message.text, "Hello");
        assert!(message.citations.is_empty());
        assert!(message.streaming);
    }

    #[test]
    fn refresh_without_open_stream_fails() {
        let mut transcript = Transcript::new();
        transcript.push_assistant("done");

        assert_eq!(
            transcript.refresh_stream("x", &[]),
            Err(TranscriptError::NotStreaming)
        );
        assert_eq!(transcript.last().unwrap().text, "done");
    }

    #[test]
    fn close_clears_flag_and_index() {
        let mut transcript = Transcript::new();
        let id = transcript.open_stream().unwrap();

        assert_eq!(transcript.close_stream(), Some(id));
        assert!(!transcript.get(id).unwrap().streaming);
        assert!(transcript.streaming_message().is_none());
        assert_eq!(transcript.close_stream(), None);
    }

    #[test]
    fn history_before_stops_at_placeholder() {
        let mut transcript = Transcript::new();
        transcript.push_user("one");
        transcript.push_assistant("two");
        transcript.push_user("three");
        let placeholder = transcript.open_stream().unwrap();

        let history = transcript.history_before(placeholder);
        assert_eq!(history.len(), 3);
        assert_eq!(history.last().unwrap().text, "three");
    }
}
