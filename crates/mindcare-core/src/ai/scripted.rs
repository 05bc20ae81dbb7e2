//! Deterministic in-memory backend for contract tests.
//!
//! Contains no transport logic. Each call to `stream_reply` replays the next
//! queued script, or an empty reply when the queue is exhausted.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use futures_util::stream;

use crate::error::RemoteCallError;
use crate::provider::{ChatStream, Fragment, FragmentStream};
use crate::state::{ChatMessage, ChatRole};

/// One scripted stream item.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Fragment(Fragment),
    /// Fail the stream with a provider status error.
    Fail { status: u16, message: String },
}

#[derive(Debug, Default)]
pub struct ScriptedClient {
    scripts: Mutex<VecDeque<Vec<ScriptStep>>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply made of plain text fragments.
    pub fn with_reply(self, fragments: &[&str]) -> Self {
        let steps = fragments
            .iter()
            .map(|text| ScriptStep::Fragment(Fragment::text(*text)))
            .collect();
        self.with_script(steps)
    }

    pub fn with_script(self, steps: Vec<ScriptStep>) -> Self {
        lock_unpoisoned(&self.scripts).push_back(steps);
        self
    }

    /// Number of times `stream_reply` produced a non-empty request.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Transcripts passed to `stream_reply`, in call order.
    pub fn seen_transcripts(&self) -> Vec<Vec<ChatMessage>> {
        lock_unpoisoned(&self.seen).clone()
    }
}

impl ChatStream for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    fn stream_reply(&self, transcript: &[ChatMessage]) -> FragmentStream {
        let answerable = transcript
            .last()
            .is_some_and(|m| m.role == ChatRole::User && !m.text.trim().is_empty());
        if !answerable {
            return Box::pin(stream::empty::<Result<Fragment, RemoteCallError>>());
        }

        self.calls.fetch_add(1, Ordering::SeqCst);
        lock_unpoisoned(&self.seen).push(transcript.to_vec());
        let steps = lock_unpoisoned(&self.scripts).pop_front().unwrap_or_default();

        let items = steps.into_iter().map(|step| match step {
            ScriptStep::Fragment(fragment) => Ok(fragment),
            ScriptStep::Fail { status, message } => {
                Err(RemoteCallError::Status { status, message })
            }
        });
        // Nothing is yielded after the first error.
        let mut failed = false;
        let items: Vec<_> = items
            .take_while(|item| {
                let keep = !failed;
                failed |= item.is_err();
                keep
            })
            .collect();

        Box::pin(stream::iter(items))
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
