//! Turn lifecycle: submit guard, fold loop, and failure fallback.
//!
//! A `Conversation` owns the transcript. While a turn is active the fold
//! loop is its only writer; the in-flight assistant record is reached through
//! the transcript's streaming index. The streaming flag is set when the
//! placeholder opens and cleared exactly once, when the turn completes or
//! fails.

use futures_util::StreamExt;

use crate::error::{RemoteCallError, TurnRejected};
use crate::fold::TurnFold;
use crate::provider::{ChatStream, Fragment};
use crate::resources::FALLBACK_REPLY;
use crate::state::{ChatMessage, MessageId, Transcript};

/// Handle for the turn currently streaming into the transcript.
#[derive(Debug)]
pub struct ActiveTurn {
    placeholder: MessageId,
    fold: TurnFold,
}

impl ActiveTurn {
    pub fn placeholder(&self) -> MessageId {
        self.placeholder
    }

    pub fn fold(&self) -> &TurnFold {
        &self.fold
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed { fragments: usize },
    Failed { fragments: usize },
}

#[derive(Debug, Default)]
pub struct Conversation {
    transcript: Transcript,
    loading: bool,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.transcript.messages()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Start a turn: append the user message and an empty streaming reply.
    pub fn begin_turn(&mut self, input: &str) -> Result<ActiveTurn, TurnRejected> {
        if input.trim().is_empty() {
            return Err(TurnRejected::EmptyInput);
        }
        if self.loading || self.transcript.is_streaming() {
            return Err(TurnRejected::Busy);
        }

        self.transcript.push_user(input);
        let placeholder = self
            .transcript
            .open_stream()
            .map_err(|_| TurnRejected::Busy)?;
        self.loading = true;
        tracing::info!(placeholder = %placeholder, turns = self.transcript.len(), "turn started");

        Ok(ActiveTurn {
            placeholder,
            fold: TurnFold::new(),
        })
    }

    /// The transcript as the adapter should see it: everything before the
    /// placeholder, ending with the user's message.
    pub fn request_context(&self, turn: &ActiveTurn) -> &[ChatMessage] {
        self.transcript.history_before(turn.placeholder)
    }

    pub fn apply(&mut self, turn: &mut ActiveTurn, fragment: Fragment) {
        turn.fold.absorb(fragment);
        if let Err(e) = self
            .transcript
            .refresh_stream(turn.fold.text(), turn.fold.citations())
        {
            tracing::warn!(error = %e, "fragment arrived with no open reply");
        }
    }

    pub fn complete(&mut self, turn: ActiveTurn) -> TurnOutcome {
        self.transcript.close_stream();
        self.loading = false;
        let fragments = turn.fold.fragment_count();
        tracing::info!(
            fragments,
            chars = turn.fold.text().len(),
            citations = turn.fold.citations().len(),
            "turn completed"
        );
        TurnOutcome::Completed { fragments }
    }

    /// End a failed turn. Text already streamed stays in the placeholder and
    /// a separate fallback reply is appended after it.
    pub fn fail(&mut self, turn: ActiveTurn, error: &RemoteCallError) -> TurnOutcome {
        tracing::error!(error = %error, placeholder = %turn.placeholder, "turn failed");
        self.transcript.close_stream();
        self.transcript.push_fallback(FALLBACK_REPLY);
        self.loading = false;
        TurnOutcome::Failed {
            fragments: turn.fold.fragment_count(),
        }
    }

    /// Run one complete turn against `client`, calling `publish` after the
    /// placeholder opens, after every fragment, and once more at the end.
    pub async fn run_turn<C, F>(
        &mut self,
        client: &C,
        input: &str,
        mut publish: F,
    ) -> Result<TurnOutcome, TurnRejected>
    where
        C: ChatStream + ?Sized,
        F: FnMut(&Transcript),
    {
        let mut turn = self.begin_turn(input)?;
        publish(&self.transcript);

        let mut stream = client.stream_reply(self.request_context(&turn));
        let outcome = loop {
            match stream.next().await {
                Some(Ok(fragment)) => {
                    self.apply(&mut turn, fragment);
                    publish(&self.transcript);
                }
                Some(Err(e)) => break self.fail(turn, &e),
                None => break self.complete(turn),
            }
        };

        publish(&self.transcript);
        Ok(outcome)
    }
}
