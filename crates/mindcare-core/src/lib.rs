pub mod ai;
pub mod config;
pub mod error;
pub mod fold;
pub mod mood;
pub mod provider;
pub mod resources;
pub mod session;
pub mod state;

// Re-export main types for convenience
pub use ai::GeminiClient;
pub use config::{ApiKey, ChatSettings, Config, Startup};
pub use error::{ConfigurationError, RemoteCallError, TranscriptError, TurnRejected, UnknownMood};
pub use fold::TurnFold;
pub use mood::{Mood, MoodAcknowledgement, MoodEntry, MoodLog};
pub use provider::{ChatRequest, ChatStream, Fragment, FragmentStream};
pub use session::{ActiveTurn, Conversation, TurnOutcome};
pub use state::{ChatMessage, ChatRole, Citation, MessageId, Transcript};
