pub mod gemini;
#[cfg(any(test, feature = "test-util"))]
pub mod scripted;
pub mod sse;

pub use gemini::GeminiClient;
#[cfg(any(test, feature = "test-util"))]
pub use scripted::{ScriptStep, ScriptedClient};
pub use sse::SseParser;
