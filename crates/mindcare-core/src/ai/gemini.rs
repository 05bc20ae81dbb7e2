use std::collections::VecDeque;

use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};

use crate::ai::sse::SseParser;
use crate::config::{ApiKey, ChatSettings};
use crate::error::RemoteCallError;
use crate::provider::{ChatRequest, ChatStream, Fragment, FragmentStream};
use crate::state::{ChatMessage, ChatRole, Citation};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    system_instruction: Instruction,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Instruction {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Serialize)]
struct GoogleSearch {}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Deserialize)]
struct GroundingChunk {
    web: Option<WebSource>,
}

#[derive(Deserialize)]
struct WebSource {
    uri: Option<String>,
    title: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    code: Option<u16>,
    message: Option<String>,
    status: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

/// Streaming client for the Gemini `streamGenerateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: ApiKey,
    settings: ChatSettings,
}

impl GeminiClient {
    pub fn new(api_key: ApiKey, settings: ChatSettings) -> Self {
        Self {
            client: Client::new(),
            api_key,
            settings,
        }
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        )
    }

    /// Prepare the outbound request. Nothing is sent until the builder is.
    pub fn build_request(&self, request: &ChatRequest) -> RequestBuilder {
        let mut contents: Vec<Content> = request
            .history
            .iter()
            .map(|(role, text)| Content {
                role: wire_role(*role),
                parts: vec![Part { text: text.clone() }],
            })
            .collect();
        contents.push(Content {
            role: wire_role(ChatRole::User),
            parts: vec![Part {
                text: request.message.clone(),
            }],
        });

        let tools = if request.web_search {
            vec![Tool {
                google_search: GoogleSearch {},
            }]
        } else {
            Vec::new()
        };

        let body = GenerateRequest {
            contents,
            system_instruction: Instruction {
                parts: vec![Part {
                    text: request.system_instruction.clone(),
                }],
            },
            tools,
            generation_config: GenerationConfig {
                temperature: request.temperature,
            },
        };

        self.client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose())
            .header("accept", "text/event-stream")
            .json(&body)
    }
}

impl ChatStream for GeminiClient {
    fn name(&self) -> &str {
        "Gemini"
    }

    fn stream_reply(&self, transcript: &[ChatMessage]) -> FragmentStream {
        let Some(request) = ChatRequest::from_transcript(transcript, &self.settings) else {
            tracing::debug!("transcript does not end in a user message, nothing to send");
            return Box::pin(stream::empty::<Result<Fragment, RemoteCallError>>());
        };

        tracing::debug!(
            model = %self.settings.model,
            history = request.history.len(),
            web_search = request.web_search,
            "preparing streamed completion"
        );
        Box::pin(fragment_stream(self.build_request(&request)))
    }
}

fn wire_role(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "user",
        ChatRole::Assistant => "model",
    }
}

type BodyStream = BoxStream<'static, Result<Vec<u8>, reqwest::Error>>;

enum StreamState {
    Pending(RequestBuilder),
    Reading {
        body: Option<BodyStream>,
        parser: SseParser,
        ready: VecDeque<String>,
    },
    Done,
}

/// Lazily send `builder` and turn its event-stream body into fragments.
/// The first error ends the stream.
fn fragment_stream(
    builder: RequestBuilder,
) -> impl futures_util::Stream<Item = Result<Fragment, RemoteCallError>> + Send {
    stream::unfold(StreamState::Pending(builder), |mut state| async move {
        loop {
            state = match state {
                StreamState::Done => return None,
                StreamState::Pending(builder) => match open(builder).await {
                    Ok(body) => StreamState::Reading {
                        body: Some(body),
                        parser: SseParser::default(),
                        ready: VecDeque::new(),
                    },
                    Err(e) => return Some((Err(e), StreamState::Done)),
                },
                StreamState::Reading {
                    mut body,
                    mut parser,
                    mut ready,
                } => {
                    if let Some(payload) = ready.pop_front() {
                        let next = StreamState::Reading { body, parser, ready };
                        return match parse_chunk(&payload) {
                            Ok(fragment) => Some((Ok(fragment), next)),
                            Err(e) => Some((Err(e), StreamState::Done)),
                        };
                    }

                    let Some(reader) = body.as_mut() else {
                        return None;
                    };
                    match reader.next().await {
                        Some(Ok(bytes)) => ready.extend(parser.feed(&bytes)),
                        Some(Err(e)) => return Some((Err(e.into()), StreamState::Done)),
                        None => {
                            body = None;
                            ready.extend(parser.finish());
                        }
                    }
                    StreamState::Reading { body, parser, ready }
                }
            };
        }
    })
}

async fn open(builder: RequestBuilder) -> Result<BodyStream, RemoteCallError> {
    let response = builder.send().await?;
    let status = response.status();

    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&text)
            .ok()
            .and_then(|envelope| envelope.error.message)
            .unwrap_or_else(|| text.trim().to_string());
        tracing::warn!(status = status.as_u16(), %message, "completion request rejected");
        return Err(RemoteCallError::Status {
            status: status.as_u16(),
            message,
        });
    }

    tracing::debug!(status = status.as_u16(), "completion stream opened");
    Ok(response
        .bytes_stream()
        .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
        .boxed())
}

/// Validate one streamed JSON chunk and reduce it to a fragment.
pub fn parse_chunk(payload: &str) -> Result<Fragment, RemoteCallError> {
    let chunk: GenerateChunk = serde_json::from_str(payload)
        .map_err(|e| RemoteCallError::MalformedFragment(e.to_string()))?;

    if let Some(error) = chunk.error {
        return Err(RemoteCallError::Status {
            status: error.code.unwrap_or(500),
            message: error
                .message
                .or(error.status)
                .unwrap_or_else(|| "unknown provider error".to_string()),
        });
    }

    if let Some(reason) = chunk.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(RemoteCallError::Blocked(reason));
    }

    let Some(candidate) = chunk.candidates.into_iter().next() else {
        return Ok(Fragment::default());
    };

    let text = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter(|part| !part.thought)
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default();

    let citations = candidate
        .grounding_metadata
        .map(|metadata| {
            metadata
                .grounding_chunks
                .into_iter()
                .filter_map(|chunk| chunk.web)
                .filter_map(|web| {
                    let uri = web.uri.filter(|uri| !uri.trim().is_empty())?;
                    let title = web
                        .title
                        .filter(|title| !title.trim().is_empty())
                        .unwrap_or_else(|| uri.clone());
                    Some(Citation { title, uri })
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(Fragment { text, citations })
}
