use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use super::server::AppState;

/// Body of `POST /chat`. Omitted identifiers fall back to the configured defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub sources: Vec<String>,
}

/// Successful agent output before the gateway applies its response policy.
#[derive(Debug, Clone)]
pub struct ChatAnswer {
    pub content: String,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Provider kept answering 429 after retries.
    RateLimited,
    /// Provider or network failure.
    Upstream,
    /// The session belongs to another user.
    SessionConflict,
    Internal,
}

impl FailureKind {
    #[must_use]
    pub fn status(self) -> StatusCode {
        match self {
            Self::RateLimited => StatusCode::SERVICE_UNAVAILABLE,
            Self::Upstream => StatusCode::BAD_GATEWAY,
            Self::SessionConflict => StatusCode::FORBIDDEN,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl ChatFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

pub type ChatReply = Result<ChatAnswer, ChatFailure>;

/// One chat request waiting for the agent.
#[derive(Debug)]
pub struct ChatJob {
    pub request: ChatRequest,
    pub reply: oneshot::Sender<ChatReply>,
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
}

fn detail(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            detail: message.into(),
        }),
    )
        .into_response()
}

pub(crate) async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Response {
    if request.query.trim().is_empty() {
        return detail(StatusCode::UNPROCESSABLE_ENTITY, "query must not be empty");
    }

    let (reply_tx, reply_rx) = oneshot::channel();
    let job = ChatJob {
        request,
        reply: reply_tx,
    };
    if state.chat_tx.send(job).await.is_err() {
        tracing::error!("agent dispatcher is not running");
        return detail(StatusCode::SERVICE_UNAVAILABLE, "agent unavailable");
    }

    match reply_rx.await {
        Ok(Ok(answer)) => {
            let sources = if state.include_sources {
                answer.sources
            } else {
                Vec::new()
            };
            Json(ChatResponse {
                response: answer.content,
                sources,
            })
            .into_response()
        }
        Ok(Err(failure)) => {
            let status = failure.kind.status();
            tracing::warn!(status = status.as_u16(), "chat failed: {}", failure.message);
            detail(status, failure.message)
        }
        Err(_) => {
            tracing::error!("agent dropped the reply channel");
            detail(StatusCode::SERVICE_UNAVAILABLE, "agent unavailable")
        }
    }
}

pub(crate) async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}
