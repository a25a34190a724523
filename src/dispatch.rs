//! Bridges gateway chat jobs to the shared agent.

use std::sync::Arc;

use ragchat_core::{Agent, AgentError};
use ragchat_gateway::{ChatAnswer, ChatFailure, ChatJob, ChatReply, ChatRequest, FailureKind};
use ragchat_llm::LlmProvider;
use ragchat_memory::SessionKey;
use tokio::sync::mpsc;

fn given(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// Session addressed by `request`, filling blank or missing identifiers from `defaults`.
///
/// A request naming only a non-default user gets that user's own session,
/// `<default session>:<user>`, since the default session belongs to the default user.
pub(crate) fn session_for(request: &ChatRequest, defaults: &SessionKey) -> SessionKey {
    let user_id = given(request.user_id.as_ref()).unwrap_or(&defaults.user_id);
    let session_id = match given(request.session_id.as_ref()) {
        Some(id) => id.to_owned(),
        None if user_id == defaults.user_id => defaults.session_id.clone(),
        None => format!("{}:{user_id}", defaults.session_id),
    };
    SessionKey::new(session_id, user_id)
}

pub(crate) fn classify(err: &AgentError) -> ChatFailure {
    if err.is_rate_limited() {
        ChatFailure::new(
            FailureKind::RateLimited,
            "model provider is rate limiting requests, retry later",
        )
    } else if err.is_upstream() {
        ChatFailure::new(FailureKind::Upstream, "model provider request failed")
    } else if err.is_session_conflict() {
        ChatFailure::new(FailureKind::SessionConflict, err.to_string())
    } else {
        ChatFailure::new(FailureKind::Internal, "internal error")
    }
}

async fn answer<P: LlmProvider>(
    agent: &Agent<P>,
    request: &ChatRequest,
    defaults: &SessionKey,
) -> ChatReply {
    let session = session_for(request, defaults);
    match agent.run(&request.query, &session).await {
        Ok(response) => Ok(ChatAnswer {
            sources: response.source_refs(),
            content: response.content,
        }),
        Err(e) => {
            tracing::error!(session = %session, "agent error: {e:#}");
            Err(classify(&e))
        }
    }
}

/// Serve jobs until every sender is dropped, one task per job.
pub(crate) async fn run<P>(
    agent: Arc<Agent<P>>,
    defaults: SessionKey,
    mut jobs: mpsc::Receiver<ChatJob>,
) where
    P: LlmProvider + Send + Sync + 'static,
{
    let defaults = Arc::new(defaults);
    while let Some(job) = jobs.recv().await {
        let agent = Arc::clone(&agent);
        let defaults = Arc::clone(&defaults);
        tokio::spawn(async move {
            let reply = answer(&agent, &job.request, &defaults).await;
            if job.reply.send(reply).is_err() {
                tracing::debug!("client went away before the answer was ready");
            }
        });
    }
    tracing::info!("chat dispatcher stopped");
}
