//! HTTP chat endpoint with CORS, request tracing and a health check.
//!
//! Requests are handed to the agent as [`ChatJob`]s over an `mpsc` channel; the
//! receiving side answers through the job's `oneshot` reply.

mod error;
mod handlers;
mod router;
mod server;

pub use error::GatewayError;
pub use handlers::{ChatAnswer, ChatFailure, ChatJob, ChatReply, ChatRequest, ChatResponse, FailureKind};
pub use server::GatewayServer;
