//! Retrieval-augmented agent, configuration loading and application bootstrap.

pub mod agent;
pub mod bootstrap;
pub mod config;
pub mod vault;

pub use agent::{Agent, AgentError, AgentResponse};
pub use config::Config;
