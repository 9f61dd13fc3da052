//! Backend capability contract
//!
//! Every backend, remote or local, implements [`AgentOsClient`]. The presentation layer
//! only ever talks to this trait, so the concrete backend is chosen once at startup.
//!
//! # Example
//!
//! ```rust,ignore
//! use metaforge::client::{AgentOsClient, LocalEngine, ANALYZER_AGENT};
//! use metaforge::{ChatRequest, Context};
//!
//! let engine = LocalEngine::new();
//! let ctx = Context::background();
//! let reply = engine.chat(&ctx, ANALYZER_AGENT, ChatRequest::new("Un agente de noticias")).await?;
//! println!("{}", reply.content);
//! ```

pub mod local;
pub mod template;

pub use local::LocalEngine;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::ClientResult;
use crate::models::{ChatRequest, ChatResponse, GenerateRequest, GenerateResponse, OsConfig, Session};

/// Agent that elicits requirements and asks clarifying questions
pub const ANALYZER_AGENT: &str = "analyzer_agent";

/// Agent that turns elicited requirements into a structured plan
pub const PLANNER_AGENT: &str = "planner_agent";

/// Marker the analyzer emits once it has gathered enough information
pub const COMPLETION_SENTINEL: &str = "INFO_COMPLETA";

/// Operations every backend must provide
#[async_trait]
pub trait AgentOsClient: Send + Sync {
    /// Liveness probe. A failure means the backend is unavailable, never that the
    /// process should stop.
    async fn health(&self, ctx: &Context) -> ClientResult<()>;

    /// Retrieve the agent catalog
    async fn get_config(&self, ctx: &Context) -> ClientResult<OsConfig>;

    /// Send one conversational turn to `agent_id`
    async fn chat(&self, ctx: &Context, agent_id: &str, req: ChatRequest) -> ClientResult<ChatResponse>;

    /// Retrieve the transcript and metadata of a session
    async fn get_session(&self, ctx: &Context, session_id: &str) -> ClientResult<Session>;

    /// Compile a completed plan into a source artifact
    async fn generate_agent(&self, ctx: &Context, req: GenerateRequest) -> ClientResult<GenerateResponse>;
}
