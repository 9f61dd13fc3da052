//! Metaforge: a terminal client for building AI agents through conversation.
//!
//! This library provides:
//! - The wire model shared with agent-orchestration backends
//! - The backend capability contract ([`client::AgentOsClient`])
//! - A deterministic local engine for offline use and testing
//! - The conversation → plan → artifact pipeline
//! - Console and TUI front ends
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use metaforge::client::LocalEngine;
//! use metaforge::pipeline::Workflow;
//! use metaforge::Context;
//!
//! let mut workflow = Workflow::new(Arc::new(LocalEngine::new()));
//! let turn = workflow.send(&Context::background(), "Un agente que busque noticias").await?;
//! println!("{}", turn.reply);
//! ```

pub mod error;
pub mod models;
pub mod context;
pub mod client;
pub mod pipeline;
pub mod cli;

// Re-export key types
pub use crate::error::{ClientError, ClientResult};
pub use crate::context::{CancelHandle, Context};
pub use crate::client::{AgentOsClient, LocalEngine};
pub use crate::models::{
    AgentInfo, AgentPlan, ChatRequest, ChatResponse, ErrorEnvelope, GenerateOptions, GenerateRequest,
    GenerateResponse, Message, OsConfig, Role, Session,
};
pub use crate::pipeline::Workflow;

use std::path::PathBuf;
use std::time::Duration;

/// Environment variable naming the backend base URL
pub const AGENTOS_URL_ENV: &str = "AGENTOS_URL";

/// Backend targeted when nothing else is configured
pub const DEFAULT_AGENTOS_URL: &str = "http://localhost:7777";

/// Configuration for the metaforge client
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the agent-orchestration backend
    pub agentos_url: String,
    /// Simulated latency of the local engine
    pub latency: Duration,
    /// Root that `generated/agents/` is created under
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            agentos_url: DEFAULT_AGENTOS_URL.to_string(),
            latency: client::local::DEFAULT_LATENCY,
            output_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Default configuration with the backend URL taken from `AGENTOS_URL`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var(AGENTOS_URL_ENV) {
            if !url.trim().is_empty() {
                config.agentos_url = url.trim().to_string();
            }
        }
        config
    }

    /// Build the local engine described by this configuration
    pub fn local_engine(&self) -> LocalEngine {
        LocalEngine::with_latency(self.latency)
    }

    /// Start a workflow that saves artifacts under `output_dir`
    pub fn workflow(&self, client: std::sync::Arc<dyn AgentOsClient>) -> Workflow {
        Workflow::new(client).with_output_root(self.output_dir.clone())
    }
}
