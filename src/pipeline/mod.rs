//! Conversation → plan → artifact pipeline
//!
//! [`Workflow`] drives any [`AgentOsClient`] through the three stages of agent
//! creation:
//! - **Gathering**: user turns go to the analyzer until it emits the completion marker
//! - **Planning**: the transcript is turned into an [`AgentPlan`] and handed to the planner
//! - **Generation**: the plan is compiled into source and optionally saved to disk
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use metaforge::client::LocalEngine;
//! use metaforge::pipeline::Workflow;
//! use metaforge::{Context, GenerateOptions};
//!
//! let ctx = Context::background();
//! let mut workflow = Workflow::new(Arc::new(LocalEngine::new()));
//! while !workflow.send(&ctx, &next_answer()).await?.complete {}
//! let plan = workflow.create_plan(&ctx).await?;
//! let generated = workflow.generate(&ctx, GenerateOptions::default()).await?;
//! ```

pub mod artifact;
pub mod plan;

pub use artifact::GeneratedAgent;
pub use plan::PlanBuilder;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::client::{AgentOsClient, ANALYZER_AGENT, COMPLETION_SENTINEL, PLANNER_AGENT};
use crate::context::Context;
use crate::error::{ClientError, ClientResult};
use crate::models::{AgentPlan, ChatRequest, GenerateOptions, GenerateRequest, GenerateResponse, Role, Session};

/// Where a workflow currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Still answering the analyzer's questions
    Gathering,
    /// Analyzer has everything it needs
    Ready,
    /// A plan exists and can be generated
    Planned,
    /// Source has been generated
    Generated,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Gathering => "gathering",
            Stage::Ready => "ready",
            Stage::Planned => "planned",
            Stage::Generated => "generated",
        }
    }
}

/// Result of one analyzer turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Analyzer reply with the completion marker removed
    pub reply: String,
    /// True once the analyzer has gathered enough information
    pub complete: bool,
}

/// Result of a generation
#[derive(Debug, Clone)]
pub struct Generated {
    pub response: GenerateResponse,
    /// Set when the artifact was written to disk
    pub saved_to: Option<PathBuf>,
}

/// Stateful driver for one agent-creation conversation
pub struct Workflow {
    client: Arc<dyn AgentOsClient>,
    transcript: Option<Session>,
    stage: Stage,
    plan: Option<AgentPlan>,
    artifact: Option<GenerateResponse>,
    output_root: Option<PathBuf>,
}

impl Workflow {
    pub fn new(client: Arc<dyn AgentOsClient>) -> Self {
        Self {
            client,
            transcript: None,
            stage: Stage::Gathering,
            plan: None,
            artifact: None,
            output_root: None,
        }
    }

    /// Save generated artifacts below `root` when the options ask for it
    pub fn with_output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.output_root = Some(root.into());
        self
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Local transcript of the analyzer conversation
    pub fn transcript(&self) -> Option<&Session> {
        self.transcript.as_ref()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.transcript.as_ref().map(|s| s.session_id.as_str())
    }

    pub fn plan(&self) -> Option<&AgentPlan> {
        self.plan.as_ref()
    }

    pub fn artifact(&self) -> Option<&GenerateResponse> {
        self.artifact.as_ref()
    }

    pub fn output_root(&self) -> Option<&Path> {
        self.output_root.as_deref()
    }

    pub fn client(&self) -> &Arc<dyn AgentOsClient> {
        &self.client
    }

    /// Send one user turn to the analyzer
    pub async fn send(&mut self, ctx: &Context, message: &str) -> ClientResult<TurnOutcome> {
        if self.stage != Stage::Gathering {
            return Err(ClientError::Conversation(
                "requirements are already complete; create the plan".to_string(),
            ));
        }
        let message = message.trim();
        if message.is_empty() {
            return Err(ClientError::Conversation("message is empty".to_string()));
        }

        let mut req = ChatRequest::new(message);
        if let Some(id) = self.session_id() {
            req = req.in_session(id);
        }
        let resp = self.client.chat(ctx, ANALYZER_AGENT, req).await?;

        let transcript = self
            .transcript
            .get_or_insert_with(|| Session::new(resp.session_id.clone(), ANALYZER_AGENT));
        transcript.append(Role::User, message);
        transcript.append(Role::Assistant, resp.content.as_str());

        let complete = resp.content.contains(COMPLETION_SENTINEL);
        if complete {
            self.stage = Stage::Ready;
            info!(session = %resp.session_id, "requirements complete");
        }
        debug!(turns = transcript.message_count / 2, complete, "analyzer turn");

        Ok(TurnOutcome {
            reply: resp.content.replace(COMPLETION_SENTINEL, "").trim().to_string(),
            complete,
        })
    }

    /// Turn the finished conversation into a plan and register it with the planner
    pub async fn create_plan(&mut self, ctx: &Context) -> ClientResult<AgentPlan> {
        if self.stage == Stage::Gathering {
            return Err(ClientError::Conversation(
                "the analyzer still needs more information".to_string(),
            ));
        }
        let transcript = self
            .transcript
            .as_ref()
            .ok_or_else(|| ClientError::Conversation("no conversation yet".to_string()))?;

        let plan = PlanBuilder::from_session(transcript)?.build();
        plan.validate()?;

        let req = ChatRequest::new(serde_json::to_string(&plan)?).in_session(transcript.session_id.clone());
        let ack = self.client.chat(ctx, PLANNER_AGENT, req).await?;
        info!(agent = %plan.name, ack = %ack.content, "plan created");

        self.plan = Some(plan.clone());
        self.artifact = None;
        self.stage = Stage::Planned;
        Ok(plan)
    }

    /// Replace the current plan, e.g. after the user edited it
    pub fn set_plan(&mut self, plan: AgentPlan) -> ClientResult<()> {
        if self.stage == Stage::Gathering {
            return Err(ClientError::Conversation(
                "the analyzer still needs more information".to_string(),
            ));
        }
        plan.validate()?;
        self.plan = Some(plan);
        self.artifact = None;
        self.stage = Stage::Planned;
        Ok(())
    }

    /// Generate source for the current plan
    pub async fn generate(&mut self, ctx: &Context, options: GenerateOptions) -> ClientResult<Generated> {
        let plan = self
            .plan
            .clone()
            .ok_or_else(|| ClientError::Conversation("there is no plan to generate".to_string()))?;

        let response = self
            .client
            .generate_agent(ctx, GenerateRequest { plan, options })
            .await?;

        // The artifact is kept even when writing it out fails.
        self.artifact = Some(response.clone());
        self.stage = Stage::Generated;

        let saved_to = match (&self.output_root, options.save_to_file) {
            (Some(root), true) => Some(artifact::save(root, &response)?),
            _ => None,
        };
        Ok(Generated { response, saved_to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LocalEngine;
    use std::time::Duration;
    use tempfile::TempDir;

    fn workflow() -> Workflow {
        Workflow::new(Arc::new(LocalEngine::with_latency(Duration::ZERO)))
    }

    async fn complete_conversation(workflow: &mut Workflow, ctx: &Context) {
        let first = workflow.send(ctx, "Un agente de noticias tech").await.unwrap();
        assert!(!first.complete);
        let second = workflow.send(ctx, "a").await.unwrap();
        assert!(!second.complete);
        let third = workflow.send(ctx, "b").await.unwrap();
        assert!(third.complete);
        assert!(!third.reply.contains(COMPLETION_SENTINEL));
    }

    #[tokio::test]
    async fn test_full_pipeline() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = Context::background();
        let mut workflow = workflow().with_output_root(temp_dir.path());

        complete_conversation(&mut workflow, &ctx).await;
        assert_eq!(workflow.stage(), Stage::Ready);
        assert_eq!(workflow.transcript().unwrap().message_count, 6);

        let plan = workflow.create_plan(&ctx).await.unwrap();
        assert_eq!(plan.name, "noticias_tech");
        assert!(plan.tools.contains("duckduckgo"));
        assert!(!plan.needs_memory);

        let generated = workflow.generate(&ctx, GenerateOptions::default()).await.unwrap();
        assert_eq!(generated.response.filename, "noticias_tech_agent.py");
        let saved = generated.saved_to.unwrap();
        assert_eq!(std::fs::read_to_string(saved).unwrap(), generated.response.code);
        assert_eq!(workflow.stage(), Stage::Generated);
    }

    #[tokio::test]
    async fn test_session_id_is_reused() {
        let ctx = Context::background();
        let mut workflow = workflow();
        workflow.send(&ctx, "agente").await.unwrap();
        let id = workflow.session_id().unwrap().to_string();
        workflow.send(&ctx, "a").await.unwrap();
        assert_eq!(workflow.session_id().unwrap(), id);
    }

    #[tokio::test]
    async fn test_out_of_order_calls_fail() {
        let ctx = Context::background();
        let mut workflow = workflow();

        assert!(matches!(
            workflow.create_plan(&ctx).await,
            Err(ClientError::Conversation(_))
        ));
        assert!(matches!(
            workflow.generate(&ctx, GenerateOptions::default()).await,
            Err(ClientError::Conversation(_))
        ));
        assert!(matches!(workflow.send(&ctx, "   ").await, Err(ClientError::Conversation(_))));

        complete_conversation(&mut workflow, &ctx).await;
        assert!(matches!(workflow.send(&ctx, "more").await, Err(ClientError::Conversation(_))));
    }

    #[tokio::test]
    async fn test_no_save_without_flag() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = Context::background();
        let mut workflow = workflow().with_output_root(temp_dir.path());
        complete_conversation(&mut workflow, &ctx).await;
        workflow.create_plan(&ctx).await.unwrap();

        let options = GenerateOptions {
            save_to_file: false,
            ..GenerateOptions::default()
        };
        let generated = workflow.generate(&ctx, options).await.unwrap();
        assert!(generated.saved_to.is_none());
        assert!(artifact::list(temp_dir.path()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_escaping_plan_is_rejected_before_generation() {
        let ctx = Context::background();
        let mut workflow = workflow();
        complete_conversation(&mut workflow, &ctx).await;

        let err = workflow.set_plan(AgentPlan::new("../escape", "role")).unwrap_err();
        assert!(matches!(err, ClientError::InvalidPlan(_)));
        assert_eq!(workflow.stage(), Stage::Ready);
        assert!(workflow.plan().is_none());
    }

    #[tokio::test]
    async fn test_failed_save_keeps_artifact() {
        let temp_dir = TempDir::new().unwrap();
        // A regular file where the output directory should be.
        let blocked = temp_dir.path().join("blocked");
        std::fs::write(&blocked, "not a directory").unwrap();

        let ctx = Context::background();
        let mut workflow = workflow().with_output_root(&blocked);
        complete_conversation(&mut workflow, &ctx).await;
        workflow.create_plan(&ctx).await.unwrap();

        let err = workflow.generate(&ctx, GenerateOptions::default()).await.unwrap_err();
        assert!(matches!(err, ClientError::Io(_)));
        assert_eq!(workflow.stage(), Stage::Generated);
        assert_eq!(workflow.artifact().unwrap().filename, "noticias_tech_agent.py");
    }

    #[tokio::test]
    async fn test_failed_turn_leaves_transcript_untouched() {
        let mut workflow = Workflow::new(Arc::new(LocalEngine::with_latency(Duration::from_secs(30))));
        let (ctx, handle) = Context::with_cancel();
        handle.cancel();

        let err = workflow.send(&ctx, "hola").await.unwrap_err();
        assert!(err.is_cancellation());
        assert!(workflow.transcript().is_none());
        assert_eq!(workflow.stage(), Stage::Gathering);
    }
}
