//! In-process stand-in backend
//!
//! [`LocalEngine`] satisfies the full [`AgentOsClient`] contract without any network
//! access. Replies follow a fixed script keyed on how many analyzer turns the engine has
//! served, never on what the user actually wrote.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use tracing::{debug, instrument};

use super::{template, AgentOsClient, ANALYZER_AGENT, COMPLETION_SENTINEL, PLANNER_AGENT};
use crate::context::Context;
use crate::error::ClientResult;
use crate::models::{
    AgentInfo, ChatRequest, ChatResponse, GenerateRequest, GenerateResponse, Message, OsConfig, Role,
    Session,
};

/// Default simulated network latency
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(200);

/// Generation is modelled as this many times heavier than other calls
const GENERATE_COST: u32 = 3;

const TOOLS_QUESTION: &str = "¡Perfecto! Voy a ayudarte a crear ese agente.\n\n¿Qué herramientas necesita el agente?\n\na) Búsqueda web (noticias, información general)\nb) Datos financieros (acciones, mercados)\nc) Análisis de archivos\nd) Ejecución de código Python\ne) Otra (especifica)";

const MEMORY_QUESTION: &str = "Excelente elección.\n\n¿El agente necesita recordar conversaciones previas (memoria persistente)?\n\na) Sí, necesita memoria\nb) No, cada conversación es independiente";

const INFO_COMPLETE: &str = "Tengo toda la información necesaria para crear tu agente.";

const PLAN_CREATED: &str = "Plan creado exitosamente";

const ECHO_PREFIX: &str = "Respuesta mock para: ";

/// Shared by every engine in the process so minted session ids never collide
static SESSION_SEQ: AtomicU64 = AtomicU64::new(0);

/// Deterministic local substitute for a real backend
#[derive(Debug)]
pub struct LocalEngine {
    latency: Duration,
    /// Analyzer turns served so far
    turns: AtomicU64,
}

impl Default for LocalEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalEngine {
    /// Create an engine with the default latency
    pub fn new() -> Self {
        Self::with_latency(DEFAULT_LATENCY)
    }

    /// Create an engine with a custom simulated latency
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            turns: AtomicU64::new(0),
        }
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    /// Number of analyzer turns served so far
    pub fn turns(&self) -> u64 {
        self.turns.load(Ordering::SeqCst)
    }

    fn analyzer_reply(&self) -> String {
        // fetch_add hands every call a distinct turn, even under concurrency.
        let turn = self.turns.fetch_add(1, Ordering::SeqCst);
        match turn {
            0 => TOOLS_QUESTION.to_string(),
            1 => MEMORY_QUESTION.to_string(),
            _ => format!("{}\n\n{}", COMPLETION_SENTINEL, INFO_COMPLETE),
        }
    }

    fn next_session_id(&self) -> String {
        let seq = SESSION_SEQ.fetch_add(1, Ordering::SeqCst);
        format!("mock-session-{}-{}", Utc::now().timestamp(), seq)
    }
}

#[async_trait]
impl AgentOsClient for LocalEngine {
    async fn health(&self, ctx: &Context) -> ClientResult<()> {
        ctx.sleep(self.latency).await?;
        debug!("local engine healthy");
        Ok(())
    }

    async fn get_config(&self, ctx: &Context) -> ClientResult<OsConfig> {
        ctx.sleep(self.latency).await?;

        Ok(OsConfig {
            os_id: "meta-agent-os-v1".to_string(),
            description: "Meta-Agente Generador con AgentOS".to_string(),
            agents: vec![
                AgentInfo {
                    id: ANALYZER_AGENT.to_string(),
                    name: "Analyzer Agent".to_string(),
                    description: "Analiza solicitudes y genera preguntas aclaratorias".to_string(),
                    model: "deepseek-chat".to_string(),
                },
                AgentInfo {
                    id: PLANNER_AGENT.to_string(),
                    name: "Planner Agent".to_string(),
                    description: "Crea planes estructurados de agentes".to_string(),
                    model: "deepseek-reasoner".to_string(),
                },
            ],
        })
    }

    #[instrument(skip(self, ctx, req), fields(session = ?req.session_id))]
    async fn chat(&self, ctx: &Context, agent_id: &str, req: ChatRequest) -> ClientResult<ChatResponse> {
        ctx.sleep(self.latency).await?;

        let content = match agent_id {
            ANALYZER_AGENT => self.analyzer_reply(),
            PLANNER_AGENT => PLAN_CREATED.to_string(),
            _ => format!("{}{}", ECHO_PREFIX, req.message),
        };

        let session_id = match req.session() {
            Some(id) => id.to_string(),
            None => self.next_session_id(),
        };
        debug!(turns = self.turns(), %session_id, "chat turn served");

        Ok(ChatResponse {
            content,
            session_id,
            agent_id: agent_id.to_string(),
            timestamp: Utc::now(),
        })
    }

    async fn get_session(&self, ctx: &Context, session_id: &str) -> ClientResult<Session> {
        ctx.sleep(self.latency).await?;

        // Nothing is persisted: every call returns the same representative transcript.
        let now = Utc::now();
        let started = now - chrono::Duration::minutes(5);
        let mut session = Session::new(session_id, ANALYZER_AGENT);
        session.created_at = started;
        session.messages = vec![
            Message {
                role: Role::User,
                content: "Crear un agente de búsqueda de noticias".to_string(),
                timestamp: started,
            },
            Message {
                role: Role::Assistant,
                content: "¿Qué herramientas necesita?".to_string(),
                timestamp: now - chrono::Duration::minutes(4),
            },
        ];
        session.message_count = session.messages.len();
        session.updated_at = now;
        Ok(session)
    }

    #[instrument(skip(self, ctx, req), fields(agent = %req.plan.name))]
    async fn generate_agent(&self, ctx: &Context, req: GenerateRequest) -> ClientResult<GenerateResponse> {
        req.plan.validate()?;
        ctx.sleep(self.latency * GENERATE_COST).await?;

        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let response = template::build_response(req.plan, created_at);
        debug!(bytes = response.size_bytes, file = %response.filepath, "agent rendered");
        Ok(response)
    }
}
