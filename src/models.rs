//! Wire types shared by every backend and the presentation layer
//!
//! Field names are snake_case on the wire. Optional fields are omitted rather than
//! serialized as `null` or empty placeholders.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

/// Unique identifier for an agent exposed by the backend
pub type AgentId = String;

/// Unique identifier for a conversation session
pub type SessionId = String;

/// Model used when a plan does not name one
pub const DEFAULT_MODEL: &str = "deepseek-chat";

/// Model used for team plans
pub const TEAM_MODEL: &str = "deepseek-reasoner";

/// One user utterance sent toward an agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub stream: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stream: false,
            session_id: None,
        }
    }

    /// Continue an existing session
    pub fn in_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Session id carried by the request, treating an empty id as absent
    pub fn session(&self) -> Option<&str> {
        self.session_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// An agent's reply to one turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    pub session_id: SessionId,
    #[serde(alias = "agent")]
    pub agent_id: AgentId,
    pub timestamp: DateTime<Utc>,
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User message
    User,
    /// Agent response
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A conversation's identity plus its transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    pub agent_id: AgentId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub message_count: usize,
}

fn is_zero(count: &usize) -> bool {
    *count == 0
}

impl Session {
    pub fn new(session_id: impl Into<String>, agent_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            agent_id: agent_id.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            message_count: 0,
        }
    }

    /// Append a message and bump `updated_at`
    pub fn append(&mut self, role: Role, content: impl Into<String>) -> &Message {
        let mut message = Message::new(role, content);
        // Keep the transcript chronological even if the clock steps backwards.
        if let Some(last) = self.messages.last() {
            if message.timestamp < last.timestamp {
                message.timestamp = last.timestamp;
            }
        }
        self.updated_at = message.timestamp.max(self.created_at);
        self.messages.push(message);
        self.message_count = self.messages.len();
        &self.messages[self.messages.len() - 1]
    }

    /// Messages sent by the user, in order
    pub fn user_messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.role == Role::User)
    }
}

/// Value stored in a team member record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MemberValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Map(BTreeMap<String, MemberValue>),
}

impl From<&str> for MemberValue {
    fn from(value: &str) -> Self {
        MemberValue::Text(value.to_string())
    }
}

impl From<String> for MemberValue {
    fn from(value: String) -> Self {
        MemberValue::Text(value)
    }
}

impl From<bool> for MemberValue {
    fn from(value: bool) -> Self {
        MemberValue::Bool(value)
    }
}

impl From<i64> for MemberValue {
    fn from(value: i64) -> Self {
        MemberValue::Integer(value)
    }
}

/// Loosely-typed description of one member of an agent team
pub type TeamMember = BTreeMap<String, MemberValue>;

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_level() -> u8 {
    1
}

/// Structured specification of the agent to generate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentPlan {
    pub name: String,
    pub role: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Complexity level: 1 basic, 2 knowledge, 3 memory, 4 team, 5 workflow
    #[serde(default = "default_level")]
    pub level: u8,
    #[serde(default)]
    pub tools: BTreeSet<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub needs_memory: bool,
    #[serde(default)]
    pub is_team: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_members: Option<Vec<TeamMember>>,
    #[serde(default)]
    pub usage_example: String,
}

impl AgentPlan {
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            model: default_model(),
            level: default_level(),
            tools: BTreeSet::new(),
            instructions: Vec::new(),
            needs_memory: false,
            is_team: false,
            team_members: None,
            usage_example: String::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Check the plan before any rendering work
    pub fn validate(&self) -> ClientResult<()> {
        if self.name.trim().is_empty() {
            return Err(ClientError::InvalidPlan("name is required".to_string()));
        }
        // The name becomes a file name under the output directory.
        if self.name.contains(['/', '\\']) || self.name.contains("..") {
            return Err(ClientError::InvalidPlan(format!(
                "name '{}' must not contain path separators or '..'",
                self.name
            )));
        }
        if self.role.trim().is_empty() {
            return Err(ClientError::InvalidPlan("role is required".to_string()));
        }
        if !(1..=5).contains(&self.level) {
            return Err(ClientError::InvalidPlan(format!(
                "level must be between 1 and 5, got {}",
                self.level
            )));
        }
        if self.team_members.is_some() && !self.is_team {
            return Err(ClientError::InvalidPlan(
                "team_members is only allowed on team plans".to_string(),
            ));
        }
        Ok(())
    }
}

/// Rendering toggles for code generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateOptions {
    pub include_comments: bool,
    pub add_examples: bool,
    pub save_to_file: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            include_comments: true,
            add_examples: true,
            save_to_file: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub plan: AgentPlan,
    #[serde(default)]
    pub options: GenerateOptions,
}

impl GenerateRequest {
    pub fn new(plan: AgentPlan) -> Self {
        Self {
            plan,
            options: GenerateOptions::default(),
        }
    }
}

/// Generated artifact plus its metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub code: String,
    pub plan: AgentPlan,
    pub filename: String,
    pub filepath: String,
    /// Approximate: byte length divided by 50
    pub lines: usize,
    pub size_bytes: usize,
    pub created_at: String,
}

/// Catalog entry for one agent the backend exposes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInfo {
    pub id: AgentId,
    pub name: String,
    pub description: String,
    pub model: String,
}

/// Backend agent catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsConfig {
    pub os_id: String,
    pub description: String,
    pub agents: Vec<AgentInfo>,
}

impl OsConfig {
    pub fn agent(&self, id: &str) -> Option<&AgentInfo> {
        self.agents.iter().find(|a| a.id == id)
    }
}

/// Body of a health probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub const OK: &'static str = "ok";
    pub const UNAVAILABLE: &'static str = "unavailable";

    /// Summarize the outcome of [`crate::client::AgentOsClient::health`]
    pub fn probe(result: &ClientResult<()>) -> Self {
        let status = if result.is_ok() { Self::OK } else { Self::UNAVAILABLE };
        Self {
            status: status.to_string(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == Self::OK
    }
}

/// Error payload reported by a backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, serde_json::Value>>,
}

impl ErrorEnvelope {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }
}

/// Top-level error document: `{"error": {...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorEnvelope,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_request_omits_missing_session() {
        let value = serde_json::to_value(ChatRequest::new("hola")).unwrap();
        assert_eq!(value, json!({"message": "hola", "stream": false}));

        let value = serde_json::to_value(ChatRequest::new("hola").in_session("s-1")).unwrap();
        assert_eq!(value["session_id"], "s-1");
    }

    #[test]
    fn test_empty_session_id_is_absent() {
        let req = ChatRequest::new("x").in_session("");
        assert_eq!(req.session(), None);
    }

    #[test]
    fn test_chat_response_accepts_agent_alias() {
        let resp: ChatResponse = serde_json::from_value(json!({
            "content": "ok",
            "session_id": "s",
            "agent": "planner_agent",
            "timestamp": "2024-05-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(resp.agent_id, "planner_agent");
    }

    #[test]
    fn test_session_append_keeps_count() {
        let mut session = Session::new("s-1", "analyzer_agent");
        session.append(Role::User, "hola");
        session.append(Role::Assistant, "¿Qué necesitas?");

        assert_eq!(session.message_count, 2);
        assert_eq!(session.message_count, session.messages.len());
        assert!(session.updated_at >= session.created_at);
        assert_eq!(session.user_messages().count(), 1);
    }

    #[test]
    fn test_empty_session_omits_optional_fields() {
        let value = serde_json::to_value(Session::new("s-1", "a")).unwrap();
        let obj = value.as_object().unwrap();
        assert!(!obj.contains_key("messages"));
        assert!(!obj.contains_key("message_count"));
    }

    #[test]
    fn test_role_is_lowercase() {
        assert_eq!(serde_json::to_value(Role::Assistant).unwrap(), json!("assistant"));
    }

    #[test]
    fn test_plan_defaults_on_deserialize() {
        let plan: AgentPlan =
            serde_json::from_value(json!({"name": "n", "role": "r"})).unwrap();
        assert_eq!(plan.model, DEFAULT_MODEL);
        assert_eq!(plan.level, 1);
        assert!(plan.team_members.is_none());

        let value = serde_json::to_value(&plan).unwrap();
        assert!(!value.as_object().unwrap().contains_key("team_members"));
    }

    #[test]
    fn test_plan_wire_keys() {
        let mut plan = AgentPlan::new("news", "Finds news");
        plan.usage_example = "¿Qué pasó hoy?".to_string();
        let value = serde_json::to_value(&plan).unwrap();
        let obj = value.as_object().unwrap();
        for key in ["name", "role", "model", "level", "tools", "instructions", "needs_memory", "is_team", "usage_example"] {
            assert!(obj.contains_key(key), "missing key {}", key);
        }
        assert_eq!(value["needs_memory"], json!(false));
        assert_eq!(value["usage_example"], json!("¿Qué pasó hoy?"));
    }

    #[test]
    fn test_generate_response_wire_keys() {
        let resp = GenerateResponse {
            code: "print()".to_string(),
            plan: AgentPlan::new("news", "Finds news"),
            filename: "news_agent.py".to_string(),
            filepath: "generated/agents/news_agent.py".to_string(),
            lines: 0,
            size_bytes: 7,
            created_at: "2024-05-01T10:00:00Z".to_string(),
        };
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["size_bytes"], json!(7));
        assert_eq!(value["created_at"], json!("2024-05-01T10:00:00Z"));
        assert_eq!(value["filepath"], json!("generated/agents/news_agent.py"));
        assert!(value["plan"].is_object());
    }

    #[test]
    fn test_health_status_probe() {
        let healthy = HealthStatus::probe(&Ok(()));
        assert!(healthy.is_ok());
        assert_eq!(serde_json::to_value(&healthy).unwrap(), json!({"status": "ok"}));

        let down = HealthStatus::probe(&Err(ClientError::Unavailable("refused".into())));
        assert!(!down.is_ok());
        assert_eq!(down.status, "unavailable");
    }

    #[test]
    fn test_plan_names_cannot_escape() {
        for name in ["../escape", "a/b", "a\\b", ".."] {
            assert!(matches!(
                AgentPlan::new(name, "role").validate(),
                Err(ClientError::InvalidPlan(_))
            ));
        }
        assert!(AgentPlan::new("búsqueda_noticias", "role").validate().is_ok());
    }

    #[test]
    fn test_plan_validation() {
        assert!(AgentPlan::new("news", "Finds news").validate().is_ok());
        assert!(matches!(
            AgentPlan::new("", "Finds news").validate(),
            Err(ClientError::InvalidPlan(_))
        ));
        assert!(matches!(
            AgentPlan::new("news", "  ").validate(),
            Err(ClientError::InvalidPlan(_))
        ));

        let mut plan = AgentPlan::new("news", "Finds news");
        plan.team_members = Some(vec![TeamMember::new()]);
        assert!(plan.validate().is_err());
        plan.is_team = true;
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn test_team_member_values_roundtrip_in_key_order() {
        let mut nested = BTreeMap::new();
        nested.insert("temperature".to_string(), MemberValue::Float(0.2));
        let mut member = TeamMember::new();
        member.insert("role".into(), "Busca noticias".into());
        member.insert("name".into(), "searcher".into());
        member.insert("priority".into(), 1i64.into());
        member.insert("lead".into(), true.into());
        member.insert("settings".into(), MemberValue::Map(nested));

        let text = serde_json::to_string(&member).unwrap();
        assert_eq!(
            text,
            r#"{"lead":true,"name":"searcher","priority":1,"role":"Busca noticias","settings":{"temperature":0.2}}"#
        );
        let back: TeamMember = serde_json::from_str(&text).unwrap();
        assert_eq!(back, member);
    }

    #[test]
    fn test_error_response_shape() {
        let doc: ErrorResponse = serde_json::from_value(json!({
            "error": {"code": "INVALID_PLAN", "message": "missing name", "details": {"field": "name"}}
        }))
        .unwrap();
        assert_eq!(doc.error.code, "INVALID_PLAN");
        assert_eq!(doc.error.details.unwrap()["field"], json!("name"));

        let value = serde_json::to_value(ErrorEnvelope::new("X", "y")).unwrap();
        assert!(!value.as_object().unwrap().contains_key("details"));
    }

    #[test]
    fn test_generate_options_default_on() {
        let req: GenerateRequest =
            serde_json::from_value(json!({"plan": {"name": "n", "role": "r"}})).unwrap();
        assert_eq!(req.options, GenerateOptions::default());
        assert!(req.options.save_to_file);
    }
}
