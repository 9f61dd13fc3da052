//! Deterministic plan extraction from a finished conversation
//!
//! The analyzer asks a fixed sequence of questions, so the transcript is read
//! positionally: the first user message is the request, the second answers the tool
//! menu and the third answers the memory question.

use std::collections::BTreeSet;

use crate::error::{ClientError, ClientResult};
use crate::models::{AgentPlan, MemberValue, Session, TeamMember, DEFAULT_MODEL, TEAM_MODEL};

/// Words dropped when deriving an agent name from the request
const STOPWORDS: &[&str] = &[
    "a", "an", "the", "of", "for", "that", "to", "and", "with", "create", "build", "make", "agent",
    "un", "una", "el", "la", "los", "las", "de", "del", "que", "para", "y", "con", "crear",
    "construir", "agente", "quiero", "necesito",
];

/// How many significant words end up in a derived name
const NAME_WORDS: usize = 3;

const FALLBACK_NAME: &str = "custom";

/// Tool identifiers offered by the analyzer's menu, in menu order
const MENU_TOOLS: [(char, &str); 4] = [('a', "duckduckgo"), ('b', "yfinance"), ('c', "file"), ('d', "python")];

/// Menu letter for "something else"
const OTHER_CHOICE: char = 'e';

/// Words that describe the request rather than the tool
const TOOL_FILLER: &[&str] = &[
    "i", "need", "needs", "want", "wants", "tool", "tools", "use", "should", "can", "it", "is",
    "herramienta", "herramientas", "usar", "otra", "other", "por", "favor", "please",
];

const TOOL_KEYWORDS: &[(&str, &str)] = &[
    ("web", "duckduckgo"),
    ("búsqueda", "duckduckgo"),
    ("busqueda", "duckduckgo"),
    ("search", "duckduckgo"),
    ("noticias", "duckduckgo"),
    ("news", "duckduckgo"),
    ("financ", "yfinance"),
    ("acciones", "yfinance"),
    ("mercado", "yfinance"),
    ("stock", "yfinance"),
    ("archivo", "file"),
    ("file", "file"),
    ("python", "python"),
    ("código", "python"),
    ("codigo", "python"),
    ("code", "python"),
];

const AFFIRMATIVE: &[&str] = &["a", "s", "si", "sí", "y", "yes", "true"];

/// Answers collected from the analyzer conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanBuilder {
    request: String,
    tools_answer: Option<String>,
    memory_answer: Option<String>,
}

impl PlanBuilder {
    pub fn new(request: impl Into<String>) -> Self {
        Self {
            request: request.into(),
            tools_answer: None,
            memory_answer: None,
        }
    }

    pub fn tools_answer(mut self, answer: impl Into<String>) -> Self {
        self.tools_answer = Some(answer.into());
        self
    }

    pub fn memory_answer(mut self, answer: impl Into<String>) -> Self {
        self.memory_answer = Some(answer.into());
        self
    }

    /// Read the user's answers out of an analyzer transcript
    pub fn from_session(session: &Session) -> ClientResult<Self> {
        let mut answers = session.user_messages().map(|m| m.content.trim().to_string());
        let request = answers
            .next()
            .filter(|r| !r.is_empty())
            .ok_or_else(|| ClientError::InvalidPlan("conversation has no request".to_string()))?;

        Ok(Self {
            request,
            tools_answer: answers.next(),
            memory_answer: answers.next(),
        })
    }

    pub fn build(&self) -> AgentPlan {
        let request = self.request.trim();
        let is_team = mentions_team(request);
        let tools = self.tools_answer.as_deref().map(parse_tools).unwrap_or_default();
        let needs_memory = self.memory_answer.as_deref().is_some_and(is_affirmative);

        let mut plan = AgentPlan::new(derive_name(request), capitalize(request));
        plan.model = if is_team { TEAM_MODEL } else { DEFAULT_MODEL }.to_string();
        plan.level = if is_team {
            4
        } else if needs_memory {
            3
        } else {
            1
        };
        plan.instructions = tools.iter().map(|tool| tool_instruction(tool)).collect();
        if needs_memory {
            plan.instructions.push("Remember relevant details from previous conversations".to_string());
        }
        plan.instructions.push("Answer clearly and concisely".to_string());
        plan.needs_memory = needs_memory;
        plan.is_team = is_team;
        if is_team {
            plan.team_members = Some(team_members(&tools, &plan.role));
        }
        plan.usage_example = request.to_string();
        plan.tools = tools;
        plan
    }
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
}

/// Snake-case name built from the significant words of the request
pub fn derive_name(request: &str) -> String {
    let significant: Vec<String> = words(request)
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .take(NAME_WORDS)
        .collect();
    if significant.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        significant.join("_")
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn mentions_team(request: &str) -> bool {
    words(request).any(|w| matches!(w.as_str(), "team" | "teams" | "equipo" | "equipos"))
}

/// Menu letter written as a choice, e.g. `a)`, `(b)` or `c.`
fn menu_choice(token: &str) -> Option<char> {
    let inner = token.trim_start_matches('(');
    let mut chars = inner.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(letter), Some(')' | '.'), None) if letter.is_ascii_alphabetic() => Some(letter),
        _ => None,
    }
}

/// Map an answer to the tool menu onto tool identifiers
///
/// Letters count as menu choices when written `a)` or when the whole answer is a list
/// of letters ("a, c"). Other answers are matched on word prefixes and fall back to a
/// custom tool named after the answer.
pub fn parse_tools(answer: &str) -> BTreeSet<String> {
    let lowered = answer.to_lowercase();
    let all_letters = words(&lowered).all(|w| w.chars().count() == 1);

    let letters: Vec<char> = if all_letters {
        words(&lowered).filter_map(|w| w.chars().next()).collect()
    } else {
        lowered
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter_map(menu_choice)
            .collect()
    };

    let mut tools = BTreeSet::new();
    let mut wants_other = false;
    for letter in letters {
        if let Some((_, tool)) = MENU_TOOLS.iter().find(|(l, _)| *l == letter) {
            tools.insert(tool.to_string());
        } else if letter == OTHER_CHOICE {
            wants_other = true;
        }
    }

    for word in words(&lowered) {
        for (keyword, tool) in TOOL_KEYWORDS {
            if word.starts_with(*keyword) {
                tools.insert(tool.to_string());
            }
        }
    }

    if wants_other || (tools.is_empty() && !lowered.trim().is_empty()) {
        let custom: Vec<String> = words(&lowered)
            .filter(|w| w.chars().count() > 1)
            .filter(|w| !STOPWORDS.contains(&w.as_str()) && !TOOL_FILLER.contains(&w.as_str()))
            .take(2)
            .collect();
        if !custom.is_empty() {
            tools.insert(custom.join("_"));
        }
    }
    tools
}

fn is_affirmative(answer: &str) -> bool {
    words(answer)
        .next()
        .is_some_and(|first| AFFIRMATIVE.contains(&first.as_str()))
}

fn tool_instruction(tool: &str) -> String {
    match tool {
        "duckduckgo" => "Search the web for current, relevant information".to_string(),
        "yfinance" => "Use financial data for questions about stocks and markets".to_string(),
        "file" => "Read and analyze the files the user provides".to_string(),
        "python" => "Write and run Python code when a calculation helps".to_string(),
        other => format!("Use the {} tool when it is relevant", other),
    }
}

fn team_members(tools: &BTreeSet<String>, role: &str) -> Vec<TeamMember> {
    if tools.is_empty() {
        let mut member = TeamMember::new();
        member.insert("name".into(), "assistant".into());
        member.insert("role".into(), MemberValue::Text(role.to_string()));
        return vec![member];
    }

    tools
        .iter()
        .map(|tool| {
            let mut member = TeamMember::new();
            member.insert("name".into(), format!("{}_specialist", tool).into());
            member.insert("role".into(), tool_instruction(tool).into());
            member.insert("tool".into(), tool.as_str().into());
            member
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[test]
    fn test_derive_name() {
        assert_eq!(derive_name("Crear un agente de búsqueda de noticias"), "búsqueda_noticias");
        assert_eq!(derive_name("Build an agent that tracks crypto prices daily"), "tracks_crypto_prices");
        assert_eq!(derive_name("!!!"), "custom");
    }

    #[test]
    fn test_parse_tools_from_menu_letters() {
        let tools = parse_tools("a) y d)");
        assert_eq!(tools, BTreeSet::from(["duckduckgo".to_string(), "python".to_string()]));
    }

    #[test]
    fn test_parse_tools_from_keywords() {
        let tools = parse_tools("Datos financieros, por favor");
        assert!(tools.contains("yfinance"));
    }

    #[test]
    fn test_parse_tools_other() {
        let tools = parse_tools("e) traducción automática");
        assert_eq!(tools, BTreeSet::from(["traducción_automática".to_string()]));
    }

    #[test]
    fn test_parse_tools_ignores_articles_and_inner_substrings() {
        let tools = parse_tools("I need a tool that translates text");
        assert_eq!(tools, BTreeSet::from(["translates_text".to_string()]));

        let tools = parse_tools("e) decode user profiles");
        assert_eq!(tools, BTreeSet::from(["decode_user".to_string()]));
    }

    #[test]
    fn test_parse_tools_letter_lists() {
        let tools = parse_tools("a, c");
        assert_eq!(tools, BTreeSet::from(["duckduckgo".to_string(), "file".to_string()]));
        assert_eq!(parse_tools("(b)"), BTreeSet::from(["yfinance".to_string()]));
    }

    #[test]
    fn test_affirmative_answers() {
        assert!(is_affirmative("a) Sí, necesita memoria"));
        assert!(is_affirmative("Sí"));
        assert!(!is_affirmative("b"));
        assert!(!is_affirmative("No, cada conversación es independiente"));
    }

    #[test]
    fn test_build_basic_plan() {
        let plan = PlanBuilder::new("un agente de noticias tech")
            .tools_answer("a")
            .memory_answer("b")
            .build();

        assert_eq!(plan.name, "noticias_tech");
        assert_eq!(plan.role, "Un agente de noticias tech");
        assert_eq!(plan.model, DEFAULT_MODEL);
        assert_eq!(plan.level, 1);
        assert!(!plan.needs_memory);
        assert!(plan.tools.contains("duckduckgo"));
        assert!(plan.team_members.is_none());
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn test_build_memory_plan() {
        let plan = PlanBuilder::new("asistente financiero")
            .tools_answer("b")
            .memory_answer("a")
            .build();
        assert!(plan.needs_memory);
        assert_eq!(plan.level, 3);
        assert!(plan.instructions.iter().any(|i| i.contains("previous conversations")));
    }

    #[test]
    fn test_build_team_plan() {
        let plan = PlanBuilder::new("Un equipo que escriba artículos de IA")
            .tools_answer("a, c")
            .build();
        assert!(plan.is_team);
        assert_eq!(plan.model, TEAM_MODEL);
        assert_eq!(plan.level, 4);
        let members = plan.team_members.as_ref().unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0]["tool"], MemberValue::Text("duckduckgo".into()));
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn test_from_session_reads_answers_in_order() {
        let mut session = Session::new("s", "analyzer_agent");
        session.append(Role::User, "agente de noticias");
        session.append(Role::Assistant, "¿Herramientas?");
        session.append(Role::User, "a");
        session.append(Role::Assistant, "¿Memoria?");
        session.append(Role::User, "sí");

        let builder = PlanBuilder::from_session(&session).unwrap();
        assert_eq!(builder, PlanBuilder::new("agente de noticias").tools_answer("a").memory_answer("sí"));
    }

    #[test]
    fn test_from_session_requires_request() {
        let session = Session::new("s", "analyzer_agent");
        assert!(matches!(
            PlanBuilder::from_session(&session),
            Err(ClientError::InvalidPlan(_))
        ));
    }
}
