//! Source template for generated agents
//!
//! Downstream tooling inspects generated files, so the rendered text must stay byte
//! for byte stable.

use crate::models::{AgentPlan, GenerateResponse};

/// Directory, relative to the output root, that generated agents are written to
pub const OUTPUT_DIR: &str = "generated/agents";

/// Bytes per line used for the approximate `lines` metric
const BYTES_PER_LINE: usize = 50;

/// Render the executable agent stub for `plan`
pub fn render_agent(plan: &AgentPlan) -> String {
    format!(
        concat!(
            "\"\"\"\n",
            "{name} - Agente AI generado automáticamente.\n",
            "\n",
            "Rol: {role}\n",
            "\"\"\"\n",
            "\n",
            "from agno.agent import Agent\n",
            "from agno.models.deepseek import DeepSeek\n",
            "\n",
            "def main():\n",
            "    agent = Agent(\n",
            "        name=\"{name}\",\n",
            "        role=\"{role}\",\n",
            "        model=DeepSeek(id=\"{model}\"),\n",
            "        markdown=True,\n",
            "    )\n",
            "    \n",
            "    agent.print_response(\"Hola, ¿cómo puedo ayudarte?\", stream=True)\n",
            "\n",
            "if __name__ == \"__main__\":\n",
            "    main()\n",
        ),
        name = plan.name,
        role = plan.role,
        model = plan.model,
    )
}

/// `<name>_agent.py`
pub fn filename(plan: &AgentPlan) -> String {
    format!("{}_agent.py", plan.name)
}

/// `generated/agents/<name>_agent.py`
pub fn filepath(plan: &AgentPlan) -> String {
    format!("{}/{}", OUTPUT_DIR, filename(plan))
}

/// Approximate line count kept for compatibility: byte length / 50, not newlines.
pub fn approx_lines(code: &str) -> usize {
    code.len() / BYTES_PER_LINE
}

/// Assemble the full response for an already validated plan
pub fn build_response(plan: AgentPlan, created_at: String) -> GenerateResponse {
    let code = render_agent(&plan);
    GenerateResponse {
        filename: filename(&plan),
        filepath: filepath(&plan),
        lines: approx_lines(&code),
        size_bytes: code.len(),
        created_at,
        plan,
        code,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NEWS_AGENT: &str = r#""""
news_search - Agente AI generado automáticamente.

Rol: Searches and summarizes news
"""

from agno.agent import Agent
from agno.models.deepseek import DeepSeek

def main():
    agent = Agent(
        name="news_search",
        role="Searches and summarizes news",
        model=DeepSeek(id="deepseek-chat"),
        markdown=True,
    )
"#;

    fn news_plan() -> AgentPlan {
        AgentPlan::new("news_search", "Searches and summarizes news").with_model("deepseek-chat")
    }

    #[test]
    fn test_render_header_and_constructor() {
        let code = render_agent(&news_plan());
        assert!(code.starts_with(NEWS_AGENT));
        assert!(code.contains("role=\"Searches and summarizes news\""));
        assert!(code.contains("\n    \n    agent.print_response("));
        assert!(code.ends_with("if __name__ == \"__main__\":\n    main()\n"));
    }

    #[test]
    fn test_paths_follow_name() {
        let plan = news_plan();
        assert_eq!(filename(&plan), "news_search_agent.py");
        assert_eq!(filepath(&plan), "generated/agents/news_search_agent.py");
    }

    #[test]
    fn test_metrics_use_byte_length() {
        let resp = build_response(news_plan(), "2024-01-01T00:00:00Z".into());
        assert_eq!(resp.size_bytes, resp.code.len());
        assert_eq!(resp.lines, resp.code.len() / 50);
        // Non-ASCII characters in the template count as multiple bytes.
        assert!(resp.size_bytes > resp.code.chars().count());
    }
}
