//! Interactive front ends
//!
//! Both front ends only consume [`crate::pipeline::Workflow`]; they never talk to a
//! backend directly.

pub mod console;
#[cfg(feature = "tui")]
pub mod tui;

use crate::models::AgentPlan;

/// Human-readable plan summary shared by the console and the TUI
pub fn plan_summary(plan: &AgentPlan) -> Vec<(&'static str, String)> {
    let tools = if plan.tools.is_empty() {
        "None".to_string()
    } else {
        plan.tools.iter().cloned().collect::<Vec<_>>().join(", ")
    };
    vec![
        ("Name", plan.name.clone()),
        ("Role", plan.role.clone()),
        ("Model", plan.model.clone()),
        ("Level", plan.level.to_string()),
        ("Tools", tools),
        ("Memory", if plan.needs_memory { "Yes" } else { "No" }.to_string()),
        ("Type", if plan.is_team { "Team" } else { "Single agent" }.to_string()),
    ]
}
