//! Text rendering shared by the adapters that do not interpolate natively.

use std::fmt::Write as _;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::domain::{AgentDef, CrewDef};
use crate::runner::RunInputs;

/// Characters of a task description kept in a flattened system prompt.
pub const TASK_SUMMARY_CHARS: usize = 200;

fn placeholder_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").ok())
        .as_ref()
}

/// Replace `{name}` with the matching input; unknown names stay as written.
pub fn render_placeholders(text: &str, inputs: &RunInputs) -> String {
    let Some(re) = placeholder_re() else {
        return text.to_string();
    };
    re.replace_all(text, |caps: &Captures<'_>| match inputs.get(&caps[1]) {
        Some(value) => value.to_string(),
        None => caps[0].to_string(),
    })
    .into_owned()
}

/// One-paragraph persona for an agent.
pub fn agent_persona(agent: &AgentDef) -> String {
    format!(
        "You are {}.\nGoal: {}\nBackstory: {}",
        agent.role,
        agent.goal.trim(),
        agent.backstory.trim()
    )
}

/// Flatten a whole crew into one system prompt for a single agent.
pub fn crew_system_prompt(crew: &CrewDef) -> String {
    let mut prompt = String::new();
    if !crew.description.trim().is_empty() {
        let _ = writeln!(prompt, "{}\n", crew.description.trim());
    }

    prompt.push_str("## Team roles\n");
    for agent in crew.agents.iter() {
        let _ = writeln!(
            prompt,
            "### {}\nGoal: {}\nBackstory: {}\n",
            agent.role,
            agent.goal.trim(),
            agent.backstory.trim()
        );
    }

    prompt.push_str("## Tasks\n");
    for task in crew.tasks.iter() {
        let description = task.description.trim();
        if description.chars().count() > TASK_SUMMARY_CHARS {
            let summary: String = description.chars().take(TASK_SUMMARY_CHARS).collect();
            let _ = writeln!(prompt, "- {}: {}...", task.name, summary.trim_end());
        } else {
            let _ = writeln!(prompt, "- {}: {description}", task.name);
        }
    }
    prompt.trim_end().to_string()
}
