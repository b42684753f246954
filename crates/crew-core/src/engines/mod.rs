//! Multi-agent engine adapters.
//!
//! Each adapter translates a neutral [`CrewDef`] into the construction shape
//! its engine expects (the blueprint) and hands it to an [`EngineHost`].
//!
//! - `crewai`: agents and tasks map one to one, inputs interpolated natively
//! - `langgraph`: one ReAct node per agent, a linear graph of task steps
//! - `strands`: the whole crew flattened into one agent's system prompt

pub mod crewai;
pub mod host;
pub mod langgraph;
pub mod probe;
pub mod prompt;
pub mod strands;
pub mod tools;

use std::sync::Arc;

pub use crewai::CrewAiRunner;
pub use host::{EngineHost, HostOverrides, ProcessEngineHost};
pub use langgraph::LangGraphRunner;
pub use probe::{EngineProbe, PythonModuleProbe, StaticProbe};
pub use strands::StrandsRunner;

use crate::domain::{CrewDef, CrewError, EngineKind, LlmConfig, Result};
use crate::runner::{EngineHandle, Runner};

/// Adapter for `engine`, running through `host`.
pub fn runner_for(engine: EngineKind, host: Arc<dyn EngineHost>) -> Box<dyn Runner> {
    match engine {
        EngineKind::CrewAi => Box::new(CrewAiRunner::new(host)),
        EngineKind::LangGraph => Box::new(LangGraphRunner::new(host)),
        EngineKind::Strands => Box::new(StrandsRunner::new(host)),
    }
}

/// `provider/model`, or the bare model when no provider is set.
pub(crate) fn model_string(llm: &LlmConfig) -> Option<String> {
    match (&llm.provider, &llm.model) {
        (Some(provider), Some(model)) if !model.contains('/') => {
            Some(format!("{provider}/{model}"))
        }
        (_, Some(model)) => Some(model.clone()),
        (_, None) => None,
    }
}

pub(crate) fn knowledge_paths(crew: &CrewDef) -> Vec<String> {
    crew.knowledge
        .iter()
        .map(|source| source.path.display().to_string())
        .collect()
}

pub(crate) fn build_error(engine: EngineKind, crew: &str, reason: impl Into<String>) -> CrewError {
    CrewError::EngineBuild {
        engine: engine.to_string(),
        crew: crew.to_string(),
        reason: reason.into(),
    }
}

/// Every engine needs at least one agent and one task.
pub(crate) fn ensure_buildable(engine: EngineKind, crew: &CrewDef) -> Result<()> {
    if crew.agents.is_empty() {
        return Err(build_error(engine, &crew.name, "crew declares no agents"));
    }
    if crew.tasks.is_empty() {
        return Err(build_error(engine, &crew.name, "crew declares no tasks"));
    }
    Ok(())
}

pub(crate) fn check_handle(engine: EngineKind, handle: &EngineHandle) -> Result<()> {
    if handle.runner == engine.as_str() {
        Ok(())
    } else {
        Err(build_error(
            engine,
            &handle.crew,
            format!("handle was built by '{}'", handle.runner),
        ))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Crew and host doubles shared by the adapter tests.

    use std::path::PathBuf;

    use async_trait::async_trait;
    use serde_json::Value;
    use tokio::sync::Mutex;

    use super::host::EngineHost;
    use crate::domain::{
        AgentDef, AgentId, AgentSet, CrewDef, EngineKind, ExecutionError, KnowledgeSource,
        LlmConfig, Process, TaskDef, TaskId, TaskSet,
    };
    use crate::runner::RunInputs;

    pub fn agent(name: &str, role: &str, tools: &[&str]) -> AgentDef {
        AgentDef {
            name: name.to_string(),
            role: role.to_string(),
            goal: format!("{role} goal"),
            backstory: format!("{role} backstory"),
            tools: tools.iter().map(|t| t.to_string()).collect(),
            llm: None,
            allow_delegation: false,
        }
    }

    pub fn crew() -> CrewDef {
        CrewDef {
            name: "game_builder".to_string(),
            description: "Builds ECS components".to_string(),
            required_engine: None,
            process: Process::Sequential,
            llm: LlmConfig {
                provider: Some("anthropic".to_string()),
                model: Some("claude-sonnet".to_string()),
            },
            agents: AgentSet::from_vec(vec![
                agent("planner", "Lead Planner", &[]),
                agent("coder", "Rust Engineer", &["read_file", "write_file"]),
            ]),
            tasks: TaskSet::from_vec(vec![
                TaskDef {
                    name: "plan".to_string(),
                    description: "Plan {component_spec}".to_string(),
                    expected_output: "A plan".to_string(),
                    agent: AgentId(0),
                    context: vec![],
                },
                TaskDef {
                    name: "implement".to_string(),
                    description: "Implement the plan".to_string(),
                    expected_output: "Code".to_string(),
                    agent: AgentId(1),
                    context: vec![TaskId(0)],
                },
            ]),
            knowledge: vec![KnowledgeSource {
                path: PathBuf::from("/ws/knowledge/ecs"),
            }],
        }
    }

    /// Records every invocation and replies with a fixed output.
    #[derive(Default)]
    pub struct RecordingHost {
        pub calls: Mutex<Vec<(EngineKind, Value, RunInputs)>>,
    }

    #[async_trait]
    impl EngineHost for RecordingHost {
        async fn invoke(
            &self,
            engine: EngineKind,
            blueprint: &Value,
            inputs: &RunInputs,
        ) -> Result<String, ExecutionError> {
            self.calls
                .lock()
                .await
                .push((engine, blueprint.clone(), inputs.clone()));
            Ok(format!("{engine} done"))
        }
    }
}
