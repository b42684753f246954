//! crewai adapter.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use super::host::EngineHost;
use super::{build_error, check_handle, ensure_buildable, knowledge_paths, model_string, tools};
use crate::domain::{CrewDef, EngineKind, Process, Result};
use crate::runner::{EngineHandle, RunInputs, Runner};

const ENGINE: EngineKind = EngineKind::CrewAi;

#[derive(Debug, Serialize)]
struct CrewBlueprint {
    agents: Vec<AgentBlueprint>,
    tasks: Vec<TaskBlueprint>,
    process: Process,
    planning: bool,
    memory: bool,
    knowledge_sources: Vec<String>,
    /// Manager model, required by hierarchical crews.
    manager_llm: Option<String>,
}

#[derive(Debug, Serialize)]
struct AgentBlueprint {
    role: String,
    goal: String,
    backstory: String,
    tools: Vec<String>,
    llm: Option<String>,
    allow_delegation: bool,
}

#[derive(Debug, Serialize)]
struct TaskBlueprint {
    name: String,
    description: String,
    expected_output: String,
    /// Index into `agents`.
    agent: usize,
    /// Indices of earlier tasks.
    context: Vec<usize>,
}

/// Builds a `Crew` and runs it with `kickoff(inputs)`.
pub struct CrewAiRunner {
    host: Arc<dyn EngineHost>,
}

impl CrewAiRunner {
    pub fn new(host: Arc<dyn EngineHost>) -> Self {
        Self { host }
    }
}

#[async_trait]
impl Runner for CrewAiRunner {
    fn name(&self) -> &str {
        ENGINE.as_str()
    }

    async fn build(&self, crew: &CrewDef) -> Result<EngineHandle> {
        ensure_buildable(ENGINE, crew)?;
        let crew_llm = model_string(&crew.llm);

        let agents = crew
            .agents
            .iter()
            .map(|agent| {
                Ok(AgentBlueprint {
                    role: agent.role.clone(),
                    goal: agent.goal.clone(),
                    backstory: agent.backstory.clone(),
                    tools: tools::resolve_for(ENGINE, &crew.name, agent)?,
                    llm: agent.llm.clone().or_else(|| crew_llm.clone()),
                    allow_delegation: agent.allow_delegation,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let tasks = crew
            .tasks
            .iter()
            .map(|task| TaskBlueprint {
                name: task.name.clone(),
                description: task.description.clone(),
                expected_output: task.expected_output.clone(),
                agent: task.agent.index(),
                context: task.context.iter().map(|id| id.index()).collect(),
            })
            .collect();

        if crew.process == Process::Hierarchical && crew_llm.is_none() {
            return Err(build_error(
                ENGINE,
                &crew.name,
                "hierarchical process needs a crew or manifest llm for the manager",
            ));
        }

        let blueprint = CrewBlueprint {
            agents,
            tasks,
            process: crew.process,
            planning: true,
            memory: true,
            knowledge_sources: knowledge_paths(crew),
            manager_llm: crew_llm.filter(|_| crew.process == Process::Hierarchical),
        };
        let blueprint = serde_json::to_value(&blueprint)
            .map_err(|e| build_error(ENGINE, &crew.name, e.to_string()))?;

        Ok(EngineHandle {
            runner: ENGINE.as_str().to_string(),
            crew: crew.name.clone(),
            blueprint,
        })
    }

    async fn run(&self, handle: &EngineHandle, inputs: &RunInputs) -> Result<String> {
        check_handle(ENGINE, handle)?;
        Ok(self.host.invoke(ENGINE, &handle.blueprint, inputs).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ErrorKind, LlmConfig};
    use crate::engines::fixtures::{crew, RecordingHost};

    #[tokio::test]
    async fn test_blueprint_uses_indices_and_class_names() {
        let runner = CrewAiRunner::new(Arc::new(RecordingHost::default()));
        let handle = runner.build(&crew()).await.unwrap();
        let bp = &handle.blueprint;

        assert_eq!(bp["process"], "sequential");
        assert_eq!(bp["planning"], true);
        assert_eq!(bp["memory"], true);
        assert_eq!(bp["agents"][1]["tools"][0], "GameCodeReaderTool");
        assert_eq!(bp["agents"][0]["llm"], "anthropic/claude-sonnet");
        assert_eq!(bp["tasks"][1]["agent"], 1);
        assert_eq!(bp["tasks"][1]["context"][0], 0);
        assert_eq!(bp["knowledge_sources"][0], "/ws/knowledge/ecs");
        // crewai interpolates placeholders itself
        assert_eq!(bp["tasks"][0]["description"], "Plan {component_spec}");
    }

    #[tokio::test]
    async fn test_run_passes_inputs_through() {
        let host = Arc::new(RecordingHost::default());
        let runner = CrewAiRunner::new(host.clone());
        let inputs = RunInputs::from_text("BiomeComponent");
        let out = runner.build_and_run(&crew(), &inputs).await.unwrap();

        assert_eq!(out, "crewai done");
        let calls = host.calls.lock().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].2.get("component_spec"), Some("BiomeComponent"));
    }

    #[tokio::test]
    async fn test_hierarchical_without_llm_fails_to_build() {
        let mut def = crew();
        def.process = Process::Hierarchical;
        def.llm = LlmConfig::default();
        let runner = CrewAiRunner::new(Arc::new(RecordingHost::default()));
        let err = runner.build(&def).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EngineBuild);
    }
}
