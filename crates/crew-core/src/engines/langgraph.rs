//! langgraph adapter.
//!
//! Every agent becomes a ReAct node; tasks become a linear chain of steps in
//! declaration order. The graph is invoked with a single user message and
//! answers with the content of its last message.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::host::EngineHost;
use super::prompt::{agent_persona, render_placeholders};
use super::{build_error, check_handle, ensure_buildable, knowledge_paths, model_string, tools};
use crate::domain::{CrewDef, EngineKind, Result};
use crate::runner::{EngineHandle, RunInputs, Runner};

const ENGINE: EngineKind = EngineKind::LangGraph;

/// Node model when neither the agent nor the crew names one.
pub const DEFAULT_MODEL: &str = "claude-haiku-4-5-20251001";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GraphBlueprint {
    nodes: Vec<ReactNode>,
    steps: Vec<GraphStep>,
    knowledge_sources: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ReactNode {
    name: String,
    model: String,
    tools: Vec<String>,
    prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GraphStep {
    task: String,
    /// Name of the node that performs the step.
    node: String,
    instruction: String,
    expected_output: String,
    context: Vec<String>,
}

#[derive(Debug, Serialize)]
struct GraphInvocation {
    #[serde(flatten)]
    graph: GraphBlueprint,
    messages: Vec<(String, String)>,
}

pub struct LangGraphRunner {
    host: Arc<dyn EngineHost>,
}

impl LangGraphRunner {
    pub fn new(host: Arc<dyn EngineHost>) -> Self {
        Self { host }
    }
}

#[async_trait]
impl Runner for LangGraphRunner {
    fn name(&self) -> &str {
        ENGINE.as_str()
    }

    async fn build(&self, crew: &CrewDef) -> Result<EngineHandle> {
        ensure_buildable(ENGINE, crew)?;
        let crew_model = model_string(&crew.llm);

        let nodes = crew
            .agents
            .iter()
            .map(|agent| {
                Ok(ReactNode {
                    name: agent.name.clone(),
                    model: agent
                        .llm
                        .clone()
                        .or_else(|| crew_model.clone())
                        .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                    tools: tools::resolve_for(ENGINE, &crew.name, agent)?,
                    prompt: agent_persona(agent),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let steps = crew
            .tasks
            .iter()
            .map(|task| GraphStep {
                task: task.name.clone(),
                node: crew.agent_for(task).name.clone(),
                instruction: task.description.clone(),
                expected_output: task.expected_output.clone(),
                context: task
                    .context
                    .iter()
                    .map(|id| crew.tasks.get(*id).name.clone())
                    .collect(),
            })
            .collect();

        let graph = GraphBlueprint {
            nodes,
            steps,
            knowledge_sources: knowledge_paths(crew),
        };
        Ok(EngineHandle {
            runner: ENGINE.as_str().to_string(),
            crew: crew.name.clone(),
            blueprint: serde_json::to_value(&graph)
                .map_err(|e| build_error(ENGINE, &crew.name, e.to_string()))?,
        })
    }

    async fn run(&self, handle: &EngineHandle, inputs: &RunInputs) -> Result<String> {
        check_handle(ENGINE, handle)?;
        let mut graph: GraphBlueprint = serde_json::from_value(handle.blueprint.clone())
            .map_err(|e| build_error(ENGINE, &handle.crew, format!("corrupt blueprint: {e}")))?;
        for step in &mut graph.steps {
            step.instruction = render_placeholders(&step.instruction, inputs);
        }

        let invocation = GraphInvocation {
            graph,
            messages: vec![("user".to_string(), inputs.prompt().to_string())],
        };
        let payload = serde_json::to_value(&invocation)
            .map_err(|e| build_error(ENGINE, &handle.crew, e.to_string()))?;
        Ok(self.host.invoke(ENGINE, &payload, inputs).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AgentDef, AgentSet, LlmConfig};
    use crate::engines::fixtures::{agent, crew, RecordingHost};

    #[tokio::test]
    async fn test_one_node_per_agent_and_linear_steps() {
        let runner = LangGraphRunner::new(Arc::new(RecordingHost::default()));
        let handle = runner.build(&crew()).await.unwrap();
        let bp = &handle.blueprint;

        assert_eq!(bp["nodes"].as_array().unwrap().len(), 2);
        assert_eq!(bp["nodes"][1]["tools"][1], "write_file");
        assert_eq!(bp["steps"][0]["node"], "planner");
        assert_eq!(bp["steps"][1]["context"][0], "plan");
        assert!(bp["nodes"][0]["prompt"]
            .as_str()
            .unwrap()
            .starts_with("You are Lead Planner."));
    }

    #[tokio::test]
    async fn test_run_renders_placeholders_and_sends_user_message() {
        let host = Arc::new(RecordingHost::default());
        let runner = LangGraphRunner::new(host.clone());
        let inputs = RunInputs::from_text("a BiomeComponent");
        let out = runner.build_and_run(&crew(), &inputs).await.unwrap();
        assert_eq!(out, "langgraph done");

        let calls = host.calls.lock().await;
        let payload = &calls[0].1;
        assert_eq!(payload["steps"][0]["instruction"], "Plan a BiomeComponent");
        assert_eq!(payload["messages"][0][0], "user");
        assert_eq!(payload["messages"][0][1], "a BiomeComponent");
    }

    #[tokio::test]
    async fn test_node_model_falls_back_to_default() {
        let mut def = crew();
        def.llm = LlmConfig::default();
        def.agents = AgentSet::from_vec(vec![
            AgentDef {
                llm: Some("claude-opus".to_string()),
                ..agent("planner", "Lead Planner", &[])
            },
            agent("coder", "Rust Engineer", &[]),
        ]);
        let runner = LangGraphRunner::new(Arc::new(RecordingHost::default()));
        let bp = runner.build(&def).await.unwrap().blueprint;

        assert_eq!(bp["nodes"][0]["model"], "claude-opus");
        assert_eq!(bp["nodes"][1]["model"], DEFAULT_MODEL);
    }

    #[tokio::test]
    async fn test_handle_from_other_engine_is_rejected() {
        let runner = LangGraphRunner::new(Arc::new(RecordingHost::default()));
        let handle = EngineHandle {
            runner: "strands".to_string(),
            crew: "game_builder".to_string(),
            blueprint: serde_json::Value::Null,
        };
        assert!(runner.run(&handle, &RunInputs::new()).await.is_err());
    }
}
