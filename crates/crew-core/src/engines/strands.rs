//! strands adapter: the crew collapses into one agent.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::host::EngineHost;
use super::prompt::{crew_system_prompt, render_placeholders};
use super::{build_error, check_handle, ensure_buildable, knowledge_paths, tools};
use crate::domain::{CrewDef, EngineKind, Result};
use crate::runner::{EngineHandle, RunInputs, Runner};

const ENGINE: EngineKind = EngineKind::Strands;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AgentBlueprint {
    system_prompt: String,
    model_id: Option<String>,
    tools: Vec<String>,
    knowledge_sources: Vec<String>,
}

#[derive(Debug, Serialize)]
struct AgentCall {
    #[serde(flatten)]
    agent: AgentBlueprint,
    prompt: String,
}

pub struct StrandsRunner {
    host: Arc<dyn EngineHost>,
}

impl StrandsRunner {
    pub fn new(host: Arc<dyn EngineHost>) -> Self {
        Self { host }
    }
}

#[async_trait]
impl Runner for StrandsRunner {
    fn name(&self) -> &str {
        ENGINE.as_str()
    }

    async fn build(&self, crew: &CrewDef) -> Result<EngineHandle> {
        ensure_buildable(ENGINE, crew)?;

        let mut all_tools = BTreeSet::new();
        for agent in crew.agents.iter() {
            all_tools.extend(tools::resolve_for(ENGINE, &crew.name, agent)?);
        }

        // strands takes a bare model id, the provider is configured separately
        let agent = AgentBlueprint {
            system_prompt: crew_system_prompt(crew),
            model_id: crew.llm.model.clone(),
            tools: all_tools.into_iter().collect(),
            knowledge_sources: knowledge_paths(crew),
        };
        Ok(EngineHandle {
            runner: ENGINE.as_str().to_string(),
            crew: crew.name.clone(),
            blueprint: serde_json::to_value(&agent)
                .map_err(|e| build_error(ENGINE, &crew.name, e.to_string()))?,
        })
    }

    async fn run(&self, handle: &EngineHandle, inputs: &RunInputs) -> Result<String> {
        check_handle(ENGINE, handle)?;
        let mut agent: AgentBlueprint = serde_json::from_value(handle.blueprint.clone())
            .map_err(|e| build_error(ENGINE, &handle.crew, format!("corrupt blueprint: {e}")))?;
        agent.system_prompt = render_placeholders(&agent.system_prompt, inputs);

        let call = AgentCall {
            agent,
            prompt: inputs.prompt().to_string(),
        };
        let payload = serde_json::to_value(&call)
            .map_err(|e| build_error(ENGINE, &handle.crew, e.to_string()))?;
        Ok(self.host.invoke(ENGINE, &payload, inputs).await?)
    }
}
