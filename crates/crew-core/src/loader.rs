//! Declaration loader.
//!
//! Parses `manifest.yaml` plus every crew's agents and tasks files into a
//! [`Manifest`]. All cross-file references are resolved here; a manifest
//! that loads successfully cannot fail later on a dangling agent, task or
//! knowledge path.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::domain::{
    AgentDef, AgentSet, CrewDef, CrewError, EngineKind, KnowledgeSource, LlmConfig, Manifest,
    Package, Process, Result, TaskDef, TaskId, TaskSet,
};

#[derive(Debug, Default, Deserialize)]
struct RawManifest {
    name: Option<String>,
    version: Option<Value>,
    llm: Option<RawLlm>,
    #[serde(default)]
    crews: Option<Mapping>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawLlm {
    Model(String),
    Config {
        provider: Option<String>,
        model: Option<String>,
    },
}

impl From<RawLlm> for LlmConfig {
    fn from(raw: RawLlm) -> Self {
        match raw {
            RawLlm::Model(model) => LlmConfig {
                provider: None,
                model: Some(model),
            },
            RawLlm::Config { provider, model } => LlmConfig { provider, model },
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawCrew {
    #[serde(default)]
    description: String,
    agents: Option<String>,
    tasks: Option<String>,
    #[serde(default)]
    knowledge: Vec<String>,
    process: Option<String>,
    required_framework: Option<String>,
    llm: Option<RawLlm>,
}

#[derive(Debug, Deserialize)]
struct RawAgent {
    role: Option<String>,
    goal: String,
    backstory: String,
    #[serde(default)]
    tools: Vec<String>,
    llm: Option<String>,
    #[serde(default)]
    allow_delegation: bool,
}

#[derive(Debug, Deserialize)]
struct RawTask {
    description: String,
    expected_output: String,
    agent: String,
    #[serde(default)]
    context: Vec<String>,
}

/// Load and fully resolve a package's declaration.
pub fn load(package: &Package) -> Result<Manifest> {
    let config_dir = &package.config_dir;
    let raw: RawManifest = read_yaml(&package.manifest_path())?.unwrap_or_default();

    let version = raw.version.map(version_string).transpose()?;
    let llm: LlmConfig = raw.llm.map(Into::into).unwrap_or_default();
    let pinned = package.pinned_engine();

    let mut crews = Vec::new();
    for (key, value) in raw.crews.unwrap_or_default() {
        let name = mapping_key(&key, "crew")?;
        let raw_crew: RawCrew = serde_yaml::from_value(value)
            .map_err(|e| config_error(format!("crew '{name}' in manifest: {e}")))?;
        crews.push(load_crew(config_dir, &name, raw_crew, pinned, &llm)?);
    }

    let manifest = Manifest::new(
        raw.name.unwrap_or_else(|| package.name.clone()),
        version,
        llm,
        config_dir.clone(),
        crews,
    );
    debug!(
        package = %package.name,
        crews = manifest.crews().len(),
        "manifest loaded"
    );
    Ok(manifest)
}

fn load_crew(
    config_dir: &Path,
    name: &str,
    raw: RawCrew,
    pinned: Option<EngineKind>,
    manifest_llm: &LlmConfig,
) -> Result<CrewDef> {
    let declared = raw
        .required_framework
        .as_deref()
        .map(EngineKind::from_str)
        .transpose()?;
    let required_engine = match (declared, pinned) {
        (Some(declared), Some(pinned)) if declared != pinned => {
            return Err(config_error(format!(
                "crew '{name}' requires {declared} but is declared in {}",
                pinned.config_dir()
            )));
        }
        (declared, pinned) => declared.or(pinned),
    };

    let process = match raw.process.as_deref().map(str::trim) {
        None | Some("sequential") => Process::Sequential,
        Some("hierarchical") => Process::Hierarchical,
        Some(other) => {
            return Err(config_error(format!(
                "crew '{name}' has unknown process '{other}'"
            )))
        }
    };

    let agents_rel = raw
        .agents
        .unwrap_or_else(|| format!("crews/{name}/agents.yaml"));
    let tasks_rel = raw
        .tasks
        .unwrap_or_else(|| format!("crews/{name}/tasks.yaml"));
    let agents = load_agents(&require_file(config_dir, &agents_rel, name)?)?;
    let tasks = load_tasks(&require_file(config_dir, &tasks_rel, name)?, &agents)?;

    let knowledge = raw
        .knowledge
        .iter()
        .map(|rel| {
            let path = config_dir.join(rel);
            if path.exists() {
                Ok(KnowledgeSource { path })
            } else {
                Err(config_error(format!(
                    "crew '{name}' knowledge path does not exist: {}",
                    path.display()
                )))
            }
        })
        .collect::<Result<Vec<_>>>()?;

    let llm = raw
        .llm
        .map(LlmConfig::from)
        .unwrap_or_default()
        .or(manifest_llm);

    Ok(CrewDef {
        name: name.to_string(),
        description: raw.description,
        required_engine,
        process,
        llm,
        agents,
        tasks,
        knowledge,
    })
}

fn load_agents(path: &Path) -> Result<AgentSet> {
    let mapping: Mapping = read_yaml(path)?.unwrap_or_default();
    let mut agents = Vec::with_capacity(mapping.len());
    for (key, value) in mapping {
        let name = mapping_key(&key, "agent")?;
        let raw: RawAgent = serde_yaml::from_value(value)
            .map_err(|e| config_error(format!("agent '{name}' in {}: {e}", path.display())))?;
        agents.push(AgentDef {
            role: raw.role.unwrap_or_else(|| name.clone()),
            name,
            goal: raw.goal,
            backstory: raw.backstory,
            tools: raw.tools,
            llm: raw.llm,
            allow_delegation: raw.allow_delegation,
        });
    }
    Ok(AgentSet::from_vec(agents))
}

fn load_tasks(path: &Path, agents: &AgentSet) -> Result<TaskSet> {
    let mapping: Mapping = read_yaml(path)?.unwrap_or_default();
    let mut tasks: Vec<TaskDef> = Vec::with_capacity(mapping.len());
    for (key, value) in mapping {
        let name = mapping_key(&key, "task")?;
        let raw: RawTask = serde_yaml::from_value(value)
            .map_err(|e| config_error(format!("task '{name}' in {}: {e}", path.display())))?;

        let agent = agents.id_of(&raw.agent).ok_or_else(|| {
            config_error(format!(
                "task '{name}' references unknown agent '{}'",
                raw.agent
            ))
        })?;
        let context = raw
            .context
            .iter()
            .map(|dep| {
                tasks
                    .iter()
                    .position(|earlier| &earlier.name == dep)
                    .map(TaskId)
                    .ok_or_else(|| {
                        config_error(format!(
                            "task '{name}' context '{dep}' is not an earlier task of the crew"
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        tasks.push(TaskDef {
            name,
            description: raw.description,
            expected_output: raw.expected_output,
            agent,
            context,
        });
    }
    Ok(TaskSet::from_vec(tasks))
}

fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| config_error(format!("cannot read {}: {e}", path.display())))?;
    if text.trim().is_empty() {
        return Ok(None);
    }
    serde_yaml::from_str(&text)
        .map_err(|e| config_error(format!("malformed {}: {e}", path.display())))
}

fn require_file(config_dir: &Path, rel: &str, crew: &str) -> Result<PathBuf> {
    let path = config_dir.join(rel);
    if path.is_file() {
        Ok(path)
    } else {
        Err(config_error(format!(
            "crew '{crew}' references missing file {}",
            path.display()
        )))
    }
}

fn mapping_key(key: &Value, what: &str) -> Result<String> {
    match key {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(config_error(format!("{what} name must be a string, got {other:?}"))),
    }
}

fn version_string(value: Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(config_error(format!("version must be a string, got {other:?}"))),
    }
}

fn config_error(msg: String) -> CrewError {
    CrewError::Configuration(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;
    use std::fs;
    use tempfile::TempDir;

    const AGENTS: &str = r#"
planner:
  role: Lead Planner
  goal: Plan the work
  backstory: Has planned many things
coder:
  goal: Write code
  backstory: Writes Rust
  tools: [read_file, write_file]
"#;

    const TASKS: &str = r#"
plan:
  description: Plan {input}
  expected_output: A plan
  agent: planner
implement:
  description: Implement the plan
  expected_output: Code
  agent: coder
  context: [plan]
"#;

    fn write_package(config: &str, manifest: &str, agents: &str, tasks: &str) -> (TempDir, Package) {
        let tmp = TempDir::new().unwrap();
        let config_dir = tmp.path().join("packages/otterfall").join(config);
        fs::create_dir_all(config_dir.join("crews/builder")).unwrap();
        fs::create_dir_all(config_dir.join("knowledge/ecs")).unwrap();
        fs::write(config_dir.join("manifest.yaml"), manifest).unwrap();
        fs::write(config_dir.join("crews/builder/agents.yaml"), agents).unwrap();
        fs::write(config_dir.join("crews/builder/tasks.yaml"), tasks).unwrap();
        let package = Package::new("otterfall", config_dir);
        (tmp, package)
    }

    const MANIFEST: &str = r#"
name: otterfall
version: 0.1
llm:
  provider: anthropic
  model: claude-sonnet
crews:
  builder:
    description: Builds things
    knowledge: [knowledge/ecs]
"#;

    #[test]
    fn test_load_resolves_agents_tasks_and_context() {
        let (_tmp, package) = write_package(".crew", MANIFEST, AGENTS, TASKS);
        let manifest = load(&package).unwrap();

        assert_eq!(manifest.version.as_deref(), Some("0.1"));
        let crew = manifest.crew("builder").unwrap();
        assert_eq!(crew.description, "Builds things");
        assert_eq!(crew.required_engine, None);
        assert_eq!(crew.llm.model.as_deref(), Some("claude-sonnet"));

        let names: Vec<_> = crew.agents.iter().map(|a| a.role.as_str()).collect();
        assert_eq!(names, vec!["Lead Planner", "coder"]);

        let implement = crew.tasks.iter().nth(1).unwrap();
        assert_eq!(crew.agent_for(implement).name, "coder");
        assert_eq!(implement.context, vec![TaskId(0)]);
        assert_eq!(crew.knowledge.len(), 1);
    }

    #[test]
    fn test_directory_pins_required_engine() {
        let (_tmp, package) = write_package(".langgraph", MANIFEST, AGENTS, TASKS);
        let manifest = load(&package).unwrap();
        assert_eq!(
            manifest.crew("builder").unwrap().required_engine,
            Some(EngineKind::LangGraph)
        );
    }

    #[test]
    fn test_conflicting_required_framework_is_rejected() {
        let manifest = "crews:\n  builder:\n    required_framework: strands\n";
        let (_tmp, package) = write_package(".crewai", manifest, AGENTS, TASKS);
        let err = load(&package).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_unknown_agent_is_configuration_error() {
        let tasks = "plan:\n  description: d\n  expected_output: o\n  agent: ghost\n";
        let (_tmp, package) = write_package(".crew", MANIFEST, AGENTS, tasks);
        let err = load(&package).unwrap_err();
        assert!(err.to_string().contains("ghost"));
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_forward_context_reference_is_rejected() {
        let tasks = r#"
first:
  description: d
  expected_output: o
  agent: coder
  context: [second]
second:
  description: d
  expected_output: o
  agent: coder
"#;
        let (_tmp, package) = write_package(".crew", MANIFEST, AGENTS, tasks);
        assert!(load(&package).is_err());
    }

    #[test]
    fn test_missing_knowledge_path_fails() {
        let manifest = "crews:\n  builder:\n    knowledge: [knowledge/missing]\n";
        let (_tmp, package) = write_package(".crew", manifest, AGENTS, TASKS);
        let err = load(&package).unwrap_err();
        assert!(err.to_string().contains("knowledge"));
    }

    #[test]
    fn test_missing_agents_file_fails() {
        let manifest = "crews:\n  builder:\n    agents: crews/nowhere/agents.yaml\n";
        let (_tmp, package) = write_package(".crew", manifest, AGENTS, TASKS);
        assert_eq!(load(&package).unwrap_err().kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_malformed_manifest_fails() {
        let (_tmp, package) = write_package(".crew", "crews: [unclosed", AGENTS, TASKS);
        assert_eq!(load(&package).unwrap_err().kind(), ErrorKind::Configuration);
    }
}
