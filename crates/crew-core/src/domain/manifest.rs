//! In-memory manifest model.
//!
//! Built fresh by the loader on every call and immutable afterwards. Agents
//! and tasks live in per-crew arenas; a task refers to its agent and to its
//! context tasks by index, so a dangling reference cannot exist once a
//! [`CrewDef`] has been constructed.

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::engine::EngineKind;

/// A discovered unit exposing crews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Package {
    /// Package name, unique within one discovery scan.
    pub name: String,
    /// Declaration directory (`.crew`, `.crewai`, `.langgraph` or `.strands`).
    pub config_dir: PathBuf,
}

impl Package {
    pub fn new(name: impl Into<String>, config_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            config_dir: config_dir.into(),
        }
    }

    /// Engine pinned by the declaration directory, if it is framework-specific.
    pub fn pinned_engine(&self) -> Option<EngineKind> {
        EngineKind::from_config_dir(&self.config_dir)
    }

    /// Directory that contains the declaration directory.
    pub fn root(&self) -> &Path {
        self.config_dir.parent().unwrap_or(&self.config_dir)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.config_dir.join(crate::discovery::MANIFEST_FILE)
    }
}

/// Default model selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LlmConfig {
    pub provider: Option<String>,
    pub model: Option<String>,
}

impl LlmConfig {
    /// Fill unset fields from `fallback`.
    pub fn or(&self, fallback: &LlmConfig) -> LlmConfig {
        LlmConfig {
            provider: self.provider.clone().or_else(|| fallback.provider.clone()),
            model: self.model.clone().or_else(|| fallback.model.clone()),
        }
    }
}

/// A package's parsed, fully resolved declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub package: String,
    pub version: Option<String>,
    pub llm: LlmConfig,
    pub config_dir: PathBuf,
    crews: Vec<CrewDef>,
}

impl Manifest {
    pub(crate) fn new(
        package: String,
        version: Option<String>,
        llm: LlmConfig,
        config_dir: PathBuf,
        crews: Vec<CrewDef>,
    ) -> Self {
        Self {
            package,
            version,
            llm,
            config_dir,
            crews,
        }
    }

    /// Crews in declaration order.
    pub fn crews(&self) -> &[CrewDef] {
        &self.crews
    }

    pub fn crew(&self, name: &str) -> Option<&CrewDef> {
        self.crews.iter().find(|crew| crew.name == name)
    }

    pub fn crew_names(&self) -> Vec<String> {
        self.crews.iter().map(|crew| crew.name.clone()).collect()
    }
}

/// Execution order of a crew's tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Process {
    #[default]
    Sequential,
    Hierarchical,
}

/// One declared crew.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrewDef {
    pub name: String,
    pub description: String,
    pub required_engine: Option<EngineKind>,
    pub process: Process,
    pub llm: LlmConfig,
    pub agents: AgentSet,
    pub tasks: TaskSet,
    pub knowledge: Vec<KnowledgeSource>,
}

impl CrewDef {
    /// Agent that owns `task`.
    pub fn agent_for(&self, task: &TaskDef) -> &AgentDef {
        self.agents.get(task.agent)
    }
}

/// Index of an agent within its crew's [`AgentSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AgentId(pub(crate) usize);

impl AgentId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Index of a task within its crew's [`TaskSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TaskId(pub(crate) usize);

impl TaskId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One agent role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentDef {
    pub name: String,
    pub role: String,
    pub goal: String,
    pub backstory: String,
    pub tools: Vec<String>,
    pub llm: Option<String>,
    pub allow_delegation: bool,
}

/// One unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDef {
    pub name: String,
    pub description: String,
    pub expected_output: String,
    pub agent: AgentId,
    /// Earlier tasks whose output feeds this one.
    pub context: Vec<TaskId>,
}

/// Agents of one crew, names unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentSet {
    agents: Vec<AgentDef>,
}

impl AgentSet {
    pub(crate) fn from_vec(agents: Vec<AgentDef>) -> Self {
        Self { agents }
    }

    pub fn get(&self, id: AgentId) -> &AgentDef {
        &self.agents[id.0]
    }

    pub fn id_of(&self, name: &str) -> Option<AgentId> {
        self.agents
            .iter()
            .position(|agent| agent.name == name)
            .map(AgentId)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AgentDef> {
        self.agents.iter()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

/// Tasks of one crew in declaration order, names unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskSet {
    tasks: Vec<TaskDef>,
}

impl TaskSet {
    pub(crate) fn from_vec(tasks: Vec<TaskDef>) -> Self {
        Self { tasks }
    }

    pub fn get(&self, id: TaskId) -> &TaskDef {
        &self.tasks[id.0]
    }

    pub fn id_of(&self, name: &str) -> Option<TaskId> {
        self.tasks
            .iter()
            .position(|task| task.name == name)
            .map(TaskId)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskDef> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// A readable domain-knowledge path, verified to exist at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KnowledgeSource {
    pub path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(name: &str) -> AgentDef {
        AgentDef {
            name: name.to_string(),
            role: name.to_string(),
            goal: String::new(),
            backstory: String::new(),
            tools: vec![],
            llm: None,
            allow_delegation: false,
        }
    }

    #[test]
    fn test_agent_set_lookup_by_name() {
        let set = AgentSet::from_vec(vec![agent("planner"), agent("coder")]);
        let id = set.id_of("coder").unwrap();
        assert_eq!(id.index(), 1);
        assert_eq!(set.get(id).name, "coder");
        assert!(set.id_of("reviewer").is_none());
    }

    #[test]
    fn test_llm_config_fallback() {
        let crew = LlmConfig {
            provider: None,
            model: Some("claude-haiku".to_string()),
        };
        let manifest = LlmConfig {
            provider: Some("anthropic".to_string()),
            model: Some("claude-sonnet".to_string()),
        };
        let merged = crew.or(&manifest);
        assert_eq!(merged.provider.as_deref(), Some("anthropic"));
        assert_eq!(merged.model.as_deref(), Some("claude-haiku"));
    }

    #[test]
    fn test_package_pinned_engine() {
        let neutral = Package::new("strata", "/ws/packages/strata/.crew");
        let pinned = Package::new("otterfall", "/ws/packages/otterfall/.strands");
        assert_eq!(neutral.pinned_engine(), None);
        assert_eq!(pinned.pinned_engine(), Some(EngineKind::Strands));
        assert_eq!(pinned.root(), Path::new("/ws/packages/otterfall"));
    }
}
