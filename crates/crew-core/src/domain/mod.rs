//! Domain models for agentic-crew.
//!
//! - `EngineKind`: closed set of multi-agent engines
//! - `Package` / `Manifest` / `CrewDef`: the parsed declaration
//! - `RunResult`: normalized outcome of an execution
//! - `CrewError`: error taxonomy and exit-code mapping

pub mod engine;
pub mod error;
pub mod manifest;
pub mod result;

pub use engine::EngineKind;
pub use error::{CrewError, ErrorKind, ExecutionError, Result};
pub use manifest::{
    AgentDef, AgentId, AgentSet, CrewDef, KnowledgeSource, LlmConfig, Manifest, Package, Process,
    TaskDef, TaskId, TaskSet,
};
pub use result::{AgentSummary, CrewInfo, CrewSummary, RunResult, RunnerInfo, TaskSummary};
