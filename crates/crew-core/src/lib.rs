//! agentic-crew core library
//!
//! Declare a multi-agent crew once in YAML and run it on whichever engine
//! (crewai, langgraph, strands) is installed, or hand a single task to a
//! command-line coding agent.

pub mod config;
pub mod decomposer;
pub mod discovery;
pub mod domain;
pub mod engines;
pub mod facade;
pub mod loader;
pub mod obs;
pub mod runner;
pub mod telemetry;

pub use config::Settings;

pub use decomposer::{Decomposer, FrameworkPriority, Selection};

pub use discovery::{locate_workspace_root, Discovery, FrameworkConfig};

pub use domain::{
    AgentDef, AgentSummary, CrewDef, CrewError, CrewInfo, CrewSummary, EngineKind, ErrorKind,
    ExecutionError, KnowledgeSource, LlmConfig, Manifest, Package, Process, Result, RunResult,
    RunnerInfo, TaskDef, TaskSummary,
};

pub use engines::{
    EngineHost, EngineProbe, HostOverrides, ProcessEngineHost, PythonModuleProbe, StaticProbe,
};

pub use facade::CrewService;

pub use loader::load as load_manifest;

pub use runner::{
    CliRunner, CliRunnerConfig, EngineHandle, ProfileCatalogue, RunInputs, RunOptions, Runner,
};

pub use telemetry::init_tracing;
