//! Runner contract shared by engine adapters and command-line tools.
//!
//! A [`Runner`] turns a neutral [`CrewDef`] into an engine-native handle and
//! executes it. Whatever the engine raises comes back as a [`CrewError`];
//! nothing engine-specific crosses this boundary.

pub mod cli;
pub mod process;
pub mod profiles;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::{CrewDef, Result};

pub use cli::{CliRunner, CliRunnerConfig, RunOptions};
pub use process::{run_supervised, ProcessOutput, ProcessSpec};
pub use profiles::ProfileCatalogue;

/// Keys under which the caller's input text is exposed to a crew.
pub const INPUT_KEYS: [&str; 3] = ["input", "spec", "component_spec"];

/// Named string inputs for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RunInputs(BTreeMap<String, String>);

impl RunInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expose `text` under every key of [`INPUT_KEYS`].
    pub fn from_text(text: &str) -> Self {
        let mut inputs = Self::new();
        for key in INPUT_KEYS {
            inputs.insert(key, text);
        }
        inputs
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Free-text prompt: `input`, then `task`, then `spec`, else empty.
    pub fn prompt(&self) -> &str {
        ["input", "task", "spec"]
            .iter()
            .find_map(|key| self.get(key))
            .unwrap_or("")
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.0
    }
}

/// Engine-native build result for one crew, ready to run.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineHandle {
    /// Name of the runner that built it.
    pub runner: String,
    pub crew: String,
    /// Native construction shape handed to the engine.
    pub blueprint: serde_json::Value,
}

/// Build/run capability of one execution engine or command-line tool.
#[async_trait]
pub trait Runner: Send + Sync {
    /// Stable runner name (`crewai`, `langgraph`, `strands`, or a profile name).
    fn name(&self) -> &str;

    /// Translate the neutral crew into the engine's native representation.
    async fn build(&self, crew: &CrewDef) -> Result<EngineHandle>;

    /// Execute a built crew to completion and return its raw output.
    async fn run(&self, handle: &EngineHandle, inputs: &RunInputs) -> Result<String>;

    async fn build_and_run(&self, crew: &CrewDef, inputs: &RunInputs) -> Result<String> {
        let handle = self.build(crew).await?;
        self.run(&handle, inputs).await
    }
}
