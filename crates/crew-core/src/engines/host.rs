//! Bridge between engine adapters and the engine runtimes.
//!
//! The engines live outside this process. An [`EngineHost`] receives a
//! blueprint plus inputs and returns the engine's final output text. The
//! default [`ProcessEngineHost`] runs the bundled bridge script
//! ([`BRIDGE_SOURCE`]) with `python -c` and speaks a one-shot JSON protocol
//! over its stdin and stdout:
//!
//! - request: `{"engine": "...", "blueprint": {...}, "inputs": {...}}`
//! - reply: `{"output": "..."}` or `{"error": "...", "detail": any}`

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::domain::{EngineKind, ExecutionError};
use crate::runner::{run_supervised, ProcessSpec, RunInputs};

/// Bridge script that builds blueprints with the engines' Python SDKs.
pub const BRIDGE_SOURCE: &str = include_str!("../../bridge/bridge.py");

/// Default bridge invocation for `engine`, program first.
pub(crate) fn bridge_command(python: &str, args: &[&str]) -> Vec<String> {
    [python, "-c", BRIDGE_SOURCE]
        .iter()
        .chain(args)
        .map(|word| word.to_string())
        .collect()
}

/// Short form of a bridge invocation for logs and errors.
pub(crate) fn bridge_label(python: &str, args: &[&str]) -> String {
    format!("{python} -c <agentic-crew bridge> {}", args.join(" "))
}

/// Per-engine replacement commands for the bridge.
pub type HostOverrides = BTreeMap<EngineKind, Vec<String>>;

#[async_trait]
pub trait EngineHost: Send + Sync {
    /// Run a blueprint to completion on `engine`.
    async fn invoke(
        &self,
        engine: EngineKind,
        blueprint: &Value,
        inputs: &RunInputs,
    ) -> Result<String, ExecutionError>;
}

#[derive(Debug, Serialize)]
struct BridgeRequest<'a> {
    engine: EngineKind,
    blueprint: &'a Value,
    inputs: &'a RunInputs,
}

#[derive(Debug, Deserialize)]
struct BridgeReply {
    output: Option<String>,
    error: Option<String>,
    #[serde(default)]
    detail: Option<Value>,
}

/// Host that starts one bridge process per run.
#[derive(Debug, Clone)]
pub struct ProcessEngineHost {
    python: String,
    overrides: HostOverrides,
}

impl ProcessEngineHost {
    pub fn new(python: impl Into<String>) -> Self {
        Self {
            python: python.into(),
            overrides: HostOverrides::new(),
        }
    }

    pub fn with_overrides(mut self, overrides: HostOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Argument vector that hosts `engine`, program first.
    pub fn command_for(&self, engine: EngineKind) -> Vec<String> {
        match self.overrides.get(&engine) {
            Some(words) if !words.is_empty() => words.clone(),
            _ => bridge_command(&self.python, &[engine.as_str()]),
        }
    }

    fn spec_for(&self, engine: EngineKind, request: Vec<u8>) -> ProcessSpec {
        let mut argv = self.command_for(engine).into_iter();
        let program = argv.next().unwrap_or_default();
        let spec = ProcessSpec::new(program, argv.collect()).with_stdin(request);
        if self.overrides.contains_key(&engine) {
            spec
        } else {
            spec.with_label(bridge_label(&self.python, &[engine.as_str()]))
        }
    }
}

#[async_trait]
impl EngineHost for ProcessEngineHost {
    async fn invoke(
        &self,
        engine: EngineKind,
        blueprint: &Value,
        inputs: &RunInputs,
    ) -> Result<String, ExecutionError> {
        let request = serde_json::to_vec(&BridgeRequest {
            engine,
            blueprint,
            inputs,
        })
        .map_err(|e| ExecutionError::InvalidOutput {
            engine,
            reason: format!("cannot encode request: {e}"),
        })?;

        let spec = self.spec_for(engine, request);
        debug!(engine = %engine, command = %spec.command_line(), "invoking engine host");

        let out = run_supervised(&spec).await?;
        match (parse_reply(&out.stdout), out.success) {
            (Some(BridgeReply { error: Some(message), detail, .. }), _) => {
                Err(ExecutionError::EngineFailed {
                    engine,
                    message,
                    detail,
                })
            }
            (Some(BridgeReply { output: Some(output), .. }), true) => Ok(output),
            (_, false) => Err(ExecutionError::NonZeroExit {
                command: spec.command_line(),
                code: out.exit_code,
                stdout: out.stdout,
                stderr: out.stderr,
            }),
            (_, true) => Err(ExecutionError::InvalidOutput {
                engine,
                reason: "reply has neither output nor error".to_string(),
            }),
        }
    }
}

/// The reply is the whole of stdout, or else its last non-empty line.
fn parse_reply(stdout: &str) -> Option<BridgeReply> {
    serde_json::from_str(stdout.trim()).ok().or_else(|| {
        stdout
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .and_then(|line| serde_json::from_str(line.trim()).ok())
    })
}
