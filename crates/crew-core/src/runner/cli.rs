//! Single-agent command-line tools behind the [`Runner`] contract.
//!
//! Everything tool-specific lives in [`CliRunnerConfig`]; the adapter only
//! assembles the argument vector and supervises the child.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::process::{run_supervised, ProcessSpec};
use super::{EngineHandle, RunInputs, Runner};
use crate::domain::{CrewDef, CrewError, ExecutionError, Result};
use crate::engines::prompt::crew_system_prompt;

fn default_timeout() -> u64 {
    300
}

/// Declaration of one command-line coding tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliRunnerConfig {
    /// Executable, optionally followed by fixed words (e.g. `gh copilot`).
    /// Split with shell quoting rules, so paths with spaces can be quoted.
    pub command: String,

    /// Flag that precedes the task text; empty means positional.
    #[serde(default)]
    pub task_flag: String,

    /// Word placed right after the command (e.g. `run` for `ollama run`).
    #[serde(default)]
    pub subcommand: Option<String>,

    /// Environment variables that must be set before launching.
    #[serde(default)]
    pub auth_env: Vec<String>,

    #[serde(default)]
    pub auto_approve: Option<String>,

    #[serde(default)]
    pub structured_output: Option<String>,

    /// Flag that precedes the model; unset means the model is positional.
    #[serde(default)]
    pub model_flag: Option<String>,

    /// Model passed positionally when none is requested.
    #[serde(default)]
    pub default_model: Option<String>,

    #[serde(default)]
    pub working_dir_flag: Option<String>,

    #[serde(default)]
    pub additional_flags: Vec<String>,

    /// Seconds before the child is killed.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub install_cmd: String,
    #[serde(default)]
    pub docs_url: String,
    #[serde(default)]
    pub notes: String,
}

impl CliRunnerConfig {
    /// Minimal config with defaults for everything but the command.
    pub fn new(command: impl Into<String>, task_flag: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            task_flag: task_flag.into(),
            subcommand: None,
            auth_env: Vec::new(),
            auto_approve: None,
            structured_output: None,
            model_flag: None,
            default_model: None,
            working_dir_flag: None,
            additional_flags: Vec::new(),
            timeout: default_timeout(),
            name: String::new(),
            description: String::new(),
            install_cmd: String::new(),
            docs_url: String::new(),
            notes: String::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let words = shlex::split(&self.command).ok_or_else(|| {
            CrewError::Configuration(format!(
                "command-line runner command has unbalanced quotes: {}",
                self.command
            ))
        })?;
        if words.is_empty() {
            return Err(CrewError::Configuration(
                "command-line runner needs a non-empty command".to_string(),
            ));
        }
        Ok(())
    }

    /// Command split into words; the first is the executable.
    ///
    /// Empty for a command that fails [`CliRunnerConfig::validate`].
    pub fn command_words(&self) -> Vec<String> {
        shlex::split(&self.command).unwrap_or_default()
    }

    pub fn executable(&self) -> String {
        self.command_words().into_iter().next().unwrap_or_default()
    }
}

/// Per-invocation switches.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub working_dir: Option<PathBuf>,
    pub auto_approve: bool,
    pub structured_output: bool,
    /// Overrides the runner's model for this call.
    pub model: Option<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            working_dir: None,
            auto_approve: true,
            structured_output: false,
            model: None,
        }
    }
}

/// Runner for one configured command-line tool.
#[derive(Debug, Clone)]
pub struct CliRunner {
    name: String,
    config: CliRunnerConfig,
    model: Option<String>,
    options: RunOptions,
}

impl CliRunner {
    pub fn new(name: impl Into<String>, config: CliRunnerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            name: name.into(),
            config,
            model: None,
            options: RunOptions::default(),
        })
    }

    /// Default model for every run of this runner.
    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    /// Options applied when driven through the [`Runner`] contract.
    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn config(&self) -> &CliRunnerConfig {
        &self.config
    }

    /// Display name from the profile, else the runner name.
    pub fn display_name(&self) -> &str {
        if self.config.name.is_empty() {
            &self.name
        } else {
            &self.config.name
        }
    }

    /// Whether the executable resolves on `PATH`.
    pub fn is_available(&self) -> bool {
        which::which(self.config.executable()).is_ok()
    }

    pub fn required_env_vars(&self) -> &[String] {
        &self.config.auth_env
    }

    /// Full argument vector, executable first.
    pub fn build_command(&self, task: &str, options: &RunOptions) -> Vec<String> {
        let cfg = &self.config;
        let mut cmd = cfg.command_words();

        if let Some(sub) = cfg.subcommand.as_deref().filter(|s| !s.is_empty()) {
            cmd.push(sub.to_string());
        }

        match (options.model.as_ref().or(self.model.as_ref()), &cfg.model_flag) {
            (Some(model), Some(flag)) => cmd.extend([flag.clone(), model.clone()]),
            (Some(model), None) => cmd.push(model.clone()),
            (None, None) => {
                if let Some(default) = &cfg.default_model {
                    cmd.push(default.clone());
                }
            }
            (None, Some(_)) => {}
        }

        if cfg.task_flag.is_empty() {
            cmd.push(task.to_string());
        } else {
            cmd.extend([cfg.task_flag.clone(), task.to_string()]);
        }

        if options.auto_approve {
            if let Some(flag) = &cfg.auto_approve {
                cmd.push(flag.clone());
            }
        }
        if options.structured_output {
            if let Some(flag) = &cfg.structured_output {
                cmd.push(flag.clone());
            }
        }
        if let (Some(dir), Some(flag)) = (&options.working_dir, &cfg.working_dir_flag) {
            cmd.extend([flag.clone(), dir.display().to_string()]);
        }

        cmd.extend(cfg.additional_flags.iter().cloned());
        cmd
    }

    fn missing_env(&self) -> Vec<String> {
        self.config
            .auth_env
            .iter()
            .filter(|var| std::env::var_os(var).is_none())
            .cloned()
            .collect()
    }

    /// Run one task and return the tool's stdout.
    pub async fn run_task(
        &self,
        task: &str,
        options: &RunOptions,
    ) -> std::result::Result<String, ExecutionError> {
        let missing = self.missing_env();
        if !missing.is_empty() {
            return Err(ExecutionError::MissingCredentials {
                command: self.config.command.clone(),
                vars: missing,
            });
        }

        let mut argv = self.build_command(task, options).into_iter();
        let program = argv.next().unwrap_or_default();
        let mut spec = ProcessSpec::new(program, argv.collect())
            .with_timeout(Duration::from_secs(self.config.timeout));
        if let Some(dir) = &options.working_dir {
            spec = spec.with_working_dir(dir);
        }

        debug!(runner = %self.name, command = %spec.command_line(), "launching tool");
        let output = run_supervised(&spec).await?;
        if !output.success {
            return Err(ExecutionError::NonZeroExit {
                command: spec.command_line(),
                code: output.exit_code,
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }

        info!(runner = %self.name, duration_ms = output.duration_ms, "tool finished");
        Ok(output.stdout)
    }
}

#[async_trait]
impl Runner for CliRunner {
    fn name(&self) -> &str {
        &self.name
    }

    /// A single agent has no crew structure; the crew is flattened into one prompt.
    async fn build(&self, crew: &CrewDef) -> Result<EngineHandle> {
        Ok(EngineHandle {
            runner: self.name.clone(),
            crew: crew.name.clone(),
            blueprint: serde_json::json!({ "system_prompt": crew_system_prompt(crew) }),
        })
    }

    async fn run(&self, handle: &EngineHandle, inputs: &RunInputs) -> Result<String> {
        let preamble = handle
            .blueprint
            .get("system_prompt")
            .and_then(|v| v.as_str())
            .unwrap_or("");
        let task = if preamble.is_empty() {
            inputs.prompt().to_string()
        } else {
            format!("{preamble}\n\n{}", inputs.prompt())
        };
        Ok(self.run_task(&task, &self.options).await?)
    }
}
