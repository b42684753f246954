//! Process settings read from `AGENTIC_CREW_*` environment variables.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::discovery::locate_workspace_root;
use crate::domain::{CrewError, EngineKind, Result};
use crate::engines::{EngineProbe, HostOverrides, ProcessEngineHost, PythonModuleProbe, StaticProbe};

pub const ENV_WORKSPACE: &str = "AGENTIC_CREW_WORKSPACE";
pub const ENV_PYTHON: &str = "AGENTIC_CREW_PYTHON";
pub const ENV_ENGINES: &str = "AGENTIC_CREW_ENGINES";
pub const ENV_PROFILES: &str = "AGENTIC_CREW_PROFILES";
pub const ENV_TIMEOUT_SECS: &str = "AGENTIC_CREW_TIMEOUT_SECS";

const DEFAULT_PYTHON: &str = "python3";

/// Host override variable for `engine`, e.g. `AGENTIC_CREW_STRANDS_HOST`.
pub fn host_env_var(engine: EngineKind) -> String {
    format!("AGENTIC_CREW_{}_HOST", engine.env_key())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub workspace_root: PathBuf,
    /// Interpreter for the default probe and engine host.
    pub python: String,
    pub host_overrides: HostOverrides,
    /// Fixed installed-engine set replacing the probe.
    pub engines_override: Option<Vec<EngineKind>>,
    /// Extra runner profiles merged over the built-in ones.
    pub profiles_file: Option<PathBuf>,
    pub run_timeout: Option<Duration>,
}

impl Settings {
    /// Settings for `workspace_root` with every other value defaulted.
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            python: DEFAULT_PYTHON.to_string(),
            host_overrides: HostOverrides::new(),
            engines_override: None,
            profiles_file: None,
            run_timeout: None,
        }
    }

    /// Read the process environment, resolving the workspace from `cwd`.
    pub fn from_env(cwd: &Path) -> Result<Self> {
        Self::from_lookup(cwd, |key| std::env::var(key).ok())
    }

    /// Same as [`Settings::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(cwd: &Path, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let workspace_root = var(ENV_WORKSPACE)
            .map(PathBuf::from)
            .unwrap_or_else(|| locate_workspace_root(cwd));
        let mut settings = Self::new(workspace_root);

        if let Some(python) = var(ENV_PYTHON) {
            settings.python = python;
        }

        for engine in EngineKind::ALL {
            let key = host_env_var(engine);
            if let Some(command) = var(&key) {
                let words = shlex::split(&command).ok_or_else(|| {
                    CrewError::Configuration(format!("{key} has unbalanced quotes: {command}"))
                })?;
                settings.host_overrides.insert(engine, words);
            }
        }

        // An empty value is meaningful here: no engine installed.
        if let Some(list) = lookup(ENV_ENGINES) {
            let engines = list
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::parse::<EngineKind>)
                .collect::<Result<Vec<EngineKind>>>()?;
            settings.engines_override = Some(engines);
        }

        settings.profiles_file = var(ENV_PROFILES).map(PathBuf::from);

        if let Some(secs) = var(ENV_TIMEOUT_SECS) {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                CrewError::Configuration(format!("{ENV_TIMEOUT_SECS} must be whole seconds, got '{secs}'"))
            })?;
            settings.run_timeout = Some(Duration::from_secs(secs));
        }

        Ok(settings)
    }

    /// Probe implied by these settings.
    pub fn probe(&self) -> Arc<dyn EngineProbe> {
        match &self.engines_override {
            Some(engines) => Arc::new(StaticProbe::new(engines.iter().copied())),
            None => Arc::new(
                PythonModuleProbe::new(self.python.clone())
                    .with_overrides(self.host_overrides.clone()),
            ),
        }
    }

    pub fn engine_host(&self) -> ProcessEngineHost {
        ProcessEngineHost::new(self.python.clone()).with_overrides(self.host_overrides.clone())
    }
}
