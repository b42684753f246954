//! Installed-engine detection.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::host::{bridge_command, bridge_label, HostOverrides};
use crate::domain::EngineKind;
use crate::runner::{run_supervised, ProcessSpec};

/// Time allowed for one interpreter probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Answers whether an engine can run in this environment.
///
/// Implementations never fail: anything that goes wrong means "not installed".
#[async_trait]
pub trait EngineProbe: Send + Sync {
    async fn is_installed(&self, engine: EngineKind) -> bool;
}

/// Fixed answer, for tests and the `AGENTIC_CREW_ENGINES` override.
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    installed: BTreeSet<EngineKind>,
}

impl StaticProbe {
    pub fn new(installed: impl IntoIterator<Item = EngineKind>) -> Self {
        Self {
            installed: installed.into_iter().collect(),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EngineProbe for StaticProbe {
    async fn is_installed(&self, engine: EngineKind) -> bool {
        self.installed.contains(&engine)
    }
}

/// Runs the bundled bridge in probe mode.
///
/// An engine counts as installed only when the bridge starts under the
/// configured interpreter and every SDK module it builds with imports.
#[derive(Debug, Clone)]
pub struct PythonModuleProbe {
    python: String,
    overrides: HostOverrides,
}

impl PythonModuleProbe {
    pub fn new(python: impl Into<String>) -> Self {
        Self {
            python: python.into(),
            overrides: HostOverrides::new(),
        }
    }

    /// Engines with an override host count as installed when it is on `PATH`.
    pub fn with_overrides(mut self, overrides: HostOverrides) -> Self {
        self.overrides = overrides;
        self
    }
}

#[async_trait]
impl EngineProbe for PythonModuleProbe {
    async fn is_installed(&self, engine: EngineKind) -> bool {
        if let Some(program) = self.overrides.get(&engine).and_then(|words| words.first()) {
            return which::which(program).is_ok();
        }

        let args = ["--probe", engine.as_str()];
        let mut argv = bridge_command(&self.python, &args).into_iter();
        let program = argv.next().unwrap_or_default();
        let spec = ProcessSpec::new(program, argv.collect())
            .with_label(bridge_label(&self.python, &args))
            .with_timeout(PROBE_TIMEOUT);

        match run_supervised(&spec).await {
            Ok(out) => out.success,
            Err(e) => {
                debug!(engine = %engine, error = %e, "engine probe failed");
                false
            }
        }
    }
}
