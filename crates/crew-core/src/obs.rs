//! Structured lifecycle events for crew and command-line runs.
//!
//! Every run executes inside a span tagged with its `run_id`; the `emit_*`
//! functions log one event each with a stable `event` field.

use tracing::{info, warn};

use crate::domain::EngineKind;

/// Span scoping one execution, tagged with its run id.
///
/// Enter it for synchronous sections with [`RunSpan::in_scope`] and attach it
/// to async work with [`tracing::Instrument`] via [`RunSpan::span`].
#[derive(Debug, Clone)]
pub struct RunSpan {
    run_id: String,
    span: tracing::Span,
}

impl RunSpan {
    /// Fresh span with a new v4 run id.
    pub fn start() -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_id(run_id: impl Into<String>) -> Self {
        let run_id = run_id.into();
        let span = tracing::info_span!("crew.run", run_id = %run_id);
        Self { run_id, span }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn span(&self) -> tracing::Span {
        self.span.clone()
    }

    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        self.span.in_scope(f)
    }
}

pub fn emit_run_started(run_id: &str, package: &str, crew: &str) {
    info!(event = "run.started", run_id = %run_id, package = %package, crew = %crew);
}

/// Emit event: engine chosen for a crew, with how it was chosen.
pub fn emit_engine_resolved(run_id: &str, engine: EngineKind, reason: &str) {
    info!(event = "engine.resolved", run_id = %run_id, engine = %engine, reason = %reason);
}

pub fn emit_run_finished(run_id: &str, duration_ms: u64, success: bool) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        success = success,
    );
}

/// Emit event: child process started.
pub fn emit_cli_spawned(command: &str, pid: Option<u32>) {
    info!(event = "cli.spawned", command = %command, pid = ?pid);
}

/// Emit event: child process killed after exceeding its limit (warning level).
pub fn emit_cli_timeout(command: &str, limit_ms: u64) {
    warn!(event = "cli.timeout", command = %command, limit_ms = limit_ms);
}

/// Emit event: a package was skipped while listing (warning level).
pub fn emit_package_skipped(package: &str, error: &dyn std::fmt::Display) {
    warn!(event = "package.skipped", package = %package, error = %error);
}
