//! Engine detection, selection and runner construction.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::domain::{CrewDef, CrewError, EngineKind, Result};
use crate::engines::{self, EngineHost, EngineProbe};
use crate::runner::{CliRunner, ProfileCatalogue, Runner};

/// Fixed preference order used when neither the caller nor the crew picks
/// an engine. Injectable so tests can reorder it; never mutated at run time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameworkPriority(Vec<EngineKind>);

impl Default for FrameworkPriority {
    /// crewai, then langgraph, then strands.
    fn default() -> Self {
        Self(vec![
            EngineKind::CrewAi,
            EngineKind::LangGraph,
            EngineKind::Strands,
        ])
    }
}

impl FrameworkPriority {
    pub fn new(order: Vec<EngineKind>) -> Self {
        Self(order)
    }

    pub fn order(&self) -> &[EngineKind] {
        &self.0
    }

    /// First engine of the order that is in `available`.
    pub fn select(&self, available: &BTreeSet<EngineKind>) -> Option<EngineKind> {
        self.0.iter().copied().find(|kind| available.contains(kind))
    }
}

/// How an engine was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Named by the caller.
    Forced,
    /// Required by the crew's declaration.
    Required,
    /// First installed engine in priority order.
    Preferred,
}

impl Selection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Selection::Forced => "forced",
            Selection::Required => "required",
            Selection::Preferred => "auto",
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chooses the engine for a crew and hands back a runner for it.
#[derive(Clone)]
pub struct Decomposer {
    probe: Arc<dyn EngineProbe>,
    host: Arc<dyn EngineHost>,
    priority: FrameworkPriority,
    profiles: ProfileCatalogue,
}

impl Decomposer {
    pub fn new(probe: Arc<dyn EngineProbe>, host: Arc<dyn EngineHost>) -> Self {
        Self {
            probe,
            host,
            priority: FrameworkPriority::default(),
            profiles: ProfileCatalogue::default(),
        }
    }

    pub fn with_priority(mut self, priority: FrameworkPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_profiles(mut self, profiles: ProfileCatalogue) -> Self {
        self.profiles = profiles;
        self
    }

    pub fn priority(&self) -> &FrameworkPriority {
        &self.priority
    }

    pub fn profiles(&self) -> &ProfileCatalogue {
        &self.profiles
    }

    /// Engines installed right now. Never fails.
    pub async fn detect_available(&self) -> BTreeSet<EngineKind> {
        let mut available = BTreeSet::new();
        for engine in EngineKind::ALL {
            if self.probe.is_installed(engine).await {
                available.insert(engine);
            }
        }
        debug!(?available, "detected engines");
        available
    }

    pub fn select_preferred(&self, available: &BTreeSet<EngineKind>) -> Option<EngineKind> {
        self.priority.select(available)
    }

    /// Engine that must run `crew`.
    ///
    /// A forced engine wins outright, then the crew's required engine, then
    /// the priority order. A chosen engine that is not installed is an error,
    /// never a silent fallback to another engine.
    pub async fn resolve(&self, crew: &CrewDef, forced: Option<EngineKind>) -> Result<EngineKind> {
        self.resolve_with_reason(crew, forced)
            .await
            .map(|(engine, _)| engine)
    }

    pub async fn resolve_with_reason(
        &self,
        crew: &CrewDef,
        forced: Option<EngineKind>,
    ) -> Result<(EngineKind, Selection)> {
        let pinned = forced
            .map(|engine| (engine, Selection::Forced))
            .or_else(|| crew.required_engine.map(|engine| (engine, Selection::Required)));

        if let Some((engine, selection)) = pinned {
            if self.probe.is_installed(engine).await {
                return Ok((engine, selection));
            }
            let why = match selection {
                Selection::Required => format!("required by crew '{}'", crew.name),
                _ => "requested".to_string(),
            };
            return Err(CrewError::FrameworkNotAvailable(format!(
                "{engine} ({why}) is not installed. Install with: {}",
                engine.install_hint()
            )));
        }

        let available = self.detect_available().await;
        self.select_preferred(&available)
            .map(|engine| (engine, Selection::Preferred))
            .ok_or_else(|| {
                let hints: Vec<&str> = self
                    .priority
                    .order()
                    .iter()
                    .map(|engine| engine.install_hint())
                    .collect();
                CrewError::FrameworkNotAvailable(format!(
                    "no multi-agent framework is installed. Install one of: {}",
                    hints.join(" | ")
                ))
            })
    }

    /// Adapter for a resolved engine.
    pub fn get_runner(&self, engine: EngineKind) -> Box<dyn Runner> {
        engines::runner_for(engine, Arc::clone(&self.host))
    }

    /// Command-line runner for profile `name`. Never substituted for an engine.
    pub fn get_cli_runner(&self, name: &str, model: Option<String>) -> Result<CliRunner> {
        self.profiles.resolve(name, model)
    }
}
