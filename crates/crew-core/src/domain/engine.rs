//! Execution engine identity.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::CrewError;

/// One of the multi-agent execution engines a crew can target.
///
/// "No engine" is expressed as `Option::<EngineKind>::None`; the set is closed
/// and grows only with a new variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    CrewAi,
    LangGraph,
    Strands,
}

impl EngineKind {
    /// Every known engine, in declaration order.
    pub const ALL: [EngineKind; 3] = [EngineKind::CrewAi, EngineKind::LangGraph, EngineKind::Strands];

    /// Stable identifier used on the command line and in JSON output.
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::CrewAi => "crewai",
            EngineKind::LangGraph => "langgraph",
            EngineKind::Strands => "strands",
        }
    }

    /// Name of the framework-specific declaration directory that pins this engine.
    pub fn config_dir(&self) -> &'static str {
        match self {
            EngineKind::CrewAi => ".crewai",
            EngineKind::LangGraph => ".langgraph",
            EngineKind::Strands => ".strands",
        }
    }

    /// Suffix of the `AGENTIC_CREW_<ENGINE>_HOST` override variable.
    pub fn env_key(&self) -> &'static str {
        match self {
            EngineKind::CrewAi => "CREWAI",
            EngineKind::LangGraph => "LANGGRAPH",
            EngineKind::Strands => "STRANDS",
        }
    }

    /// Human hint for installing the engine.
    pub fn install_hint(&self) -> &'static str {
        match self {
            EngineKind::CrewAi => "pip install crewai",
            EngineKind::LangGraph => "pip install langgraph langchain-anthropic",
            EngineKind::Strands => "pip install strands-agents",
        }
    }

    /// Engine pinned by a declaration directory, `None` for `.crew` or anything else.
    pub fn from_config_dir(dir: &Path) -> Option<EngineKind> {
        let name = dir.file_name()?.to_str()?;
        EngineKind::ALL
            .into_iter()
            .find(|kind| kind.config_dir() == name)
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineKind {
    type Err = CrewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        EngineKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| {
                CrewError::Configuration(format!(
                    "unknown framework '{s}' (expected one of: crewai, langgraph, strands)"
                ))
            })
    }
}
