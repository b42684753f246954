//! Built-in tool catalogue.
//!
//! Agents reference tools by neutral name (`read_file`) or by the class name
//! the crewai toolkit uses (`GameCodeReaderTool`). Each engine adapter
//! resolves references into its own identifiers; anything unresolvable is a
//! build error, never a silent drop.

use crate::domain::{AgentDef, CrewError, EngineKind, Result};

/// One tool and the engines that ship it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolSpec {
    pub name: &'static str,
    pub class_name: &'static str,
    pub engines: &'static [EngineKind],
}

const ALL_ENGINES: &[EngineKind] = &EngineKind::ALL;

pub const CATALOGUE: &[ToolSpec] = &[
    ToolSpec {
        name: "read_file",
        class_name: "GameCodeReaderTool",
        engines: ALL_ENGINES,
    },
    ToolSpec {
        name: "write_file",
        class_name: "GameCodeWriterTool",
        engines: ALL_ENGINES,
    },
    ToolSpec {
        name: "list_directory",
        class_name: "DirectoryListTool",
        engines: ALL_ENGINES,
    },
    ToolSpec {
        name: "scrape_website",
        class_name: "ScrapeWebsiteTool",
        engines: ALL_ENGINES,
    },
    ToolSpec {
        name: "crawl_website",
        class_name: "CrawlWebsiteTool",
        engines: &[EngineKind::CrewAi],
    },
];

pub fn lookup(reference: &str) -> Option<&'static ToolSpec> {
    CATALOGUE
        .iter()
        .find(|tool| tool.name == reference || tool.class_name == reference)
}

/// Engine-native identifiers for an agent's tools.
///
/// crewai uses class names; the other engines use neutral names.
pub fn resolve_for(engine: EngineKind, crew: &str, agent: &AgentDef) -> Result<Vec<String>> {
    agent
        .tools
        .iter()
        .map(|reference| {
            let tool = lookup(reference)
                .filter(|tool| tool.engines.contains(&engine))
                .ok_or_else(|| CrewError::EngineBuild {
                    engine: engine.to_string(),
                    crew: crew.to_string(),
                    reason: format!(
                        "agent '{}' uses unsupported tool '{reference}'",
                        agent.name
                    ),
                })?;
            Ok(match engine {
                EngineKind::CrewAi => tool.class_name.to_string(),
                EngineKind::LangGraph | EngineKind::Strands => tool.name.to_string(),
            })
        })
        .collect()
}
