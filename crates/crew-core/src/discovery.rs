//! Package discovery.
//!
//! A package is a directory holding one of the declaration directories in
//! [`CONFIG_DIRS`] with a `manifest.yaml` inside. Packages live under
//! `<workspace>/packages/<name>/`; the workspace root itself may also carry a
//! declaration directory, in which case it is reported as a package named
//! after the root directory (or `default`).
//!
//! Discovery never parses the manifest. It only checks that the file exists.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::{CrewError, EngineKind, Package, Result};

/// Declaration directories, in lookup priority order.
pub const CONFIG_DIRS: [&str; 4] = [".crew", ".crewai", ".langgraph", ".strands"];

/// Top-level declaration file expected inside a declaration directory.
pub const MANIFEST_FILE: &str = "manifest.yaml";

/// Directory under the workspace root that holds packages.
pub const PACKAGES_DIR: &str = "packages";

const ROOT_PACKAGE_FALLBACK: &str = "default";

/// One declaration directory of a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameworkConfig {
    /// Engine pinned by the directory, `None` for the neutral `.crew`.
    pub engine: Option<EngineKind>,
    pub config_dir: PathBuf,
}

/// Filesystem scanner rooted at a workspace.
#[derive(Debug, Clone)]
pub struct Discovery {
    root: PathBuf,
}

impl Discovery {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scan for packages. Each call starts a fresh scan.
    pub fn list_packages(&self) -> PackageScan {
        PackageScan::new(&self.root)
    }

    /// Names of every visible package, in scan order.
    pub fn package_names(&self) -> Vec<String> {
        self.list_packages().map(|pkg| pkg.name).collect()
    }

    /// Locate one package by name.
    pub fn find_package(&self, name: &str) -> Result<Package> {
        let mut seen = Vec::new();
        for pkg in self.list_packages() {
            if pkg.name == name {
                debug!(package = %name, config_dir = %pkg.config_dir.display(), "package found");
                return Ok(pkg);
            }
            seen.push(pkg.name);
        }
        Err(CrewError::PackageNotFound {
            name: name.to_string(),
            available: seen,
        })
    }

    /// Every declaration directory of every package, not only the preferred one.
    pub fn discover_all_framework_configs(&self) -> BTreeMap<String, Vec<FrameworkConfig>> {
        let mut all = BTreeMap::new();
        for dir in package_dirs(&self.root) {
            let configs = framework_configs(&dir);
            if let (Some(name), false) = (dir_name(&dir), configs.is_empty()) {
                all.insert(name, configs);
            }
        }

        let root_configs = framework_configs(&self.root);
        if !root_configs.is_empty() {
            let name = root_package_name(&self.root);
            all.entry(name).or_insert(root_configs);
        }
        all
    }
}

/// Walk up from `start` to the nearest directory containing `packages/`.
///
/// Falls back to `start` when no ancestor qualifies.
pub fn locate_workspace_root(start: &Path) -> PathBuf {
    start
        .ancestors()
        .find(|dir| dir.join(PACKAGES_DIR).is_dir())
        .unwrap_or(start)
        .to_path_buf()
}

/// Lazy scan over the packages visible from a workspace root.
///
/// Yields `packages/*` entries in name order, then the root package. A name
/// already produced is never produced again.
#[derive(Debug)]
pub struct PackageScan {
    candidates: std::vec::IntoIter<PathBuf>,
    root: Option<PathBuf>,
    seen: HashSet<String>,
}

impl PackageScan {
    fn new(root: &Path) -> Self {
        Self {
            candidates: package_dirs(root).into_iter(),
            root: Some(root.to_path_buf()),
            seen: HashSet::new(),
        }
    }
}

impl Iterator for PackageScan {
    type Item = Package;

    fn next(&mut self) -> Option<Package> {
        for dir in self.candidates.by_ref() {
            let Some(name) = dir_name(&dir) else {
                continue;
            };
            if let Some(config_dir) = preferred_config_dir(&dir) {
                if self.seen.insert(name.clone()) {
                    return Some(Package::new(name, config_dir));
                }
            }
        }

        let root = self.root.take()?;
        let config_dir = preferred_config_dir(&root)?;
        let name = root_package_name(&root);
        if self.seen.insert(name.clone()) {
            Some(Package::new(name, config_dir))
        } else {
            None
        }
    }
}

fn package_dirs(root: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(root.join(PACKAGES_DIR)) else {
        return Vec::new();
    };
    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    dirs
}

fn has_manifest(config_dir: &Path) -> bool {
    config_dir.join(MANIFEST_FILE).is_file()
}

fn preferred_config_dir(dir: &Path) -> Option<PathBuf> {
    CONFIG_DIRS
        .iter()
        .map(|name| dir.join(name))
        .find(|config_dir| has_manifest(config_dir))
}

fn framework_configs(dir: &Path) -> Vec<FrameworkConfig> {
    CONFIG_DIRS
        .iter()
        .map(|name| dir.join(name))
        .filter(|config_dir| has_manifest(config_dir))
        .map(|config_dir| FrameworkConfig {
            engine: EngineKind::from_config_dir(&config_dir),
            config_dir,
        })
        .collect()
}

fn dir_name(dir: &Path) -> Option<String> {
    dir.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
}

fn root_package_name(root: &Path) -> String {
    dir_name(root)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| ROOT_PACKAGE_FALLBACK.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn declare(dir: &Path, config: &str) {
        let config_dir = dir.join(config);
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join(MANIFEST_FILE), "crews: {}\n").unwrap();
    }

    #[test]
    fn test_empty_workspace_has_no_packages() {
        let tmp = TempDir::new().unwrap();
        let discovery = Discovery::new(tmp.path());
        assert_eq!(discovery.list_packages().count(), 0);
    }

    #[test]
    fn test_packages_are_sorted_and_prefer_neutral_dir() {
        let tmp = TempDir::new().unwrap();
        let pkgs = tmp.path().join(PACKAGES_DIR);
        declare(&pkgs.join("zeta"), ".strands");
        declare(&pkgs.join("alpha"), ".crewai");
        declare(&pkgs.join("alpha"), ".crew");

        let found: Vec<Package> = Discovery::new(tmp.path()).list_packages().collect();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name, "alpha");
        assert!(found[0].config_dir.ends_with(".crew"));
        assert_eq!(found[1].name, "zeta");
        assert_eq!(found[1].pinned_engine(), Some(EngineKind::Strands));
    }

    #[test]
    fn test_directory_without_manifest_is_ignored() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("packages/empty/.crewai")).unwrap();
        assert!(Discovery::new(tmp.path()).package_names().is_empty());
    }

    #[test]
    fn test_root_package_does_not_shadow_packages_entry() {
        let tmp = TempDir::new().unwrap();
        let root_name = tmp.path().file_name().unwrap().to_str().unwrap().to_string();
        declare(tmp.path(), ".crewai");
        declare(&tmp.path().join(PACKAGES_DIR).join(&root_name), ".langgraph");

        let found: Vec<Package> = Discovery::new(tmp.path()).list_packages().collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].pinned_engine(), Some(EngineKind::LangGraph));
    }

    #[test]
    fn test_find_package_reports_available_names() {
        let tmp = TempDir::new().unwrap();
        declare(&tmp.path().join("packages/otterfall"), ".crewai");

        let err = Discovery::new(tmp.path())
            .find_package("missingpkg")
            .unwrap_err();
        assert_eq!(err.available_packages(), Some(&["otterfall".to_string()][..]));
    }

    #[test]
    fn test_discover_all_framework_configs() {
        let tmp = TempDir::new().unwrap();
        let pkg = tmp.path().join("packages/otterfall");
        declare(&pkg, ".crewai");
        declare(&pkg, ".strands");

        let all = Discovery::new(tmp.path()).discover_all_framework_configs();
        let configs = &all["otterfall"];
        let engines: Vec<_> = configs.iter().map(|c| c.engine).collect();
        assert_eq!(engines, vec![Some(EngineKind::CrewAi), Some(EngineKind::Strands)]);
    }

    #[test]
    fn test_locate_workspace_root_walks_up() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("packages/otterfall/src");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(locate_workspace_root(&nested), tmp.path());

        let lone = TempDir::new().unwrap();
        assert_eq!(locate_workspace_root(lone.path()), lone.path());
    }
}
