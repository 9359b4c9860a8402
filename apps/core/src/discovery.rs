use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::desktop_entry::parse_desktop_entry;
use crate::model::RawApplicationDescriptor;

const DESKTOP_ENTRY_MAX_DEPTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("partial result ({} found): {reason}", .found.len())]
    PartialResult {
        found: Vec<RawApplicationDescriptor>,
        reason: String,
    },
    #[error("strategy unavailable: {0}")]
    Unavailable(String),
    #[error("could not discover any applications")]
    NothingDiscovered,
}

pub trait DiscoveryStrategy: Send + Sync {
    fn strategy_name(&self) -> &'static str;
    fn enumerate(&self) -> Result<Vec<RawApplicationDescriptor>, DiscoveryError>;

    /// Whether a successful run lists every installed application. Probing
    /// strategies only see a subset and can never make an enumeration complete.
    fn is_full_listing(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyOutcome {
    Complete,
    Partial(String),
    Denied(String),
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyReport {
    pub strategy: &'static str,
    pub found: usize,
    pub outcome: StrategyOutcome,
}

/// Merged output of every strategy that produced something.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enumeration {
    pub apps: Vec<RawApplicationDescriptor>,
    pub complete: bool,
    pub reports: Vec<StrategyReport>,
}

#[derive(Default)]
pub struct DiscoverySource {
    strategies: Vec<Box<dyn DiscoveryStrategy>>,
}

impl DiscoverySource {
    pub fn new(strategies: Vec<Box<dyn DiscoveryStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn with_strategy(mut self, strategy: Box<dyn DiscoveryStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Desktop manifests first, then direct probes for the configured well-known ids.
    pub fn from_config(cfg: &Config) -> Self {
        let mut source = Self::default().with_strategy(Box::new(DesktopEntryStrategy::from_config(cfg)));
        if !cfg.well_known_ids.is_empty() {
            source = source.with_strategy(Box::new(WellKnownProbeStrategy::new(
                Box::new(ManifestPathProbe::new(cfg.application_dirs.clone())),
                cfg.well_known_ids.clone(),
            )));
        }
        source
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.strategy_name()).collect()
    }

    /// Runs every strategy, keeping the first descriptor reported for each id.
    /// No single strategy failure is fatal; only an empty aggregate is. The result
    /// is complete only when every strategy succeeded and at least one of them
    /// was a full listing.
    pub fn enumerate(&self) -> Result<Enumeration, DiscoveryError> {
        let mut seen = HashSet::new();
        let mut apps = Vec::new();
        let mut reports = Vec::with_capacity(self.strategies.len());
        let mut all_succeeded = true;
        let mut listed_everything = false;

        for strategy in &self.strategies {
            let name = strategy.strategy_name();
            let (found, outcome) = match strategy.enumerate() {
                Ok(found) => (found, StrategyOutcome::Complete),
                Err(DiscoveryError::PartialResult { found, reason }) => {
                    info!(strategy = name, found = found.len(), %reason, "discovery strategy returned a partial result");
                    (found, StrategyOutcome::Partial(reason))
                }
                Err(DiscoveryError::PermissionDenied(reason)) => {
                    warn!(strategy = name, %reason, "discovery strategy lacks permission, falling back");
                    (Vec::new(), StrategyOutcome::Denied(reason))
                }
                Err(error) => {
                    warn!(strategy = name, %error, "discovery strategy unavailable");
                    (Vec::new(), StrategyOutcome::Unavailable(error.to_string()))
                }
            };

            if outcome == StrategyOutcome::Complete {
                listed_everything |= strategy.is_full_listing();
            } else {
                all_succeeded = false;
            }
            let count = found.len();
            for descriptor in found {
                if seen.insert(descriptor.id.clone()) {
                    apps.push(descriptor);
                }
            }
            reports.push(StrategyReport {
                strategy: name,
                found: count,
                outcome,
            });
        }

        if apps.is_empty() {
            warn!(strategies = reports.len(), "no discovery strategy found any applications");
            return Err(DiscoveryError::NothingDiscovered);
        }

        let complete = all_succeeded && listed_everything;
        debug!(apps = apps.len(), complete, "discovery finished");
        Ok(Enumeration {
            apps,
            complete,
            reports,
        })
    }
}

pub struct FixtureStrategy {
    apps: Vec<RawApplicationDescriptor>,
}

impl FixtureStrategy {
    pub fn from_apps(apps: Vec<RawApplicationDescriptor>) -> Self {
        Self { apps }
    }

    pub fn deterministic_fixture() -> Self {
        Self {
            apps: vec![
                RawApplicationDescriptor::new("org.example.camera", "Camera")
                    .with_categories(&["Video"])
                    .with_version("1.4", 14),
                RawApplicationDescriptor::new("org.example.calculator", "Calculator")
                    .with_categories(&["Utility"])
                    .with_version("3.0", 30),
                RawApplicationDescriptor::new("org.example.calendar", "Calendar")
                    .with_raw_label("Agenda")
                    .with_categories(&["Office", "Calendar"])
                    .with_version("2.2", 22),
            ],
        }
    }
}

impl DiscoveryStrategy for FixtureStrategy {
    fn strategy_name(&self) -> &'static str {
        "fixture"
    }

    fn is_full_listing(&self) -> bool {
        true
    }

    fn enumerate(&self) -> Result<Vec<RawApplicationDescriptor>, DiscoveryError> {
        Ok(self.apps.clone())
    }
}

/// Full listing: walks application directories for `.desktop` manifests.
pub struct DesktopEntryStrategy {
    roots: Vec<PathBuf>,
    system_roots: Vec<PathBuf>,
    max_depth: usize,
}

impl DesktopEntryStrategy {
    pub fn new(roots: Vec<PathBuf>, system_roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            system_roots,
            max_depth: DESKTOP_ENTRY_MAX_DEPTH,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.application_dirs.clone(), cfg.system_application_dirs.clone())
    }

    fn is_system_path(&self, path: &Path) -> bool {
        self.system_roots.iter().any(|root| path.starts_with(root))
    }
}

impl DiscoveryStrategy for DesktopEntryStrategy {
    fn strategy_name(&self) -> &'static str {
        "desktop_entries"
    }

    fn is_full_listing(&self) -> bool {
        true
    }

    fn enumerate(&self) -> Result<Vec<RawApplicationDescriptor>, DiscoveryError> {
        let mut seen = HashSet::new();
        let mut apps = Vec::new();
        let mut denied: Vec<PathBuf> = Vec::new();
        let mut readable_roots = 0;

        for root in &self.roots {
            match std::fs::metadata(root) {
                Ok(_) => readable_roots += 1,
                Err(error) if error.kind() == ErrorKind::NotFound => continue,
                Err(error) if error.kind() == ErrorKind::PermissionDenied => {
                    denied.push(root.clone());
                    continue;
                }
                Err(error) => {
                    debug!(root = %root.display(), %error, "skipping unreadable application dir");
                    continue;
                }
            }

            for entry in WalkDir::new(root).max_depth(self.max_depth).follow_links(true) {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(error) => {
                        let permission = error
                            .io_error()
                            .is_some_and(|io| io.kind() == ErrorKind::PermissionDenied);
                        if permission {
                            denied.push(error.path().unwrap_or(root.as_path()).to_path_buf());
                        }
                        continue;
                    }
                };

                let path = entry.path();
                let is_manifest = entry.file_type().is_file()
                    && path.extension().and_then(|ext| ext.to_str()) == Some("desktop");
                if !is_manifest {
                    continue;
                }
                let Some(id) = path.file_stem().and_then(|stem| stem.to_str()) else {
                    continue;
                };
                if seen.contains(id) {
                    continue;
                }

                let contents = match std::fs::read_to_string(path) {
                    Ok(contents) => contents,
                    Err(error) if error.kind() == ErrorKind::PermissionDenied => {
                        denied.push(path.to_path_buf());
                        continue;
                    }
                    Err(error) => {
                        debug!(path = %path.display(), %error, "skipping unreadable manifest");
                        continue;
                    }
                };

                let Some(mut descriptor) = parse_desktop_entry(id, &contents) else {
                    continue;
                };
                descriptor.is_system_component = self.is_system_path(path);
                if let Ok(meta) = entry.metadata() {
                    let modified = meta.modified().ok().map(epoch_secs).unwrap_or(0);
                    descriptor.updated_at = modified;
                    descriptor.installed_at = meta.created().ok().map(epoch_secs).unwrap_or(modified);
                }
                seen.insert(id.to_string());
                apps.push(descriptor);
            }
        }

        if readable_roots == 0 && denied.is_empty() {
            return Err(DiscoveryError::Unavailable(
                "no application dir exists".to_string(),
            ));
        }
        denied_outcome(apps, &denied, "application dirs")
    }
}

/// Intent-resolution probing: asks the platform which entries it can launch.
pub trait LauncherQuery: Send + Sync {
    fn launchable_apps(&self) -> Result<Vec<RawApplicationDescriptor>, DiscoveryError>;
}

pub struct LauncherQueryStrategy {
    query: Box<dyn LauncherQuery>,
}

impl LauncherQueryStrategy {
    pub fn new(query: Box<dyn LauncherQuery>) -> Self {
        Self { query }
    }
}

impl DiscoveryStrategy for LauncherQueryStrategy {
    fn strategy_name(&self) -> &'static str {
        "launcher_query"
    }

    fn enumerate(&self) -> Result<Vec<RawApplicationDescriptor>, DiscoveryError> {
        self.query.launchable_apps()
    }
}

/// Looks up a single package id. `Ok(None)` means not installed.
pub trait PackageProbe: Send + Sync {
    fn probe(&self, id: &str) -> Result<Option<RawApplicationDescriptor>, DiscoveryError>;
}

/// Well-known-identifier probing: checks a fixed list of ids one by one.
pub struct WellKnownProbeStrategy {
    probe: Box<dyn PackageProbe>,
    ids: Vec<String>,
}

impl WellKnownProbeStrategy {
    pub fn new(probe: Box<dyn PackageProbe>, ids: Vec<String>) -> Self {
        Self { probe, ids }
    }
}

impl DiscoveryStrategy for WellKnownProbeStrategy {
    fn strategy_name(&self) -> &'static str {
        "well_known_probe"
    }

    fn enumerate(&self) -> Result<Vec<RawApplicationDescriptor>, DiscoveryError> {
        let mut apps = Vec::new();
        let mut denied = Vec::new();
        for id in &self.ids {
            match self.probe.probe(id) {
                Ok(Some(descriptor)) => apps.push(descriptor),
                Ok(None) => {}
                Err(error) => {
                    debug!(id = %id, %error, "well-known probe failed");
                    denied.push(PathBuf::from(id));
                }
            }
        }
        denied_outcome(apps, &denied, "probes")
    }
}

/// Resolves `<dir>/<id>.desktop` directly without listing the directory.
pub struct ManifestPathProbe {
    dirs: Vec<PathBuf>,
}

impl ManifestPathProbe {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }
}

impl PackageProbe for ManifestPathProbe {
    fn probe(&self, id: &str) -> Result<Option<RawApplicationDescriptor>, DiscoveryError> {
        let mut denied = false;
        for dir in &self.dirs {
            let path = dir.join(format!("{id}.desktop"));
            match std::fs::read_to_string(&path) {
                Ok(contents) => return Ok(parse_desktop_entry(id, &contents)),
                Err(error) if error.kind() == ErrorKind::PermissionDenied => denied = true,
                Err(_) => {}
            }
        }
        if denied {
            Err(DiscoveryError::PermissionDenied(format!("cannot read manifest for {id}")))
        } else {
            Ok(None)
        }
    }
}

fn denied_outcome(
    apps: Vec<RawApplicationDescriptor>,
    denied: &[PathBuf],
    what: &str,
) -> Result<Vec<RawApplicationDescriptor>, DiscoveryError> {
    if denied.is_empty() {
        return Ok(apps);
    }
    let reason = format!("{} {what} denied", denied.len());
    if apps.is_empty() {
        Err(DiscoveryError::PermissionDenied(reason))
    } else {
        Err(DiscoveryError::PartialResult {
            found: apps,
            reason,
        })
    }
}

fn epoch_secs(time: SystemTime) -> i64 {
    chrono::DateTime::<chrono::Utc>::from(time).timestamp()
}
