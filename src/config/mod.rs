//! Configuration management
//!
//! Three layers, lowest priority first: built-in defaults, an optional TOML
//! file (`--config`), then command-line flags.

use crate::types::SyncError;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Default number of concurrent copy workers
pub const DEFAULT_COPY_WORKERS: usize = 10;

/// Comparison key used to decide whether a destination file is stale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareMode {
    /// Compare blake3 content digests (catches same-size edits)
    #[default]
    Digest,

    /// Compare sizes only; fast, but misses same-size content changes
    Size,
}

impl std::fmt::Display for CompareMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompareMode::Digest => f.write_str("digest"),
            CompareMode::Size => f.write_str("size"),
        }
    }
}

/// Global configuration for one sync run
#[derive(Debug, Clone)]
pub struct Config {
    /// Source directory
    pub source: PathBuf,

    /// Destination directory
    pub destination: PathBuf,

    /// Dry run (report the manifest, don't copy)
    pub dry_run: bool,

    /// Emit per-file progress through the log
    pub verbose: bool,

    /// Comparison key
    pub compare_mode: CompareMode,

    /// Hash workers per tree
    pub hash_workers: usize,

    /// Copy workers
    pub copy_workers: usize,

    /// Queue capacity = worker count × this factor
    pub queue_depth_factor: usize,

    /// Exclude patterns (globs matched against relative paths)
    pub exclude_patterns: Vec<String>,

    /// Deadline for the whole run; on expiry the run is cancelled
    pub timeout: Option<Duration>,

    /// Draw progress bars on stderr
    pub show_progress: bool,

    /// Print the run summary as JSON
    pub json_report: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            destination: PathBuf::new(),
            dry_run: false,
            verbose: false,
            compare_mode: CompareMode::Digest,
            hash_workers: default_hash_workers(),
            copy_workers: DEFAULT_COPY_WORKERS,
            queue_depth_factor: 1,
            exclude_patterns: Vec::new(),
            timeout: None,
            show_progress: false,
            json_report: false,
        }
    }
}

/// Hash workers scale with the machine: four per available core
pub fn default_hash_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get() * 4)
        .unwrap_or(4)
}

impl Config {
    /// Validate configuration
    ///
    /// Root existence is checked later by the orchestrator so that it can be
    /// reported as a root-resolution failure.
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.hash_workers == 0 {
            return Err(SyncError::Config(
                "Hash worker count must be at least 1".to_string(),
            ));
        }
        if self.copy_workers == 0 {
            return Err(SyncError::Config(
                "Copy worker count must be at least 1".to_string(),
            ));
        }
        if self.queue_depth_factor == 0 {
            return Err(SyncError::Config(
                "Queue depth factor must be at least 1".to_string(),
            ));
        }

        let source = normalize_lexically(&self.source);
        let destination = normalize_lexically(&self.destination);

        if source == destination {
            return Err(SyncError::Config(
                "Source and destination cannot be the same".to_string(),
            ));
        }

        if destination.starts_with(&source) || source.starts_with(&destination) {
            return Err(SyncError::Config(format!(
                "Source {:?} and destination {:?} must not be nested inside each other",
                self.source, self.destination
            )));
        }

        Ok(())
    }

    /// Capacity for a queue feeding `workers` consumers
    pub fn queue_capacity(&self, workers: usize) -> usize {
        workers.max(1).saturating_mul(self.queue_depth_factor.max(1))
    }
}

/// Command-line interface
#[derive(Debug, Parser)]
#[command(
    name = "treesync",
    version,
    about = "Synchronize a directory tree into another, copying only new or changed files"
)]
pub struct Cli {
    /// Source directory to sync from
    #[arg(short = 's', long = "source")]
    pub source: PathBuf,

    /// Destination directory to sync to
    #[arg(short = 'd', long = "dest")]
    pub destination: PathBuf,

    /// Preview changes without copying
    #[arg(short = 'r', long)]
    pub dry_run: bool,

    /// Output detailed per-file logs
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Comparison key: digest (exact) or size (fast, approximate)
    #[arg(long = "compare", value_enum)]
    pub compare_mode: Option<CompareMode>,

    /// Number of hash workers per tree
    #[arg(long)]
    pub hash_workers: Option<usize>,

    /// Number of copy workers
    #[arg(long)]
    pub copy_workers: Option<usize>,

    /// Glob of relative paths to skip (repeatable)
    #[arg(short = 'e', long = "exclude")]
    pub exclude: Vec<String>,

    /// Abort the run after this many seconds and report partial results
    #[arg(long = "timeout")]
    pub timeout_secs: Option<u64>,

    /// Load defaults from a TOML file
    #[arg(short = 'c', long = "config")]
    pub config_file: Option<PathBuf>,

    /// Disable progress bars
    #[arg(long)]
    pub no_progress: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,
}

/// Tunables accepted from a TOML config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub compare: Option<CompareMode>,
    pub hash_workers: Option<usize>,
    pub copy_workers: Option<usize>,
    pub queue_depth_factor: Option<usize>,
    #[serde(default)]
    pub exclude: Vec<String>,
    pub timeout_secs: Option<u64>,
    pub verbose: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, SyncError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            SyncError::Config(format!("Cannot read config file {:?}: {}", path, e))
        })?;
        Self::parse(&raw)
            .map_err(|e| SyncError::Config(format!("Invalid config file {:?}: {}", path, e)))
    }

    pub fn parse(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }
}

impl TryFrom<Cli> for Config {
    type Error = SyncError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let file = match &cli.config_file {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        let defaults = Config::default();

        let mut exclude_patterns = file.exclude;
        exclude_patterns.extend(cli.exclude);

        let config = Config {
            source: absolutize(&cli.source)?,
            destination: absolutize(&cli.destination)?,
            dry_run: cli.dry_run,
            verbose: cli.verbose || file.verbose.unwrap_or(false),
            compare_mode: cli
                .compare_mode
                .or(file.compare)
                .unwrap_or(defaults.compare_mode),
            hash_workers: cli
                .hash_workers
                .or(file.hash_workers)
                .unwrap_or(defaults.hash_workers),
            copy_workers: cli
                .copy_workers
                .or(file.copy_workers)
                .unwrap_or(defaults.copy_workers),
            queue_depth_factor: file
                .queue_depth_factor
                .unwrap_or(defaults.queue_depth_factor),
            exclude_patterns,
            timeout: cli
                .timeout_secs
                .or(file.timeout_secs)
                .map(Duration::from_secs),
            show_progress: !cli.no_progress && !cli.json,
            json_report: cli.json,
        };

        config.validate()?;
        Ok(config)
    }
}

fn absolutize(path: &Path) -> Result<PathBuf, SyncError> {
    std::path::absolute(path)
        .map(|p| normalize_lexically(&p))
        .map_err(|e| SyncError::Config(format!("Invalid path {:?}: {}", path, e)))
}

/// Drop `.` components and resolve `..` against the preceding component
///
/// Purely textual: symlinks are not consulted. A `..` at the root stays at
/// the root.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(Component::ParentDir),
            },
            other => out.push(other),
        }
    }
    out
}
