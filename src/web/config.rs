// Server configuration: JSON file defaults, overridden by CLI flags / UPSCALE_* env vars

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use log::LevelFilter;
use serde::Deserialize;
use thiserror::Error;

/// What gets deleted when the home page, an upload or `/cleanup` triggers housekeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CleanupPolicy {
    /// Wipe both storage directories and forget every session.
    Eager,
    /// Delete only the files recorded for the caller's session.
    Session,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Parser)]
#[command(name = "upscale_web", version, about = "Image upscaling web front-end")]
pub struct Args {
    /// JSON config file; flags below override its values
    #[arg(long, env = "UPSCALE_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "UPSCALE_BIND")]
    pub bind: Option<SocketAddr>,

    #[arg(long, env = "UPSCALE_STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    #[arg(long, env = "UPSCALE_UPLOAD_DIR")]
    pub upload_dir: Option<PathBuf>,

    #[arg(long, env = "UPSCALE_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Executable of the super-resolution tool (e.g. `python`)
    #[arg(long, env = "UPSCALE_PROGRAM")]
    pub program: Option<String>,

    /// Leading argument(s) for the tool, repeatable (e.g. the inference script)
    #[arg(long = "script-arg")]
    pub script_args: Vec<String>,

    #[arg(long, env = "UPSCALE_TOOL_WORKDIR")]
    pub tool_workdir: Option<PathBuf>,

    #[arg(long, env = "UPSCALE_TOOL_TIMEOUT_SECS")]
    pub tool_timeout_secs: Option<u64>,

    /// Run the tool in half precision (omit `--fp32`)
    #[arg(long)]
    pub half_precision: bool,

    #[arg(long, env = "UPSCALE_WORKERS")]
    pub workers: Option<usize>,

    #[arg(long, value_enum, env = "UPSCALE_CLEANUP_POLICY")]
    pub cleanup_policy: Option<CleanupPolicy>,

    #[arg(long, env = "UPSCALE_LOG_LEVEL")]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind: SocketAddr,
    pub static_dir: PathBuf,
    /// Defaults to `<static_dir>/uploads`
    pub upload_dir: Option<PathBuf>,
    /// Defaults to `<static_dir>/outputs`
    pub output_dir: Option<PathBuf>,
    pub program: String,
    pub script_args: Vec<String>,
    pub tool_workdir: Option<PathBuf>,
    pub fp32: bool,
    pub output_suffix: String,
    pub tool_timeout_secs: u64,
    pub workers: usize,
    pub queue_capacity: usize,
    pub max_upload_bytes: u64,
    pub cleanup_policy: CleanupPolicy,
    pub max_file_age_secs: u64,
    /// 0 disables the periodic janitor
    pub janitor_interval_secs: u64,
    pub session_ttl_secs: u64,
    pub log_level: String,
    pub log_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 5000)),
            static_dir: PathBuf::from("static"),
            upload_dir: None,
            output_dir: None,
            program: "python".to_string(),
            script_args: vec!["Real-ESRGAN/inference_realesrgan.py".to_string()],
            tool_workdir: None,
            fp32: true,
            output_suffix: "out".to_string(),
            tool_timeout_secs: 120,
            workers: 1,
            queue_capacity: 8,
            max_upload_bytes: 50 * 1024 * 1024,
            cleanup_policy: CleanupPolicy::Eager,
            max_file_age_secs: 3600,
            janitor_interval_secs: 300,
            session_ttl_secs: 3600,
            log_level: "info".to_string(),
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl Config {
    /// Build the effective configuration from an optional JSON file plus CLI/env overrides.
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_args(args);
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_args(&mut self, args: &Args) {
        if let Some(bind) = args.bind {
            self.bind = bind;
        }
        if let Some(dir) = &args.static_dir {
            self.static_dir = dir.clone();
        }
        if let Some(dir) = &args.upload_dir {
            self.upload_dir = Some(dir.clone());
        }
        if let Some(dir) = &args.output_dir {
            self.output_dir = Some(dir.clone());
        }
        if let Some(program) = &args.program {
            self.program = program.clone();
        }
        if !args.script_args.is_empty() {
            self.script_args = args.script_args.clone();
        }
        if let Some(dir) = &args.tool_workdir {
            self.tool_workdir = Some(dir.clone());
        }
        if let Some(secs) = args.tool_timeout_secs {
            self.tool_timeout_secs = secs;
        }
        if args.half_precision {
            self.fp32 = false;
        }
        if let Some(workers) = args.workers {
            self.workers = workers;
        }
        if let Some(policy) = args.cleanup_policy {
            self.cleanup_policy = policy;
        }
        if let Some(level) = &args.log_level {
            self.log_level = level.clone();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.program.trim().is_empty() {
            return Err(ConfigError::Invalid("program must not be empty".into()));
        }
        if self.tool_timeout_secs == 0 {
            return Err(ConfigError::Invalid("tool_timeout_secs must be at least 1".into()));
        }
        if self.workers == 0 || self.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "workers and queue_capacity must be at least 1".into(),
            ));
        }
        if self.output_suffix.is_empty()
            || !self
                .output_suffix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ConfigError::Invalid(format!(
                "output_suffix {:?} must be non-empty and alphanumeric",
                self.output_suffix
            )));
        }
        self.log_level_filter()?;
        Ok(())
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.upload_dir
            .clone()
            .unwrap_or_else(|| self.static_dir.join("uploads"))
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| self.static_dir.join("outputs"))
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    pub fn max_file_age(&self) -> Duration {
        Duration::from_secs(self.max_file_age_secs)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn janitor_interval(&self) -> Option<Duration> {
        (self.janitor_interval_secs > 0).then(|| Duration::from_secs(self.janitor_interval_secs))
    }

    pub fn log_level_filter(&self) -> Result<LevelFilter, ConfigError> {
        LevelFilter::from_str(&self.log_level)
            .map_err(|_| ConfigError::Invalid(format!("unknown log level {:?}", self.log_level)))
    }
}
