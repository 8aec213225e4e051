// Process-wide state shared by every request handler

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::config::Config;
use super::error::AppError;
use super::filename::NamingContract;
use super::housekeeping::InFlight;
use super::session::SessionStore;
use super::templates::Templates;
use super::upscale_queue::UpscaleQueue;
use super::upscaler::ToolCommand;
use crate::sys_info;

pub struct AppState {
    pub config: Config,
    /// Absolute, created at startup
    pub upload_dir: PathBuf,
    /// Absolute, created at startup
    pub output_dir: PathBuf,
    pub naming: NamingContract,
    pub sessions: SessionStore,
    /// Files of uploads still being processed; housekeeping skips them
    pub in_flight: InFlight,
    pub queue: UpscaleQueue,
    pub templates: Templates,
}

pub type SharedAppState = Arc<AppState>;

/// Create `dir` if needed and return its canonical path, so the tool can be
/// given absolute paths whatever its working directory.
fn prepare_dir(dir: &Path) -> Result<PathBuf, AppError> {
    std::fs::create_dir_all(dir)?;
    Ok(std::fs::canonicalize(dir)?)
}

impl AppState {
    /// Must be called inside a tokio runtime (spawns the queue workers).
    pub fn new(config: Config) -> Result<Self, AppError> {
        let upload_dir = prepare_dir(&config.upload_dir())?;
        let output_dir = prepare_dir(&config.output_dir())?;
        sys_info!(
            "[STARTUP] Uploads in {}, outputs in {}",
            upload_dir.display(),
            output_dir.display()
        );

        let naming = NamingContract::new(config.output_suffix.clone());
        let command = ToolCommand::from_config(&config, naming.clone());
        let queue = UpscaleQueue::spawn(
            command,
            config.tool_timeout(),
            config.workers,
            config.queue_capacity,
        );

        Ok(Self {
            upload_dir,
            output_dir,
            naming,
            sessions: SessionStore::new(),
            in_flight: InFlight::new(),
            queue,
            templates: Templates::new()?,
            config,
        })
    }

    pub fn storage_dirs(&self) -> [&Path; 2] {
        [self.upload_dir.as_path(), self.output_dir.as_path()]
    }
}
