//! External super-resolution tool invocation.
//!
//! The tool is treated as a black box: it gets a model, an input file, an
//! output directory, a scale and a name suffix on its command line, and is
//! expected to leave `{base}_{suffix}{ext}` behind. Timing is not trusted, so
//! every run is bounded by a wall-clock timeout and killed when it expires.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;

use super::config::Config;
use super::error::AppError;
use super::filename::NamingContract;
use super::models::UpscaleOptions;
use crate::{sys_debug, sys_info, sys_warn};

/// One input image to upscale into `output_dir`.
#[derive(Debug, Clone)]
pub struct UpscaleJob {
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    pub options: UpscaleOptions,
}

/// How to launch the tool; built once from config.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    pub program: String,
    /// Arguments placed before the per-job flags (typically the inference script).
    pub script_args: Vec<String>,
    pub workdir: Option<PathBuf>,
    pub fp32: bool,
    pub naming: NamingContract,
}

/// Captured streams of a successful run.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl ToolCommand {
    pub fn from_config(config: &Config, naming: NamingContract) -> Self {
        Self {
            program: config.program.clone(),
            script_args: config.script_args.clone(),
            workdir: config.tool_workdir.clone(),
            fp32: config.fp32,
            naming,
        }
    }

    /// Full argument vector for a job (everything after the program name).
    pub fn args(&self, job: &UpscaleJob) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.script_args.iter().map(OsString::from).collect();
        args.push("-n".into());
        args.push(job.options.model.id().into());
        args.push("-i".into());
        args.push(job.input_path.clone().into_os_string());
        args.push("-o".into());
        args.push(job.output_dir.clone().into_os_string());
        args.push("-s".into());
        args.push(job.options.resolution.factor().to_string().into());
        args.push("--suffix".into());
        args.push(self.naming.suffix().into());
        if self.fp32 {
            args.push("--fp32".into());
        }
        args
    }

    fn build(&self, job: &UpscaleJob) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(self.args(job))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.workdir {
            command.current_dir(dir);
        }
        command
    }

    fn display(&self, job: &UpscaleJob) -> String {
        let args = self
            .args(job)
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ");
        format!("{} {args}", self.program)
    }
}

/// Run the tool for `job`, waiting at most `timeout`.
///
/// On timeout the child is dropped, which kills it (`kill_on_drop`); tokio
/// reaps it in the background.
pub async fn run_tool(
    command: &ToolCommand,
    job: &UpscaleJob,
    timeout: Duration,
) -> Result<ToolOutput, AppError> {
    sys_info!("[UPSCALER] Running: {}", command.display(job));
    let started = Instant::now();
    let child = command.build(job).spawn().map_err(AppError::ToolSpawn)?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result?,
        Err(_) => {
            sys_warn!(
                "[UPSCALER] Killed after exceeding {:.1}s timeout",
                timeout.as_secs_f32()
            );
            return Err(AppError::ToolTimeout(timeout));
        }
    };

    let elapsed = started.elapsed();
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    sys_debug!("[UPSCALER] stdout: {}", stdout.trim_end());
    sys_debug!("[UPSCALER] stderr: {}", stderr.trim_end());

    if !output.status.success() {
        let diagnostics = if stderr.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            stderr.trim().to_string()
        };
        sys_warn!(
            "[UPSCALER] Failed after {:.1}s ({}): {}",
            elapsed.as_secs_f32(),
            output.status,
            diagnostics
        );
        return Err(AppError::ToolFailed {
            code: output.status.code(),
            diagnostics,
        });
    }

    sys_info!("[UPSCALER] Finished in {:.1}s", elapsed.as_secs_f32());
    Ok(ToolOutput {
        stdout,
        stderr,
        elapsed,
    })
}
