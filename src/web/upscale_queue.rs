//! Upscale job queue.
//!
//! Route handlers submit `UpscaleRequest`s to a bounded MPSC channel and await
//! a one-shot reply. A fixed set of worker tasks drain the channel, so the
//! number of concurrently running tool processes never exceeds `workers`.
//! A request whose caller went away (client disconnected, handler future
//! dropped) is skipped before it starts, or has its child killed mid-run.
//! `run` bounds queue wait plus tool run by a single deadline.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, Mutex};

use super::error::AppError;
use super::upscaler::{run_tool, ToolCommand, ToolOutput, UpscaleJob};
use crate::{sys_info, sys_warn};

/// Everything a worker needs to run one job and report back.
pub struct UpscaleRequest {
    pub job: UpscaleJob,
    pub result_sender: oneshot::Sender<Result<ToolOutput, AppError>>,
}

/// Cloneable handle that route handlers use to submit upscale work.
#[derive(Clone)]
pub struct UpscaleQueue {
    tx: mpsc::Sender<UpscaleRequest>,
    capacity: usize,
    timeout: Duration,
}

impl UpscaleQueue {
    /// Create the queue and spawn `workers` background workers. Requires a tokio runtime.
    pub fn spawn(command: ToolCommand, timeout: Duration, workers: usize, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel::<UpscaleRequest>(capacity);
        let rx = Arc::new(Mutex::new(rx));
        let command = Arc::new(command);

        for worker_id in 0..workers.max(1) {
            tokio::spawn(upscale_worker(
                worker_id,
                rx.clone(),
                command.clone(),
                timeout,
            ));
        }

        Self {
            tx,
            capacity,
            timeout,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Submit a request. Waits if the queue is full.
    pub async fn submit(&self, request: UpscaleRequest) -> Result<(), AppError> {
        self.tx.send(request).await.map_err(|_| AppError::QueueClosed)
    }

    /// Submit `job` and wait for its outcome, at most `timeout` from now.
    ///
    /// When the deadline passes the reply receiver is dropped, so a queued job
    /// is skipped and a running one is killed.
    pub async fn run(&self, job: UpscaleJob) -> Result<ToolOutput, AppError> {
        let input = job.input_path.clone();
        let attempt = async {
            let (result_sender, result_receiver) = oneshot::channel();
            self.submit(UpscaleRequest { job, result_sender }).await?;
            result_receiver.await.map_err(|_| AppError::QueueClosed)?
        };
        match tokio::time::timeout(self.timeout, attempt).await {
            Ok(result) => result,
            Err(_) => {
                sys_warn!(
                    "[QUEUE] {} not finished within {:.1}s (queue wait included)",
                    input.display(),
                    self.timeout.as_secs_f32()
                );
                Err(AppError::ToolTimeout(self.timeout))
            }
        }
    }
}

/// Long-lived task that pulls requests off the shared channel one at a time.
async fn upscale_worker(
    worker_id: usize,
    rx: Arc<Mutex<mpsc::Receiver<UpscaleRequest>>>,
    command: Arc<ToolCommand>,
    timeout: Duration,
) {
    loop {
        // Hold the lock only while waiting for the next request.
        let next = rx.lock().await.recv().await;
        let Some(request) = next else {
            break;
        };
        let UpscaleRequest {
            job,
            mut result_sender,
        } = request;

        if result_sender.is_closed() {
            sys_info!(
                "[QUEUE] Worker {} skipping {}: caller went away before start",
                worker_id,
                job.input_path.display()
            );
            continue;
        }

        // Dropping the run future kills the child, so a disconnect cancels the job.
        let outcome = tokio::select! {
            result = run_tool(&command, &job, timeout) => Some(result),
            _ = result_sender.closed() => None,
        };

        match outcome {
            Some(result) => {
                // Caller may have dropped the receiver in the meantime; ignore.
                let _ = result_sender.send(result);
            }
            None => sys_warn!(
                "[QUEUE] Worker {} cancelled {}: caller went away",
                worker_id,
                job.input_path.display()
            ),
        }
    }
    sys_info!("[QUEUE] Worker {} stopped", worker_id);
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::web::filename::NamingContract;
    use crate::web::models::{Resolution, UpscaleModel, UpscaleOptions};
    use std::path::Path;

    fn shell(script: &str) -> ToolCommand {
        ToolCommand {
            program: "sh".to_string(),
            script_args: vec!["-c".to_string(), script.to_string(), "tool".to_string()],
            workdir: None,
            fp32: false,
            naming: NamingContract::default(),
        }
    }

    fn job(dir: &Path, name: &str) -> UpscaleJob {
        UpscaleJob {
            input_path: dir.join(name),
            output_dir: dir.to_path_buf(),
            options: UpscaleOptions {
                model: UpscaleModel::RealEsrganX2Plus,
                resolution: Resolution::X2,
            },
        }
    }

    #[tokio::test]
    async fn test_run_returns_tool_result() {
        let dir = tempfile::tempdir().unwrap();
        let queue = UpscaleQueue::spawn(shell("echo done"), Duration::from_secs(10), 1, 4);
        let output = queue.run(job(dir.path(), "a.png")).await.unwrap();
        assert_eq!(output.stdout.trim(), "done");
        assert_eq!(queue.capacity(), 4);
    }

    #[tokio::test]
    async fn test_single_worker_serializes_jobs() {
        let dir = tempfile::tempdir().unwrap();
        // Each job appends start/end markers; overlapping runs would interleave them.
        let log = dir.path().join("order.log");
        let script = format!(
            "echo start >> '{log}'; sleep 0.2; echo end >> '{log}'",
            log = log.display()
        );
        let queue = UpscaleQueue::spawn(shell(&script), Duration::from_secs(10), 1, 4);

        let (a, b) = tokio::join!(
            queue.run(job(dir.path(), "a.png")),
            queue.run(job(dir.path(), "b.png"))
        );
        a.unwrap();
        b.unwrap();

        let order = std::fs::read_to_string(&log).unwrap();
        assert_eq!(order.lines().collect::<Vec<_>>(), vec!["start", "end", "start", "end"]);
    }

    #[tokio::test]
    async fn test_deadline_includes_queue_wait() {
        let dir = tempfile::tempdir().unwrap();
        let queue = UpscaleQueue::spawn(shell("sleep 5"), Duration::from_millis(500), 1, 4);

        let started = std::time::Instant::now();
        let (a, b, c) = tokio::join!(
            queue.run(job(dir.path(), "a.png")),
            queue.run(job(dir.path(), "b.png")),
            queue.run(job(dir.path(), "c.png"))
        );
        let elapsed = started.elapsed();

        for result in [a, b, c] {
            assert!(matches!(result, Err(AppError::ToolTimeout(_))));
        }
        // All three share one deadline instead of timing out one after another.
        assert!(elapsed < Duration::from_millis(1200), "{elapsed:?}");
    }

    #[tokio::test]
    async fn test_dropped_caller_cancels_job() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("finished");
        let script = format!("sleep 1; touch '{}'", marker.display());
        let queue = UpscaleQueue::spawn(shell(&script), Duration::from_secs(60), 1, 4);

        let abandoned = tokio::time::timeout(
            Duration::from_millis(200),
            queue.run(job(dir.path(), "slow.png")),
        )
        .await;
        assert!(abandoned.is_err());

        // The killed shell never reaches `touch`.
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!marker.exists());
    }
}
