//! Deleting uploaded and generated images.
//!
//! Deletion failures are logged and swallowed; housekeeping never fails a request.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use super::config::CleanupPolicy;
use super::session::SessionToken;
use super::state::AppState;
use crate::{sys_debug, sys_info, sys_warn};

/// Files belonging to uploads that are still being processed, with a holder count.
#[derive(Debug, Default)]
pub struct InFlight {
    paths: Mutex<HashMap<PathBuf, usize>>,
}

/// Releases its paths when dropped.
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    owner: &'a InFlight,
    paths: Vec<PathBuf>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    fn paths(&self) -> MutexGuard<'_, HashMap<PathBuf, usize>> {
        self.paths.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Protect `paths` from purging until the guard is dropped.
    pub fn hold(&self, paths: Vec<PathBuf>) -> InFlightGuard<'_> {
        let mut held = self.paths();
        for path in &paths {
            *held.entry(path.clone()).or_insert(0) += 1;
        }
        drop(held);
        InFlightGuard { owner: self, paths }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths().contains_key(path)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut held = self.owner.paths();
        for path in &self.paths {
            if let Some(count) = held.get_mut(path) {
                *count -= 1;
                if *count == 0 {
                    held.remove(path);
                }
            }
        }
    }
}

async fn remove_quietly(path: &Path) -> bool {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            sys_debug!("[CLEANUP] Removed {}", path.display());
            true
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            sys_warn!("[CLEANUP] Failed to remove {}: {}", path.display(), e);
            false
        }
    }
}

/// Regular files directly inside `dir` with their modification time.
async fn files_in(dir: &Path) -> Vec<(PathBuf, Option<SystemTime>)> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            sys_warn!("[CLEANUP] Cannot read {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut files = Vec::new();
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                let Ok(metadata) = entry.metadata().await else {
                    continue;
                };
                if metadata.is_file() {
                    files.push((entry.path(), metadata.modified().ok()));
                }
            }
            Ok(None) => break,
            Err(e) => {
                sys_warn!("[CLEANUP] Error while listing {}: {}", dir.display(), e);
                break;
            }
        }
    }
    files
}

/// Delete every file in `dirs` except those `in_flight`. Returns how many were removed.
pub async fn purge_all(dirs: &[&Path], in_flight: &InFlight) -> usize {
    let mut removed = 0;
    for dir in dirs {
        for (path, _) in files_in(dir).await {
            if in_flight.contains(&path) {
                sys_debug!("[CLEANUP] Keeping {} (upload in progress)", path.display());
                continue;
            }
            if remove_quietly(&path).await {
                removed += 1;
            }
        }
    }
    removed
}

/// Delete files in `dirs` last modified more than `max_age` ago.
pub async fn purge_older_than(dirs: &[&Path], max_age: Duration) -> usize {
    let now = SystemTime::now();
    let mut removed = 0;
    for dir in dirs {
        for (path, modified) in files_in(dir).await {
            let age = modified.and_then(|m| now.duration_since(m).ok());
            if age.is_some_and(|age| age > max_age) && remove_quietly(&path).await {
                removed += 1;
            }
        }
    }
    removed
}

pub async fn purge_paths(paths: &[PathBuf], in_flight: &InFlight) -> usize {
    let mut removed = 0;
    for path in paths {
        if !in_flight.contains(path) && remove_quietly(path).await {
            removed += 1;
        }
    }
    removed
}

/// Housekeeping triggered by the home page, an upload or `/cleanup`.
pub async fn apply_policy(state: &AppState, token: &SessionToken) -> usize {
    let removed = match state.config.cleanup_policy {
        CleanupPolicy::Eager => {
            state.sessions.clear();
            purge_all(&state.storage_dirs(), &state.in_flight).await
        }
        CleanupPolicy::Session => purge_paths(&state.sessions.take(token), &state.in_flight).await,
    };
    if removed > 0 {
        sys_info!("[CLEANUP] Removed {} file(s)", removed);
    }
    removed
}

/// One janitor pass: expire idle sessions and age out stale files.
pub async fn sweep(state: &AppState) -> usize {
    let expired = state.sessions.expire(state.config.session_ttl());
    let mut removed = purge_paths(&expired, &state.in_flight).await;
    removed += purge_older_than(&state.storage_dirs(), state.config.max_file_age()).await;
    if removed > 0 {
        sys_info!("[JANITOR] Removed {} stale file(s)", removed);
    }
    removed
}

/// Start the periodic janitor, unless disabled by config.
pub fn spawn_janitor(state: Arc<AppState>) -> Option<JoinHandle<()>> {
    let period = state.config.janitor_interval()?;
    sys_info!("[JANITOR] Sweeping every {}s", period.as_secs());
    Some(tokio::spawn(async move {
        let mut tick = interval(period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        tick.tick().await;
        loop {
            tick.tick().await;
            sweep(&state).await;
        }
    }))
}
