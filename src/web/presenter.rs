// File facts shown on the result page

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::sys_debug;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ImageFacts {
    pub name: String,
    pub size_bytes: u64,
    pub size_label: String,
    /// `WIDTHxHEIGHT`, absent when the header could not be decoded
    pub dimensions: Option<String>,
}

/// Human-readable byte size: `532 B`, `12.3 KB`, `4.56 MB`.
pub fn human_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let value = bytes as f64;
    if value < KB {
        format!("{bytes} B")
    } else if value < MB {
        format!("{:.1} KB", value / KB)
    } else {
        format!("{:.2} MB", value / MB)
    }
}

/// Pixel dimensions from the image header; `None` on any decoding problem.
pub async fn image_dimensions(path: PathBuf) -> Option<(u32, u32)> {
    let result = tokio::task::spawn_blocking(move || image::image_dimensions(&path)).await;
    match result {
        Ok(Ok(dimensions)) => Some(dimensions),
        Ok(Err(e)) => {
            sys_debug!("[RESULT] Dimensions unavailable: {}", e);
            None
        }
        Err(_) => None,
    }
}

/// Describe `dir/name`, or `None` if it is not an existing file.
pub async fn describe(dir: &Path, name: &str) -> Option<ImageFacts> {
    let path = dir.join(name);
    let metadata = tokio::fs::metadata(&path).await.ok()?;
    if !metadata.is_file() {
        return None;
    }
    let dimensions = image_dimensions(path)
        .await
        .map(|(width, height)| format!("{width}x{height}"));
    Some(ImageFacts {
        name: name.to_string(),
        size_bytes: metadata.len(),
        size_label: human_size(metadata.len()),
        dimensions,
    })
}
