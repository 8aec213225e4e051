// Locating the tool's output file after a successful run

use std::io;
use std::path::{Path, PathBuf};

use super::filename::{split_name, NamingContract};
use crate::sys_warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovery {
    /// The file named by the naming contract exists.
    Exact(PathBuf),
    /// The contract was not honoured, but a file containing the input's base name was found.
    Fallback(PathBuf),
    /// Nothing matched; `listing` is the output directory's contents for diagnostics.
    Missing { listing: Vec<String> },
}

impl Discovery {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Discovery::Exact(path) | Discovery::Fallback(path) => Some(path),
            Discovery::Missing { .. } => None,
        }
    }
}

/// Sorted names of the regular files in `dir`.
pub async fn list_dir(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        if is_file {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Find the output produced for `input_name` in `output_dir`.
///
/// The contract name wins. Otherwise the first (by name) file containing the
/// input's base name is used and a warning is logged, since that means the
/// tool and the contract disagree.
pub async fn discover_output(
    output_dir: &Path,
    naming: &NamingContract,
    input_name: &str,
) -> io::Result<Discovery> {
    let expected = output_dir.join(naming.output_name(input_name));
    if tokio::fs::metadata(&expected)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
    {
        return Ok(Discovery::Exact(expected));
    }

    let (base, _) = split_name(input_name);
    let listing = list_dir(output_dir).await?;
    match listing.iter().find(|name| name.contains(base)) {
        Some(name) => {
            sys_warn!(
                "[DISCOVERY] Expected {} but found {}; check the tool's --suffix handling",
                expected.display(),
                name
            );
            Ok(Discovery::Fallback(output_dir.join(name)))
        }
        None => Ok(Discovery::Missing { listing }),
    }
}
