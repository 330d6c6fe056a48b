//! Progress file naming and resume resolution.

use std::path::{Path, PathBuf};

use crate::{Result, StorageError};

/// Default progress file name for a lab: `.{lab name lowercased, spaces → _}_progress.json`.
pub fn default_persist_file(lab_name: &str) -> PathBuf {
    PathBuf::from(format!(
        ".{}_progress.json",
        lab_name.to_lowercase().replace(' ', "_")
    ))
}

/// Find a progress file in `dir` when neither a file nor a lab name is given.
///
/// Candidates are hidden `*.json` files. Names ending in `_progress.json`
/// win over other hidden JSON files; ties are broken by name so the choice
/// does not depend on directory listing order.
pub fn discover_progress_file(dir: &Path) -> Result<Option<PathBuf>> {
    let mut candidates: Vec<(bool, String)> = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if name.starts_with('.') && name.ends_with(".json") && entry.path().is_file() {
            candidates.push((!name.ends_with("_progress.json"), name));
        }
    }
    candidates.sort();
    Ok(candidates.into_iter().next().map(|(_, name)| dir.join(name)))
}

/// Resolve which file to resume from.
///
/// An explicit file wins, then the lab name's default file in `dir`, then
/// discovery in `dir`. Fails with [`StorageError::NoProgressFile`] when
/// nothing resolves and [`StorageError::NotFound`] when the resolved path
/// does not exist.
pub fn resolve_progress_file(
    lab_name: Option<&str>,
    persist_file: Option<&Path>,
    dir: &Path,
) -> Result<PathBuf> {
    let path = match (persist_file, lab_name) {
        (Some(file), _) => file.to_path_buf(),
        (None, Some(name)) => dir.join(default_persist_file(name)),
        (None, None) => {
            let found = discover_progress_file(dir)?.ok_or(StorageError::NoProgressFile)?;
            tracing::info!("Found progress file: {}", found.display());
            found
        }
    };

    if !path.exists() {
        return Err(StorageError::NotFound(path.display().to_string()));
    }
    Ok(path)
}
