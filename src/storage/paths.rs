//! Relative hyperlinks between generated files.
//!
//! Links are computed from the file that holds the link to the file it points
//! at:
//!
//! - `a/b/c.html` → `a/b/d.html` gives `d.html`
//! - `a/b/c.html` → `a/e/d.html` gives `../e/d.html`
//! - a `from` without an extension is taken to be a directory

use std::{
    io,
    path::{Component, Path, PathBuf},
};

/// Errors raised while computing a relative path.
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// A path could not be made absolute.
    #[error("cannot resolve '{path}': {source}")]
    Resolve {
        /// The offending path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The two paths share no root, e.g. they are on different drives.
    #[error("'{from}' and '{to}' share no common root")]
    NoCommonRoot {
        /// Base directory.
        from: PathBuf,
        /// Target.
        to: PathBuf,
    },
}

/// The path of `to` relative to `from`, with forward slashes.
///
/// Returns an empty string when either side is empty or the path cannot be
/// computed; the latter is logged.
#[must_use]
pub fn relative_path(from: &Path, to: &Path) -> String {
    if from.as_os_str().is_empty() || to.as_os_str().is_empty() {
        return String::new();
    }

    match try_relative_path(from, to) {
        Ok(path) => path,
        Err(e) => {
            tracing::warn!(
                "cannot link '{}' to '{}': {e}",
                from.display(),
                to.display()
            );
            String::new()
        }
    }
}

/// The path of `to` relative to `from`.
///
/// # Errors
///
/// Returns an error if either path cannot be made absolute or the two share
/// no root.
pub fn try_relative_path(from: &Path, to: &Path) -> Result<String, PathError> {
    let base = if from.extension().is_some() {
        from.parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    } else {
        from
    };

    let base = resolve(base)?;
    let target = resolve(to)?;

    let base_parts: Vec<Component> = base.components().collect();
    let target_parts: Vec<Component> = target.components().collect();

    let common = base_parts
        .iter()
        .zip(&target_parts)
        .take_while(|(a, b)| a == b)
        .count();
    if common == 0 {
        return Err(PathError::NoCommonRoot {
            from: base,
            to: target,
        });
    }

    let parts: Vec<String> = std::iter::repeat_n("..".to_string(), base_parts.len() - common)
        .chain(
            target_parts[common..]
                .iter()
                .map(|c| c.as_os_str().to_string_lossy().into_owned()),
        )
        .collect();

    if parts.is_empty() {
        return Ok(".".to_string());
    }
    Ok(parts.join("/"))
}

fn resolve(path: &Path) -> Result<PathBuf, PathError> {
    let absolute = std::path::absolute(path).map_err(|source| PathError::Resolve {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(normalize(&absolute))
}

/// Drops `.` segments and collapses `..` segments without touching the
/// filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}
