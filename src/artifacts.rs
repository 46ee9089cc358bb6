use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{AnalysisError, AnalysisResult};

fn walk_files(root: &Path, op: &'static str) -> AnalysisResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(|e| AnalysisError::io(op, root, io::Error::from(e)))?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Locate the compiled artifacts that make up a library
///
/// `root` is either one artifact, or a directory searched recursively for
/// files whose name is exactly one of `library_names` (so `libcrypto.so`
/// matches but `libcrypto.so.3` does not). The result is in path order.
pub fn find_library_artifacts(root: &Path, library_names: &[String]) -> AnalysisResult<Vec<PathBuf>> {
    const OP: &str = "locating library artifacts";

    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }

    let artifacts: Vec<PathBuf> = walk_files(root, OP)?
        .into_iter()
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map_or(false, |name| library_names.iter().any(|lib| lib == name))
        })
        .collect();

    if artifacts.is_empty() {
        return Err(AnalysisError::io(
            OP,
            root,
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("none of {} found", library_names.join(", ")),
            ),
        ));
    }

    for artifact in &artifacts {
        debug!(path = %artifact.display(), "found library artifact");
    }
    Ok(artifacts)
}

/// Recursively collect the files under `root` whose names end with one of `extensions`
pub fn collect_files(root: &Path, extensions: &[String]) -> AnalysisResult<Vec<PathBuf>> {
    const OP: &str = "collecting files";

    if !root.is_dir() {
        return Err(AnalysisError::io(
            OP,
            root,
            io::Error::new(io::ErrorKind::NotFound, "not a directory"),
        ));
    }

    let files: Vec<PathBuf> = walk_files(root, OP)?
        .into_iter()
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map_or(false, |name| extensions.iter().any(|ext| name.ends_with(ext.as_str())))
        })
        .collect();
    debug!(root = %root.display(), count = files.len(), "collected files");
    Ok(files)
}
