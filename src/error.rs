use std::path::{Path, PathBuf};

/// Errors that abort an analysis run
///
/// Every variant names the file involved and the operation that was being
/// performed on it.
#[derive(thiserror::Error, Debug)]
pub enum AnalysisError {
    #[error("{op} failed for {path}: {source}", path = .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{op} failed for {path}: {reason}", path = .path.display())]
    Format {
        op: &'static str,
        path: PathBuf,
        reason: String,
    },
    #[error("parsing header {path} failed: {reason}", path = .path.display())]
    Parse { path: PathBuf, reason: String },
}

impl AnalysisError {
    pub fn io(op: &'static str, path: &Path, source: std::io::Error) -> Self {
        AnalysisError::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn format(op: &'static str, path: &Path, reason: impl ToString) -> Self {
        AnalysisError::Format {
            op,
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn parse(path: &Path, reason: impl ToString) -> Self {
        AnalysisError::Parse {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
