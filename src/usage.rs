use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{AnalysisError, AnalysisResult};
use crate::symbol_table::{load_symbol_set, SymbolMode, SymbolSet};
use crate::token;

/// Where the consumer's symbol usage is read from
#[derive(Debug, Clone)]
pub enum UsageSource {
    /// Approximate: token-bounded occurrences of candidate names in source text
    TextScan(Vec<PathBuf>),
    /// Exact: the dynamic symbol table of the consumer's own compiled artifact
    Linked(PathBuf),
}

impl UsageSource {
    /// The symbols the consumer uses
    ///
    /// `candidates` bounds what a text scan looks for. The linked scan reports
    /// every symbol the artifact references; callers intersect with the
    /// baseline themselves.
    pub fn extract(&self, candidates: &SymbolSet) -> AnalysisResult<BTreeSet<String>> {
        match self {
            UsageSource::TextScan(files) => text_scan(files, candidates),
            UsageSource::Linked(artifact) => Ok(linked_scan(artifact)?.names().clone()),
        }
    }
}

/// Add to `found` every candidate name that occurs in `text` as a whole identifier
///
/// Names made of identifier characters are matched against the identifier
/// spans of the text, which is equivalent to a substring search whose
/// neighbours must both be boundaries. Any other name falls back to that
/// substring search.
pub fn scan_text(text: &str, candidates: &SymbolSet, found: &mut BTreeSet<String>) {
    let spans = token::identifier_set(text);
    for name in candidates.names() {
        if found.contains(name) {
            continue;
        }
        let hit = if token::is_identifier(name) {
            spans.contains(name.as_str())
        } else {
            token::bounded_occurrences(text, name).next().is_some()
        };
        if hit {
            found.insert(name.clone());
        }
    }
}

/// Scan every file's text for candidate names
pub fn text_scan(files: &[PathBuf], candidates: &SymbolSet) -> AnalysisResult<BTreeSet<String>> {
    let mut found = BTreeSet::new();
    for file in files {
        let bytes = fs::read(file).map_err(|e| AnalysisError::io("reading consumer source", file, e))?;
        let text = String::from_utf8_lossy(&bytes);
        let before = found.len();
        scan_text(&text, candidates, &mut found);
        debug!(path = %file.display(), new = found.len() - before, "scanned consumer source");
    }
    info!(files = files.len(), used = found.len(), "text scan complete");
    Ok(found)
}

/// Every symbol in the consumer artifact's dynamic symbol table
pub fn linked_scan(artifact: &Path) -> AnalysisResult<SymbolSet> {
    let set = load_symbol_set(artifact, SymbolMode::All)?;
    info!(path = %artifact.display(), used = set.len(), "linked scan complete");
    Ok(set)
}
