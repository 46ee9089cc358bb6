use std::collections::BTreeSet;
use tracing::{debug, error, info, warn};

use crate::artifacts::{collect_files, find_library_artifacts};
use crate::config::{AnalysisConfig, ConsumerConfig};
use crate::error::AnalysisResult;
use crate::header_index::{DeclarationIndex, Lookup};
use crate::render::render;
use crate::report::{GapReport, ReportEntry, Resolution};
use crate::symbol_table::{load_library_symbols, SymbolMode, SymbolSet};
use crate::usage::UsageSource;

/// Pipeline progress; each stage is only reached after the previous one succeeded
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Pending,
    SymbolsLoaded,
    UsageComputed,
    GapComputed,
    DeclarationsResolved,
    Reported,
}

/// Consumer symbols that belong to the baseline library
///
/// Anything the consumer uses from elsewhere (the C runtime, other
/// libraries) is dropped.
pub fn used_baseline_symbols(source: &UsageSource, baseline: &SymbolSet) -> AnalysisResult<BTreeSet<String>> {
    let used = SymbolSet::from_names(SymbolMode::All, source.extract(baseline)?);
    Ok(baseline.intersection(&used))
}

/// Used symbols the candidate does not define
pub fn missing_symbols(used: &BTreeSet<String>, candidate: &SymbolSet) -> BTreeSet<String> {
    SymbolSet::from_names(SymbolMode::All, used.iter().cloned()).difference(candidate)
}

/// Resolve one symbol against the header declarations
pub fn resolve_symbol(name: &str, index: &DeclarationIndex) -> Resolution {
    match index.lookup(name) {
        Lookup::Structured(found) => match render(&found.declaration) {
            Ok(text) => Resolution::Rendered(text),
            Err(error) => {
                warn!(symbol = name, %error, "declaration cannot be rendered");
                Resolution::Unrenderable {
                    locus: found.locus.clone(),
                    error,
                }
            }
        },
        Lookup::Unstructured(locus) => {
            debug!(symbol = name, %locus, "only found as raw text");
            Resolution::Unstructured(locus)
        }
        Lookup::NotFound => {
            debug!(symbol = name, "not found in headers");
            Resolution::NotFound
        }
    }
}

pub fn resolve_missing(missing: &BTreeSet<String>, index: &DeclarationIndex) -> GapReport {
    GapReport::new(
        missing
            .iter()
            .map(|name| ReportEntry {
                symbol: name.clone(),
                resolution: resolve_symbol(name, index),
            })
            .collect(),
    )
}

pub struct GapAnalyzer {
    config: AnalysisConfig,
    stage: Stage,
}

impl GapAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        GapAnalyzer {
            config,
            stage: Stage::Pending,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn advance(&mut self, next: Stage) {
        debug_assert!(next > self.stage, "pipeline stages must run in order");
        self.stage = next;
        debug!(stage = ?next, "pipeline stage complete");
    }

    fn library_symbols(&self, root: &std::path::Path) -> AnalysisResult<SymbolSet> {
        let artifacts = find_library_artifacts(root, &self.config.library_names)?;
        load_library_symbols(&artifacts, SymbolMode::DefinedOnly)
    }

    fn usage_source(&self) -> AnalysisResult<UsageSource> {
        match &self.config.consumer {
            ConsumerConfig::Sources { root, extensions } => {
                Ok(UsageSource::TextScan(collect_files(root, extensions)?))
            }
            ConsumerConfig::Linked { artifact } => Ok(UsageSource::Linked(artifact.clone())),
        }
    }

    /// Run the whole pipeline
    ///
    /// The first error ends the run; no partial report is produced.
    pub fn run(&mut self) -> AnalysisResult<GapReport> {
        let res = self.run_stages();
        if let Err(err) = &res {
            error!(stage = ?self.stage(), error = %err, "analysis aborted");
        }
        res
    }

    fn run_stages(&mut self) -> AnalysisResult<GapReport> {
        let baseline = self.library_symbols(&self.config.baseline_root)?;
        let candidate = self.library_symbols(&self.config.candidate_root)?;
        self.advance(Stage::SymbolsLoaded);

        let used = used_baseline_symbols(&self.usage_source()?, &baseline)?;
        self.advance(Stage::UsageComputed);

        let missing = missing_symbols(&used, &candidate);
        self.advance(Stage::GapComputed);

        let headers = collect_files(&self.config.header_dir, &self.config.header_extensions)?;
        let index = DeclarationIndex::build(&headers)?;
        let report = resolve_missing(&missing, &index);
        self.advance(Stage::DeclarationsResolved);

        info!(
            baseline = baseline.len(),
            candidate = candidate.len(),
            used = used.len(),
            missing = missing.len(),
            resolved = report.resolved_count(),
            "gap analysis complete"
        );
        if report.is_empty() {
            info!("candidate defines every baseline symbol the consumer uses");
        }
        self.advance(Stage::Reported);
        Ok(report)
    }
}
