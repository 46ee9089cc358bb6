use std::cmp::Ordering;
use std::fmt;
use term_table::row;

use crate::header_index::RawLocus;
use crate::render::RenderError;

/// What the declaration index could say about one missing symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Found structurally and rendered
    Rendered(String),
    /// Found structurally, but its shape cannot be rendered
    Unrenderable { locus: RawLocus, error: RenderError },
    /// Only found as text in a header
    Unstructured(RawLocus),
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub symbol: String,
    pub resolution: Resolution,
}

impl ReportEntry {
    pub fn is_resolved(&self) -> bool {
        matches!(self.resolution, Resolution::Rendered(_))
    }

    fn status(&self) -> &'static str {
        match self.resolution {
            Resolution::Rendered(_) => "resolved",
            Resolution::Unrenderable { .. } => "unrenderable",
            Resolution::Unstructured(_) => "unstructured",
            Resolution::NotFound => "not found",
        }
    }

    fn detail(&self) -> String {
        match &self.resolution {
            Resolution::Rendered(text) => text.clone(),
            Resolution::Unrenderable { locus, error } => format!("{} ({})", locus, error),
            Resolution::Unstructured(locus) => locus.to_string(),
            Resolution::NotFound => String::new(),
        }
    }
}

impl fmt::Display for ReportEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.resolution {
            // A declaration without a type renders empty
            Resolution::Rendered(text) if text.is_empty() => write!(f, "{}", self.symbol),
            Resolution::Rendered(text) => write!(f, "{}", text),
            Resolution::Unrenderable { locus, error } => {
                write!(f, "SYMBOL NOT RENDERABLE: {} :: {} ({})", self.symbol, locus, error)
            }
            Resolution::Unstructured(locus) => {
                write!(f, "SYMBOL NOT FOUND IN PARSER: {} :: {}", self.symbol, locus)
            }
            Resolution::NotFound => write!(f, "SYMBOL NOT FOUND IN PARSER: {} :: ", self.symbol),
        }
    }
}

/// Case-insensitive name order; exact byte order breaks ties so that
/// names differing only in case always come out the same way
fn symbol_order(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// The symbols a consumer needs from the baseline that the candidate lacks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GapReport {
    entries: Vec<ReportEntry>,
}

impl GapReport {
    /// Order entries: resolved first, then unresolved, each group by name
    pub fn new(mut entries: Vec<ReportEntry>) -> Self {
        entries.sort_by(|a, b| {
            b.is_resolved()
                .cmp(&a.is_resolved())
                .then_with(|| symbol_order(&a.symbol, &b.symbol))
        });
        GapReport { entries }
    }

    #[cfg(test)]
    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn resolved_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_resolved()).count()
    }

    /// One line per entry
    pub fn render_lines(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&entry.to_string());
            out.push('\n');
        }
        out
    }

    pub fn render_table(&self) -> String {
        let mut table = term_table::Table::new();
        table.add_row(row::Row::new(vec!["Symbol", "Status", "Detail"]));
        for entry in &self.entries {
            table.add_row(row::Row::new(vec![
                entry.symbol.clone(),
                entry.status().to_string(),
                entry.detail(),
            ]));
        }
        table.render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn entry(symbol: &str, resolution: Resolution) -> ReportEntry {
        ReportEntry {
            symbol: symbol.to_string(),
            resolution,
        }
    }

    fn locus(line: usize) -> RawLocus {
        RawLocus {
            path: PathBuf::from("include/openssl/x509.h"),
            line,
        }
    }

    #[test]
    fn ordering_ignores_case() {
        let report = GapReport::new(vec![
            entry("Zeta", Resolution::NotFound),
            entry("alpha", Resolution::NotFound),
        ]);
        let names: Vec<_> = report.entries().iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(names, vec!["alpha", "Zeta"]);
    }

    #[test]
    fn case_only_differences_break_ties_deterministically() {
        let a = GapReport::new(vec![
            entry("bio_new", Resolution::NotFound),
            entry("BIO_new", Resolution::NotFound),
        ]);
        let b = GapReport::new(vec![
            entry("BIO_new", Resolution::NotFound),
            entry("bio_new", Resolution::NotFound),
        ]);
        assert_eq!(a, b);
        assert_eq!(a.entries()[0].symbol, "BIO_new");
    }

    #[test]
    fn resolved_entries_come_first() {
        let report = GapReport::new(vec![
            entry("aaa", Resolution::NotFound),
            entry("zzz", Resolution::Rendered("int zzz() { return 0; }".to_string())),
            entry("mmm", Resolution::Unstructured(locus(7))),
            entry(
                "bbb",
                Resolution::Unrenderable {
                    locus: locus(3),
                    error: RenderError::FunctionPointer("cb".to_string()),
                },
            ),
        ]);
        assert_eq!(report.resolved_count(), 1);
        assert_eq!(
            report.render_lines(),
            "int zzz() { return 0; }\n\
             SYMBOL NOT FOUND IN PARSER: aaa :: \n\
             SYMBOL NOT RENDERABLE: bbb :: include/openssl/x509.h:3 (`cb` has a function pointer type)\n\
             SYMBOL NOT FOUND IN PARSER: mmm :: include/openssl/x509.h:7\n"
        );
    }

    #[test]
    fn untyped_declarations_print_their_name() {
        let e = entry("NID_sha1", Resolution::Rendered(String::new()));
        assert_eq!(e.to_string(), "NID_sha1");
    }

    #[test]
    fn table_lists_every_entry() {
        let report = GapReport::new(vec![
            entry("BIO_new", Resolution::Rendered("BIO* BIO_new(const BIO_METHOD* type) { return 0; }".to_string())),
            entry("ERR_load_crypto_strings", Resolution::NotFound),
        ]);
        let table = report.render_table();
        assert!(table.contains("Status"));
        assert!(table.contains("BIO_new"));
        assert!(table.contains("ERR_load_crypto_strings"));
        assert!(table.contains("not found"));
    }

    #[test]
    fn empty_report_prints_nothing() {
        let report = GapReport::new(Vec::new());
        assert!(report.is_empty());
        assert_eq!(report.render_lines(), "");
    }
}
