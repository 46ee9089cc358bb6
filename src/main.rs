mod artifacts;
mod config;
mod declaration;
mod error;
#[cfg(test)]
mod fixtures;
mod gap;
mod header_index;
mod options;
mod render;
mod report;
mod symbol_table;
mod token;
mod usage;

use clap::Parser;

use crate::config::{AnalysisConfig, ConfigFile};

fn init_tracing(quiet: bool, verbose: bool) -> anyhow::Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("ABI_GAPR_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    // The report owns stdout
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = options::Options::parse();
    init_tracing(args.quiet, args.verbose)?;

    let file = match &args.config {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::default(),
    };
    let config = AnalysisConfig::resolve(file, &args)?;

    let report = gap::GapAnalyzer::new(config).run()?;
    if args.table {
        println!("{}", report.render_table());
    } else {
        print!("{}", report.render_lines());
    }
    Ok(())
}
