use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Default, Parser)]
#[clap(
    version = "1.0",
    about = "Report the dynamic symbols a consumer needs from a baseline library that a candidate library does not define"
)]
pub struct Options {
    #[clap(help = "TOML file providing any of the settings below", long = "config", value_parser)]
    pub config: Option<PathBuf>,
    #[clap(
        help = "Baseline library artifact, or a directory searched for the library artifacts",
        long = "baseline",
        value_parser
    )]
    pub baseline: Option<PathBuf>,
    #[clap(
        help = "Candidate library artifact, or a directory searched for the library artifacts",
        long = "candidate",
        value_parser
    )]
    pub candidate: Option<PathBuf>,
    #[clap(help = "Directory holding the baseline library's headers", long = "headers", value_parser)]
    pub headers: Option<PathBuf>,
    #[clap(
        help = "File name of a library artifact (repeatable, e.g. libcrypto.so)",
        long = "library",
        value_parser
    )]
    pub libraries: Vec<String>,
    #[clap(help = "Scan the consumer's source tree for symbol usage", long = "consumer-src", value_parser)]
    pub consumer_src: Option<PathBuf>,
    #[clap(help = "Read symbol usage from the consumer's compiled artifact", long = "consumer-bin", value_parser)]
    pub consumer_bin: Option<PathBuf>,
    #[clap(help = "Print the report as a table", long = "table", action)]
    pub table: bool,
    #[clap(help = "Log progress at debug level", short = 'v', long = "verbose", action)]
    pub verbose: bool,
    #[clap(help = "Only log errors", short = 'q', long = "quiet", action)]
    pub quiet: bool,
}
