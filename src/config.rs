//! Analysis settings
//!
//! Settings are layered, highest priority first:
//! 1. Command line flags
//! 2. The TOML file named by `--config`
//! 3. Built-in defaults
//!
//! ```toml
//! library_names = ["libcrypto.so", "libssl.so"]
//! baseline_root = "repos/openssl/install"
//! candidate_root = "repos/aws-lc/build"
//! header_dir = "repos/openssl/include/openssl"
//!
//! [consumer]
//! mode = "linked"
//! artifact = "repos/ruby/.ext/x86_64-linux/openssl.so"
//! ```

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::options::Options;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("reading config file {path} failed: {source}", path = .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("config file {path} is not valid: {source}", path = .path.display())]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("no value for `{0}`; set it in the config file or on the command line")]
    Missing(&'static str),
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn default_library_names() -> Vec<String> {
    vec!["libcrypto.so".to_string(), "libssl.so".to_string()]
}

fn default_header_extensions() -> Vec<String> {
    vec![".h".to_string()]
}

fn default_source_extensions() -> Vec<String> {
    vec![".h".to_string(), ".c".to_string()]
}

/// How the consumer's symbol usage is determined
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ConsumerConfig {
    Sources {
        root: PathBuf,
        #[serde(default = "default_source_extensions")]
        extensions: Vec<String>,
    },
    Linked {
        artifact: PathBuf,
    },
}

/// Settings as read from a config file; everything is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub library_names: Option<Vec<String>>,
    pub baseline_root: Option<PathBuf>,
    pub candidate_root: Option<PathBuf>,
    pub header_dir: Option<PathBuf>,
    pub header_extensions: Option<Vec<String>>,
    pub consumer: Option<ConsumerConfig>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Complete, validated settings for one analysis run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// File names of the artifacts that together make up a library
    pub library_names: Vec<String>,
    pub baseline_root: PathBuf,
    pub candidate_root: PathBuf,
    pub header_dir: PathBuf,
    pub header_extensions: Vec<String>,
    pub consumer: ConsumerConfig,
}

impl AnalysisConfig {
    /// Apply command line overrides on top of `file` and validate the result
    pub fn resolve(file: ConfigFile, options: &Options) -> Result<Self, ConfigError> {
        let library_names = if options.libraries.is_empty() {
            file.library_names.unwrap_or_else(default_library_names)
        } else {
            options.libraries.clone()
        };
        if library_names.is_empty() || library_names.iter().any(|n| n.is_empty()) {
            return Err(ConfigError::Invalid {
                field: "library_names",
                reason: "at least one non-empty artifact file name is required".to_string(),
            });
        }

        let header_extensions = file.header_extensions.unwrap_or_else(default_header_extensions);
        if header_extensions.is_empty() {
            return Err(ConfigError::Invalid {
                field: "header_extensions",
                reason: "at least one extension is required".to_string(),
            });
        }

        let consumer = match (&options.consumer_src, &options.consumer_bin) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::Invalid {
                    field: "consumer",
                    reason: "--consumer-src and --consumer-bin are mutually exclusive".to_string(),
                })
            }
            (Some(root), None) => {
                let extensions = match &file.consumer {
                    Some(ConsumerConfig::Sources { extensions, .. }) => extensions.clone(),
                    _ => default_source_extensions(),
                };
                ConsumerConfig::Sources {
                    root: root.clone(),
                    extensions,
                }
            }
            (None, Some(artifact)) => ConsumerConfig::Linked {
                artifact: artifact.clone(),
            },
            (None, None) => file.consumer.ok_or(ConfigError::Missing("consumer"))?,
        };

        Ok(AnalysisConfig {
            library_names,
            baseline_root: options
                .baseline
                .clone()
                .or(file.baseline_root)
                .ok_or(ConfigError::Missing("baseline_root"))?,
            candidate_root: options
                .candidate
                .clone()
                .or(file.candidate_root)
                .ok_or(ConfigError::Missing("candidate_root"))?,
            header_dir: options
                .headers
                .clone()
                .or(file.header_dir)
                .ok_or(ConfigError::Missing("header_dir"))?,
            header_extensions,
            consumer,
        })
    }
}
