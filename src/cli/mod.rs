use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod config;
mod convert;
mod validate;

pub use config::Config;

/// isa-convert - convert and validate ISA-Tab and ISA-JSON metadata
#[derive(Parser)]
#[command(name = "isa-convert")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a tabular directory to a JSON document
    ConvertTabularToDocument {
        /// Directory holding i_*.txt and its tables
        #[arg(value_name = "DIR")]
        input: PathBuf,

        /// Output JSON file (standard output when omitted)
        #[arg(value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Load settings from a TOML config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Convert a JSON document to a tabular directory
    ConvertDocumentToTabular {
        /// Input JSON file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output directory, created when missing
        #[arg(value_name = "DIR")]
        output: PathBuf,

        /// Load settings from a TOML config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Validate a tabular directory or a JSON document
    Validate {
        /// Directory, investigation file or JSON document
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

pub fn dispatch(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::ConvertTabularToDocument {
            input,
            output,
            config,
        } => convert::tabular_to_document(input, output, config).map(|()| ExitCode::SUCCESS),
        Commands::ConvertDocumentToTabular {
            input,
            output,
            config,
        } => convert::document_to_tabular(input, output, config).map(|()| ExitCode::SUCCESS),
        Commands::Validate { path } => validate::run(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [tabular]
            max_paths = 5000
            write_factor_values_in_assays = true

            [document]
            pretty = false
        "#;

        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.tabular.max_paths, 5000);
        assert!(config.tabular.write_factor_values_in_assays);
        assert!(!config.document.pretty);
    }

    #[test]
    fn test_partial_config() {
        let toml = r#"
            [tabular]
            write_factor_values_in_assays = true
        "#;

        let config = Config::from_str(toml).unwrap();
        assert!(config.tabular.write_factor_values_in_assays);
        assert_eq!(config.tabular.max_paths, isa::model::DEFAULT_MAX_PATHS);
        assert!(config.document.pretty);
    }

    #[test]
    fn test_empty_config() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.tabular, isa::isatab::TabularWriterConfig::default());
    }

    #[test]
    fn test_invalid_value_is_rejected() {
        assert!(Config::from_str("[tabular]\nmax_paths = \"many\"\n").is_err());
    }

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["isa-convert", "-vv", "validate", "study_dir"]).unwrap();
        assert_eq!(cli.verbosity(), 2);
        assert!(matches!(cli.command, Commands::Validate { .. }));

        let cli = Cli::try_parse_from([
            "isa-convert",
            "convert-document-to-tabular",
            "inv.json",
            "out",
            "--config",
            "isa.toml",
        ])
        .unwrap();
        match cli.command {
            Commands::ConvertDocumentToTabular { config, .. } => {
                assert_eq!(config, Some(PathBuf::from("isa.toml")))
            }
            _ => panic!("wrong subcommand"),
        }

        let err = Cli::try_parse_from(["isa-convert", "convert-tabular-to-document"])
            .err()
            .unwrap();
        assert_eq!(err.exit_code(), 2);
    }
}
