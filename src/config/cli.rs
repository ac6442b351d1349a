//! CLI argument parsing
//!
//! # Usage
//!
//! ```bash
//! cuantizar ops
//! cuantizar validate pipeline.yaml
//! cuantizar calibrate pipeline.yaml --samples samples.json --output pipeline.state.json
//! cuantizar run pipeline.state.json --input input.json
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Cuantizar: quantized operators with integer-domain Gemm
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "cuantizar")]
#[command(version)]
#[command(about = "Calibrate and run quantized operator pipelines")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// List registered operators with their inputs and attributes
    Ops,

    /// Validate a pipeline configuration file
    Validate(ValidateArgs),

    /// Calibrate a pipeline on sample data and save its state
    Calibrate(CalibrateArgs),

    /// Run a calibrated pipeline on an input tensor
    Run(RunArgs),
}

/// Arguments for the validate command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ValidateArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Build every operator, not only check the file
    #[arg(short, long)]
    pub build: bool,
}

/// Arguments for the calibrate command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct CalibrateArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// JSON `{shape, data}` tensor of calibration samples
    #[arg(short, long)]
    pub samples: PathBuf,

    /// Output path for the calibrated state (.json or .yaml)
    #[arg(short, long)]
    pub output: PathBuf,

    /// Write compact JSON
    #[arg(long)]
    pub compact: bool,
}

/// Arguments for the run command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct RunArgs {
    /// Path to a calibrated pipeline state
    #[arg(value_name = "STATE")]
    pub state: PathBuf,

    /// JSON `{shape, data}` input tensor
    #[arg(short, long)]
    pub input: PathBuf,
}

/// Parse command-line arguments
pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ops_command() {
        let cli = parse_args(["cuantizar", "ops"]).unwrap();
        assert_eq!(cli.command, Command::Ops);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_parse_validate_command() {
        let cli = parse_args(["cuantizar", "validate", "pipeline.yaml", "--build"]).unwrap();
        match cli.command {
            Command::Validate(args) => {
                assert_eq!(args.config, PathBuf::from("pipeline.yaml"));
                assert!(args.build);
            }
            _ => panic!("Expected Validate command"),
        }
    }

    #[test]
    fn test_parse_calibrate_command() {
        let cli = parse_args([
            "cuantizar",
            "calibrate",
            "pipeline.yaml",
            "--samples",
            "samples.json",
            "-o",
            "state.yaml",
        ])
        .unwrap();
        match cli.command {
            Command::Calibrate(args) => {
                assert_eq!(args.samples, PathBuf::from("samples.json"));
                assert_eq!(args.output, PathBuf::from("state.yaml"));
                assert!(!args.compact);
            }
            _ => panic!("Expected Calibrate command"),
        }
    }

    #[test]
    fn test_calibrate_requires_output() {
        let result = parse_args(["cuantizar", "calibrate", "pipeline.yaml", "-s", "x.json"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_run_with_global_flags() {
        let cli = parse_args(["cuantizar", "run", "state.json", "-i", "x.json", "-q"]).unwrap();
        assert!(cli.quiet);
        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.state, PathBuf::from("state.json"));
                assert_eq!(args.input, PathBuf::from("x.json"));
            }
            _ => panic!("Expected Run command"),
        }
    }
}
