//! Cuantizar CLI
//!
//! # Usage
//!
//! ```bash
//! # List operators
//! cuantizar ops
//!
//! # Validate a pipeline config (and build its operators)
//! cuantizar validate pipeline.yaml --build
//!
//! # Calibrate on sample data and save the state
//! cuantizar calibrate pipeline.yaml --samples samples.json --output state.json
//!
//! # Run a calibrated pipeline
//! cuantizar run state.json --input input.json
//! ```

use clap::Parser;
use cuantizar::config::{build_pipeline, load_config, CalibrateArgs, Cli, Command, RunArgs, ValidateArgs};
use cuantizar::io::{load_pipeline, load_tensor, save_pipeline, ModelFormat, SaveConfig};
use cuantizar::ops::registered_ops;
use cuantizar::quant::TensorData;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let result = match cli.command {
        Command::Ops => run_ops(),
        Command::Validate(args) => run_validate(args),
        Command::Calibrate(args) => run_calibrate(args),
        Command::Run(args) => run_run(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    let level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_ops() -> Result<(), String> {
    let ops = registered_ops().map_err(|e| e.to_string())?;
    for op in ops {
        let inputs: Vec<String> = op
            .schema
            .inputs
            .iter()
            .map(|i| if i.required { format!("{}*", i.name) } else { i.name.to_string() })
            .collect();
        let attrs: Vec<String> = op
            .schema
            .attrs
            .iter()
            .map(|a| format!("{}={}", a.name, a.default))
            .collect();

        println!(
            "{:<12} inputs: {:<14} attrs: {}",
            op.tag,
            inputs.join(", "),
            if attrs.is_empty() { "-".to_string() } else { attrs.join(", ") }
        );
    }
    Ok(())
}

fn run_validate(args: ValidateArgs) -> Result<(), String> {
    tracing::info!("Validating config: {}", args.config.display());

    let spec = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;

    if args.build {
        build_pipeline(&spec).map_err(|e| format!("Build error: {e}"))?;
    }

    println!("Configuration is valid");
    println!("  Input bits: {}", spec.input_n_bits);
    for (index, layer) in spec.layers.iter().enumerate() {
        println!(
            "  [{index}] {} ({} bits)",
            layer.op,
            layer.effective_n_bits(spec.n_bits)
        );
    }
    Ok(())
}

fn run_calibrate(args: CalibrateArgs) -> Result<(), String> {
    let spec = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;
    let mut pipeline = build_pipeline(&spec).map_err(|e| format!("Build error: {e}"))?;

    let samples = load_tensor(&args.samples).map_err(|e| format!("Samples error: {e}"))?;
    tracing::info!(shape = ?samples.shape(), "calibrating on samples");

    pipeline
        .calibrate(&samples)
        .map_err(|e| format!("Calibration error: {e}"))?;

    let format = ModelFormat::from_path(&args.output).unwrap_or(ModelFormat::Json);
    let config = SaveConfig::new(format).with_pretty(!args.compact);
    save_pipeline(&pipeline, &args.output, &config).map_err(|e| format!("Save error: {e}"))?;

    println!("Calibrated pipeline saved to {}", args.output.display());
    Ok(())
}

fn run_run(args: RunArgs) -> Result<(), String> {
    let pipeline = load_pipeline(&args.state).map_err(|e| format!("State error: {e}"))?;
    let input = load_tensor(&args.input).map_err(|e| format!("Input error: {e}"))?;

    let q_input = pipeline
        .quantize_input(input)
        .map_err(|e| format!("Input error: {e}"))?;
    let output = pipeline
        .apply(&q_input)
        .map_err(|e| format!("Run error: {e}"))?;

    let report = serde_json::json!({
        "output": TensorData::from_array(&output.dequant()),
        "quantized": output,
    });
    let text = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
    println!("{text}");
    Ok(())
}
