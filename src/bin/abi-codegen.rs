use std::path::{Path, PathBuf};
use std::process::ExitCode;

use abi_codegen::config::{DEFAULT_IMPORT_PATH, DEFAULT_INPUT, DEFAULT_OUT_DIR};
use abi_codegen::{generate, load_manifest_from_path, resolve_client_name, ClientConfig, Manifest};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "ABI_CODEGEN_LOG";

/// Validates a WASM-ABI v1 manifest and generates a typed TypeScript client.
#[derive(Debug, Parser)]
#[command(name = "abi-codegen", version, about)]
struct Cli {
    /// Input ABI JSON file.
    #[arg(short, long, default_value = DEFAULT_INPUT)]
    input: PathBuf,

    /// Output directory for generated files.
    #[arg(short, long = "out-dir", visible_alias = "outDir", default_value = DEFAULT_OUT_DIR)]
    out_dir: PathBuf,

    /// Client class name (default: derived from --name-from or the input file).
    #[arg(long)]
    client_name: Option<String>,

    /// Derive the client name from this path, e.g. the compiled wasm file.
    #[arg(long)]
    name_from: Option<String>,

    /// Module to import CalimeroApp and Context from.
    #[arg(long, default_value = DEFAULT_IMPORT_PATH)]
    import_path: String,

    /// Validate the manifest only; no code generation.
    #[arg(long)]
    validate: bool,

    /// Enable debug logging on stderr.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "abi_codegen=debug"
    } else {
        "abi_codegen=warn"
    };
    let filter = std::env::var(LOG_ENV).unwrap_or_else(|_| default_filter.to_string());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(EnvFilter::new(filter));

    if tracing_subscriber::registry()
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        eprintln!("warning: tracing subscriber already initialized");
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    if !cli.input.exists() {
        return Err(format!(
            "Error: ABI file not found at {}",
            cli.input.display()
        ));
    }

    if cli.validate {
        return run_validate(&cli.input);
    }
    run_generate(cli)
}

fn run_validate(input: &Path) -> Result<(), String> {
    let manifest =
        load_manifest_from_path(input).map_err(|err| format!("Validation failed: {err}"))?;

    println!("ABI manifest validated successfully");
    print_summary(&manifest);
    Ok(())
}

fn run_generate(cli: &Cli) -> Result<(), String> {
    let input = cli.input.to_string_lossy();
    let client_name = resolve_client_name(
        cli.client_name.as_deref(),
        cli.name_from.as_deref(),
        &input,
    );
    debug!(client = %client_name, "resolved client name");
    let config = ClientConfig::new(client_name).with_import_path(cli.import_path.clone());

    let manifest = load_manifest_from_path(&cli.input)
        .map_err(|err| format!("Code generation failed: {err}"))?;
    let files =
        generate(&manifest, &config).map_err(|err| format!("Code generation failed: {err}"))?;
    let paths = files
        .write_to(&cli.out_dir, &config)
        .map_err(|err| format!("Code generation failed: {err}"))?;

    println!("Code generation completed successfully");
    print_summary(&manifest);
    println!("  Client: {}", config.client_name());
    println!("Generated files:");
    println!("  {}", paths.types.display());
    println!("  {}", paths.client.display());
    Ok(())
}

fn print_summary(manifest: &Manifest) {
    println!("Summary:");
    println!("  Methods: {}", manifest.methods().len());
    println!("  Events: {}", manifest.events().len());
    println!("  Types: {}", manifest.type_count());
}
