//! Zod Type Extraction CLI
//!
//! Generates `<name>.types.ts` declaration files next to Zod schema sources.
//!
//! Usage:
//!   zod-extract src/schemas --remove-suffix Schema --unify
//!   zod-extract "src/**/*.ts" --check
//!   zod-extract --help

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use zod_extract::{generate, resolve_files, ExtractConfig, ExtractError, Generation, OutputTemplate};

#[derive(Parser)]
#[command(name = "zod-extract")]
#[command(about = "Extract input/output type declarations from Zod schemas")]
#[command(version)]
struct Cli {
    /// Files, directories or glob patterns to scan
    patterns: Vec<String>,

    /// Configuration file (default: zod-extract.toml in the current directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// tsconfig.json used to resolve non-relative imports
    #[arg(long)]
    tsconfig: Option<PathBuf>,

    /// Only extract these schemas (comma separated)
    #[arg(short, long, value_delimiter = ',')]
    schemas: Vec<String>,

    /// Output path template with {dir}, {name} and {ext} placeholders
    #[arg(short, long)]
    out: Option<String>,

    /// Print only input types
    #[arg(long, conflicts_with = "output_only")]
    input_only: bool,

    /// Print only output types
    #[arg(long)]
    output_only: bool,

    /// Emit one declaration when input and output types are identical
    #[arg(long)]
    unify: bool,

    /// Suffix removed from schema names (e.g. Schema)
    #[arg(long)]
    remove_suffix: Option<String>,

    /// Suffix appended to input type names
    #[arg(long)]
    input_suffix: Option<String>,

    /// Suffix appended to output type names
    #[arg(long)]
    output_suffix: Option<String>,

    /// Keep object types on one line
    #[arg(long)]
    no_format: bool,

    /// Also write vitest type tests, optionally to a custom path template
    #[arg(long, num_args = 0..=1, default_missing_value = OutputTemplate::DEFAULT_TESTS)]
    emit_tests: Option<String>,

    /// Print results as JSON instead of writing files
    #[arg(long, conflicts_with = "check")]
    json: bool,

    /// Compare with the files on disk and fail on differences
    #[arg(long)]
    check: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("zod_extract=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            if let Some(hint) = e.downcast_ref::<ExtractError>().map(ExtractError::hint) {
                eprintln!("   hint: {}", hint);
            }
            std::process::exit(1);
        }
    }
}

/// Returns `Ok(false)` when `--check` found stale files.
fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = effective_config(&cli)?;
    config.validate()?;

    if cli.print_config {
        print!("{}", config.to_toml()?);
        return Ok(true);
    }
    if cli.patterns.is_empty() {
        return Err(ExtractError::InvalidOption("no input files or patterns given".to_string()).into());
    }

    let cwd = std::env::current_dir().context("reading the current directory")?;
    let files = resolve_files(&cli.patterns, &cwd)?;
    let generation = generate(&config, &files)?;

    for diagnostic in &generation.diagnostics {
        let schema = if diagnostic.schema.is_empty() {
            String::new()
        } else {
            format!(" {}", diagnostic.schema)
        };
        eprintln!("⚠️  {}{}: {}", diagnostic.file.display(), schema, diagnostic.message);
        eprintln!("   hint: {}", diagnostic.hint);
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&json_report(&generation))?);
        return Ok(true);
    }

    if cli.check {
        let drifts = generation.check()?;
        for drift in &drifts {
            println!("--- {}", drift.path.display());
            print!("{}", drift.diff);
        }
        if drifts.is_empty() {
            eprintln!("✅ {} generated file(s) up to date", generation.outputs().count());
            return Ok(true);
        }
        eprintln!("❌ {} generated file(s) out of date", drifts.len());
        return Ok(false);
    }

    generation.write()?;
    for output in generation.outputs() {
        println!("{}", output.path.display());
    }
    eprintln!(
        "✅ {} schema(s) from {} file(s)",
        generation.result_count(),
        generation.files.len()
    );
    Ok(true)
}

/// Layered configuration with command-line flags applied last.
fn effective_config(cli: &Cli) -> anyhow::Result<ExtractConfig> {
    let mut config = ExtractConfig::load_from(cli.config.as_deref()).context("loading configuration")?;

    if let Some(tsconfig) = &cli.tsconfig {
        config.project.tsconfig = Some(tsconfig.clone());
    }
    if !cli.schemas.is_empty() {
        config.filter.schemas = cli.schemas.clone();
    }
    if let Some(out) = &cli.out {
        config.output.path = out.clone();
    }
    if let Some(tests) = &cli.emit_tests {
        config.output.tests = Some(tests.clone());
    }
    if cli.input_only {
        config.declarations.input_only = true;
        config.declarations.output_only = false;
    }
    if cli.output_only {
        config.declarations.output_only = true;
        config.declarations.input_only = false;
    }
    if cli.unify {
        config.declarations.unify_if_same = true;
    }
    if cli.no_format {
        config.declarations.format = false;
    }
    if let Some(suffix) = &cli.remove_suffix {
        config.naming.remove_suffix = Some(suffix.clone());
    }
    if let Some(suffix) = &cli.input_suffix {
        config.naming.input_suffix = suffix.clone();
    }
    if let Some(suffix) = &cli.output_suffix {
        config.naming.output_suffix = suffix.clone();
    }

    Ok(config)
}

fn json_report(generation: &Generation) -> serde_json::Value {
    let files: Vec<serde_json::Value> = generation
        .files
        .iter()
        .map(|file| {
            serde_json::json!({
                "source": file.source,
                "output": file.types.path,
                "results": file.results,
            })
        })
        .collect();
    serde_json::json!({
        "files": files,
        "diagnostics": generation.diagnostics,
    })
}
