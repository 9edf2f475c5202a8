/// Reactive contract generator entry point
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use reactgen_core::config::ReactgenConfig;
use reactgen_core::types::GenerationRequest;
use reactgen_ethereum::codegen::parser::{extract_events, extract_functions};
use reactgen_ethereum::{AbiParser, Pipeline};

#[derive(Parser)]
#[command(name = "reactgen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a reactive contract from a generation request
    Generate {
        /// Generation request (JSON)
        #[arg(short, long)]
        request: PathBuf,

        /// Config file path (TOML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Compile the source and print the artifact as JSON
        #[arg(long)]
        compile: bool,
    },

    /// List the events and callable functions of an ABI
    Inspect {
        /// ABI file (JSON array)
        #[arg(short, long)]
        abi: PathBuf,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&Path>) -> Result<ReactgenConfig> {
    match path {
        Some(path) => ReactgenConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => {
            let mut config = ReactgenConfig::default();
            config
                .apply_environment_overrides()
                .context("Invalid environment override")?;
            config.validate().context("Invalid configuration")?;
            Ok(config)
        }
    }
}

fn write_output(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            println!("{}", content);
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Commands::Generate {
            request,
            config,
            output,
            compile,
        } => {
            let config = load_config(config.as_deref())?;
            let raw = fs::read_to_string(&request)
                .with_context(|| format!("Failed to read request {}", request.display()))?;
            let request: GenerationRequest =
                serde_json::from_str(&raw).context("Malformed generation request")?;

            let pipeline = Pipeline::new(&config)?;

            if compile {
                let artifact = match pipeline.generate_and_compile(&request).await {
                    Ok(artifact) => artifact,
                    Err(err) => {
                        for diagnostic in err.diagnostics() {
                            eprintln!("{}", diagnostic);
                        }
                        return Err(err.into());
                    }
                };
                for warning in &artifact.warnings {
                    tracing::warn!("{}", warning);
                }
                write_output(output.as_deref(), &serde_json::to_string_pretty(&artifact)?)?;
            } else {
                let source = pipeline.generate(&request)?;
                tracing::info!(contract = %source.contract_name, "Source generated");
                write_output(output.as_deref(), &source.source_text)?;
            }
        }
        Commands::Inspect { abi } => {
            let parser = AbiParser::new();
            let entries = parser
                .parse_file(&abi)
                .with_context(|| format!("Failed to parse ABI {}", abi.display()))?;

            let events = extract_events(&entries)?;
            let functions = extract_functions(&entries)?;

            println!("Events:");
            for event in &events {
                println!("  {}  {}", event.canonical_signature, event.topic0);
            }
            println!("Callable functions:");
            for function in &functions {
                println!(
                    "  {}  {}  {}",
                    parser.get_function_signature(function),
                    function.selector,
                    function.state_mutability
                );
            }
        }
    }

    Ok(())
}
