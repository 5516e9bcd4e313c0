use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use plugingen_core::{Generator, GeneratorConfig};
use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "plugingen",
    author,
    version,
    about = "Generates plugin import and directive lists from plugin.cfg"
)]
struct Cli {
    /// Sets the log level (error, warn, info, debug, trace).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Source tree that relative paths resolve against.
    #[arg(long, value_name = "DIR", default_value = ".", global = true)]
    root: PathBuf,

    /// Optional TOML file overriding the built-in layout.
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Regenerate both files (the default).
    Generate,
    /// Exit non-zero if either generated file is out of date.
    Check,
    /// Print the resolved plugin list as JSON.
    Diag,
    /// Interact with configuration files.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Validates the provided configuration file.
    Validate {
        #[arg(value_name = "FILE")]
        config: PathBuf,
    },
    /// Prints the built-in configuration as TOML.
    Example,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;
    match cli.command.unwrap_or(Commands::Generate) {
        Commands::Generate => handle_generate(&cli.root, cli.config.as_deref()),
        Commands::Check => handle_check(&cli.root, cli.config.as_deref()),
        Commands::Diag => handle_diag(&cli.root, cli.config.as_deref()),
        Commands::Config { command } => handle_config(command),
    }
}

fn init_tracing(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
    Ok(())
}

fn handle_generate(root: &Path, config: Option<&Path>) -> Result<()> {
    let generator = build_generator(root, config)?;
    generator.run()?;
    Ok(())
}

fn handle_check(root: &Path, config: Option<&Path>) -> Result<()> {
    let generator = build_generator(root, config)?;
    let stale = generator.check()?;
    if stale.is_empty() {
        println!("generated files are up to date");
        return Ok(());
    }
    for path in &stale {
        warn!(path = %path.display(), "generated file is stale");
        println!("stale: {}", path.display());
    }
    bail!("{} generated file(s) out of date; run `plugingen generate`", stale.len())
}

fn handle_diag(root: &Path, config: Option<&Path>) -> Result<()> {
    let generator = build_generator(root, config)?;
    let manifest = generator.load_manifest()?;
    let json = serde_json::to_string_pretty(&manifest)?;
    println!("{json}");
    Ok(())
}

fn handle_config(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Validate { config } => {
            let cfg = GeneratorConfig::load(&config)?;
            cfg.validate()?;
            println!("configuration OK: {}", config.display());
        }
        ConfigCommands::Example => {
            println!("{}", include_str!("../../../config/plugingen.toml"));
        }
    }
    Ok(())
}

fn build_generator(root: &Path, config: Option<&Path>) -> Result<Generator> {
    let cfg = match config {
        Some(path) => GeneratorConfig::load(path)?,
        None => GeneratorConfig::default(),
    };
    cfg.validate()?;
    Ok(Generator::new(root, cfg))
}
