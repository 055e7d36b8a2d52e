use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use envprint::fingerprint::canonical;
use envprint::probe::host;
use envprint::{Config, Fingerprint, FingerprintVector, Generator, Probe, ProbeOutcome};

#[derive(Parser)]
#[command(name = "envprint", version, about = "Print a deterministic fingerprint of this environment")]
struct Cli {
    /// Config file (default: ~/.envprint/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Comma separated probe list, overrides the configured one
    #[arg(long, global = true, value_delimiter = ',')]
    probes: Option<Vec<String>>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the fingerprint
    Show {
        #[arg(long)]
        json: bool,
    },
    /// Print every probe slot, the encoded vector and the fingerprint
    Explain {
        #[arg(long)]
        json: bool,
    },
    /// Write a default config file
    InitConfig {
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs on stderr, stdout carries only results
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("envprint=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(Config::config_path);

    match cli.command.unwrap_or(Command::Show { json: false }) {
        Command::InitConfig { force } => init_config(&config_path, force),
        Command::Show { json } => {
            let (generator, probes) = prepare(&config_path, cli.probes)?;
            show(&generator, &probes, json).await
        }
        Command::Explain { json } => {
            let (generator, probes) = prepare(&config_path, cli.probes)?;
            explain(&generator, &probes, json).await
        }
    }
}

/// Load config, apply the `--probes` override and build the probe list
fn prepare(config_path: &Path, probe_override: Option<Vec<String>>) -> Result<(Generator, Vec<Arc<dyn Probe>>)> {
    let mut config = match Config::load_from(config_path) {
        Ok(c) => c,
        Err(e) => {
            error!("❌ Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };
    if let Some(probes) = probe_override {
        config.probes = probes;
    }

    let probes = host::probes_by_name(&config.probes)?;
    let generator = Generator::from_config(&config);

    info!("🔍 Running {} probes", probes.len());

    Ok((generator, probes))
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{:?} already exists, pass --force to overwrite", path);
    }
    Config::default().save(path)?;
    println!("{}", path.display());
    Ok(())
}

async fn show(generator: &Generator, probes: &[Arc<dyn Probe>], json: bool) -> Result<()> {
    let fingerprint = generator.generate(probes).await?;

    if json {
        let out = serde_json::json!({
            "fingerprint": fingerprint.hex,
            "algorithm": fingerprint.algorithm,
            "generated_at": Utc::now().to_rfc3339(),
        });
        println!("{}", serde_json::to_string_pretty(&out).context("Failed to serialize output")?);
    } else {
        println!("{}", fingerprint);
    }

    Ok(())
}

async fn explain(generator: &Generator, probes: &[Arc<dyn Probe>], json: bool) -> Result<()> {
    let vector = generator.collect(probes).await?;
    let sentinel = &generator.config().sentinel;
    let encoded = canonical::encode_vector(&vector, sentinel);
    let fingerprint = Fingerprint::from_vector(&vector, generator.config());

    if json {
        let out = serde_json::json!({
            "probes": slots_json(&vector),
            "encoded": encoded,
            "fingerprint": fingerprint.hex,
            "algorithm": fingerprint.algorithm,
            "generated_at": Utc::now().to_rfc3339(),
        });
        println!("{}", serde_json::to_string_pretty(&out).context("Failed to serialize output")?);
        return Ok(());
    }

    for result in &vector.results {
        match &result.outcome {
            ProbeOutcome::Ok(value) => println!("  ✓ {:<10} {}", result.name, value),
            ProbeOutcome::Failed(e) => println!("  ✗ {:<10} {} ({})", result.name, sentinel, e),
        }
    }
    println!("\n  vector:      {}", encoded);
    println!("  fingerprint: {}", fingerprint);

    Ok(())
}

fn slots_json(vector: &FingerprintVector) -> Vec<serde_json::Value> {
    vector
        .results
        .iter()
        .map(|r| match &r.outcome {
            ProbeOutcome::Ok(value) => serde_json::json!({
                "name": r.name,
                "status": "ok",
                "value": value,
            }),
            ProbeOutcome::Failed(e) => serde_json::json!({
                "name": r.name,
                "status": e.kind(),
                "error": e.to_string(),
            }),
        })
        .collect()
}
