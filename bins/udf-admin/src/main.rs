use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use udf_client::config::validation::validate_seed;
use udf_client::{ClientConfig, InfoPolicy, ModuleRegistry, Session};
use udf_common::UdfLanguage;
use udf_transport::{HttpTransport, HttpTransportConfig};

/// UDF module administration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path (YAML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Node URL to contact (repeatable, added to configured seeds)
    #[arg(short, long, value_name = "URL")]
    seed: Vec<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a UDF file and wait until every node has it
    Put {
        path: PathBuf,

        /// Module language, by name or numeric code
        #[arg(short, long, default_value = "lua")]
        language: String,

        /// Per-request timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Remove a registered module
    Remove {
        name: String,

        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// List registered modules
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,

        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Fetch the content of a module
    Get {
        name: String,

        #[arg(short, long, default_value = "lua")]
        language: String,

        /// Write content to this file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = run(args).await {
        match e.downcast_ref::<udf_common::Error>() {
            Some(udf_error) => {
                eprintln!("Error [{}/{}]: {}", udf_error.kind(), udf_error.code(), udf_error);
            }
            None => eprintln!("Error: {:#}", e),
        }
        std::process::exit(exit_code(&e));
    }
}

/// Process exit status for a failed command: the error's stable code when
/// it is a registry error, 1 otherwise.
fn exit_code(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<udf_common::Error>()
        .map(udf_common::Error::code)
        .unwrap_or(1)
}

async fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => ClientConfig::load_from_file(path)?,
        None => ClientConfig::default(),
    };

    initialize_logging(args.debug, &config.client.log_level);

    let mut seeds = config.client.seeds.clone();
    for seed in &args.seed {
        validate_seed(seed)?;
        if !seeds.contains(seed) {
            seeds.push(seed.clone());
        }
    }
    if seeds.is_empty() {
        return Err(anyhow!("No seeds configured: pass --seed or set client.seeds"));
    }

    debug!("Connecting through {} seeds", seeds.len());
    let transport = HttpTransport::new(HttpTransportConfig::new(seeds));
    let session = Session::connect(Arc::new(transport), config.session_defaults()).await?;
    let registry = ModuleRegistry::new();

    let result = execute(&registry, &session, args.command).await;
    session.close();
    result
}

async fn execute(registry: &ModuleRegistry, session: &Session, command: Command) -> Result<()> {
    match command {
        Command::Put {
            path,
            language,
            timeout_ms,
        } => {
            let language = UdfLanguage::parse(&language)?;
            registry
                .put(session, &path, language, &policy(timeout_ms))
                .await?;
            info!("Registered {}", path.display());
            println!("Registered {} on every node", path.display());
        }

        Command::Remove { name, timeout_ms } => {
            registry.remove(session, &name, &policy(timeout_ms)).await?;
            println!("Removed {}", name);
        }

        Command::List { json, timeout_ms } => {
            let modules = registry.list(session, &policy(timeout_ms)).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&modules)?);
            } else {
                for module in &modules {
                    println!(
                        "{:<32} {:<12} {}",
                        module.name.as_str(),
                        module.language.to_string(),
                        module.content_hash
                    );
                }
            }
        }

        Command::Get {
            name,
            language,
            output,
            timeout_ms,
        } => {
            let language = UdfLanguage::parse(&language)?;
            let content = registry
                .get(session, &name, language, &policy(timeout_ms))
                .await?;

            match output {
                Some(path) => {
                    tokio::fs::write(&path, &content)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("Wrote {} bytes to {}", content.len(), path.display());
                }
                None => {
                    use std::io::Write;
                    std::io::stdout()
                        .write_all(&content)
                        .context("Failed to write to stdout")?;
                }
            }
        }
    }

    Ok(())
}

fn policy(timeout_ms: Option<u64>) -> InfoPolicy {
    timeout_ms.map(InfoPolicy::with_timeout_ms).unwrap_or_default()
}

fn initialize_logging(debug: bool, configured: &str) {
    let level = if debug { "debug" } else { configured };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
