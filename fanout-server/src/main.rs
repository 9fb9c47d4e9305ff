mod config;
use clap::{Parser, Subcommand};
use config::Config;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod server;
use fanout_core::{Fingerprint, NodeRole, select_candidates};
use server::run_server;

#[derive(Parser)]
#[command(name = "fanout")]
#[command(about = "Replicated blob storage with quorum writes across a static node pool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a gateway or storage node
    Start {
        /// Path to configuration file
        #[arg(long = "conf", default_value = "fanout.yaml")]
        conf: String,

        /// Override node.node_id from config
        #[arg(long = "node-id")]
        node_id: Option<String>,

        /// Override node.role from config (gateway | storage)
        #[arg(long)]
        role: Option<String>,
    },
    /// Validate a configuration file and print the resolved settings
    Check {
        /// Path to configuration file
        #[arg(long = "conf", default_value = "fanout.yaml")]
        conf: String,
    },
}

fn load_config(path: &str) -> Config {
    match Config::from_file(path) {
        Ok(cfg) => cfg,
        Err(error) => {
            tracing::error!("Failed to load config: {}", error);
            std::process::exit(1);
        }
    }
}

fn validate_or_exit(cfg: &Config) {
    if let Err(error) = cfg.validate() {
        tracing::error!("Invalid config: {}", error);
        std::process::exit(2);
    }
}

fn print_check_summary(cfg: &Config) {
    let settings = cfg.replication_settings();
    println!(
        "node: {} ({}) on {}",
        cfg.node.node_id, cfg.node.role, cfg.node.bind_addr
    );
    println!("data_dir: {}", cfg.node.data_dir.display());
    println!(
        "replication: K={} quorum={} timeout={:?} verify_integrity={}",
        settings.replication_factor,
        settings.write_quorum,
        settings.request_timeout,
        settings.verify_integrity
    );

    if cfg.node.role != NodeRole::Gateway {
        return;
    }

    println!("metadata: {}", cfg.db_path().display());
    for node in &cfg.pool {
        println!("pool: {} -> {}", node.node_id, node.address);
    }

    // Where a zero-prefix fingerprint would land; handy for eyeballing ring order.
    if let Ok(pool) = cfg.node_pool() {
        let origin = Fingerprint::from_bytes([0u8; 32]);
        let candidates = select_candidates(&origin, &pool, settings.replication_factor);
        println!("ring start: {}", candidates.join(" -> "));
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fanout=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start {
            conf,
            node_id,
            role,
        } => {
            tracing::info!("Starting Fanout with config: {}", conf);

            let mut cfg = load_config(&conf);

            if let Some(node_id) = node_id {
                tracing::info!("Using node id override '{}' via CLI", node_id);
                cfg.node.node_id = node_id;
            }

            if let Some(role) = role {
                match role.parse::<NodeRole>() {
                    Ok(role) => cfg.node.role = role,
                    Err(error) => {
                        tracing::error!("{}", error);
                        std::process::exit(2);
                    }
                }
            }

            validate_or_exit(&cfg);

            if let Err(error) = run_server(cfg).await {
                tracing::error!("Server error: {}", error);
                std::process::exit(1);
            }
        }
        Commands::Check { conf } => {
            let cfg = load_config(&conf);
            validate_or_exit(&cfg);
            print_check_summary(&cfg);
        }
    }
}
