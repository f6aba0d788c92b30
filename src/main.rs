//! ttlcache - maintenance CLI for a ttlcache storage directory.
//!
//! Opens the store the same way a server would (one shared handler, reaper
//! running) and performs a single operation against it.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use ttlcache::config::{DEFAULT_MAX_SIZE, StoreConfig};
use ttlcache::store::{
    CacheHandler, DeleteRequest, GetRequest, HandlerFactory, RedbHandler, SetRequest,
    TouchRequest,
};

#[derive(Parser)]
#[command(name = "ttlcache", version, about = "Inspect and modify a ttlcache store")]
struct Cli {
    /// TOML configuration file (overrides --path and --max-size)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Storage directory
    #[arg(short, long, global = true)]
    path: Option<PathBuf>,

    /// Maximum storage size in bytes
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_SIZE)]
    max_size: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a value, overwriting any existing one
    Set(EntryArgs),
    /// Store a value only if the key is absent
    Add(EntryArgs),
    /// Look up one or more keys
    Get {
        keys: Vec<String>,
        /// Also print each hit's absolute expiration
        #[arg(short, long)]
        expiration: bool,
    },
    /// Refresh a key's expiration
    Touch {
        key: String,
        /// New TTL in seconds (0 = never expire)
        ttl: u32,
    },
    /// Remove a key
    Delete { key: String },
    /// Show entry count, space in use and database location
    Stats,
    /// Evict expired entries now
    Reap,
}

#[derive(Args)]
struct EntryArgs {
    key: String,
    value: String,
    /// TTL in seconds (0 = never expire)
    #[arg(short, long, default_value_t = 0)]
    ttl: u32,
    /// Opaque client flags
    #[arg(short, long, default_value_t = 0)]
    flags: u32,
}

impl EntryArgs {
    fn into_request(self) -> SetRequest {
        SetRequest::new(self.key, self.value)
            .with_flags(self.flags)
            .with_ttl(self.ttl)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let factory = HandlerFactory::new(config);
    let handler = factory
        .handler()
        .await
        .context("Failed to initialize cache storage")?;

    let result = execute(&handler, cli.command).await;
    handler.shutdown().await;
    result
}

/// Log filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "info";

/// Initialize stderr logging, honouring `RUST_LOG`.
fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(cli: &Cli) -> Result<StoreConfig> {
    let config = match (&cli.config, &cli.path) {
        (Some(file), _) => StoreConfig::load_from(file)
            .with_context(|| format!("Failed to load config: {}", file.display()))?,
        (None, Some(path)) => StoreConfig::new(path, cli.max_size),
        (None, None) => anyhow::bail!("Either --config or --path is required"),
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn execute(handler: &RedbHandler, command: Commands) -> Result<()> {
    match command {
        Commands::Set(args) => {
            handler.set(args.into_request()).await?;
            println!("STORED");
        },
        Commands::Add(args) => {
            let key = args.key.clone();
            handler
                .add(args.into_request())
                .await
                .with_context(|| format!("Key '{key}' was not added"))?;
            println!("STORED");
        },
        Commands::Get { keys, expiration } => {
            let req = GetRequest::new(keys);
            if expiration {
                for resp in handler.get_e(req).collect().await? {
                    let key = String::from_utf8_lossy(&resp.key);
                    if resp.miss {
                        println!("{key}: MISS");
                    } else {
                        println!(
                            "{key}: flags={} exptime={} {}",
                            resp.flags,
                            resp.exptime,
                            String::from_utf8_lossy(&resp.data)
                        );
                    }
                }
            } else {
                for resp in handler.get(req).collect().await? {
                    let key = String::from_utf8_lossy(&resp.key);
                    if resp.miss {
                        println!("{key}: MISS");
                    } else {
                        println!(
                            "{key}: flags={} {}",
                            resp.flags,
                            String::from_utf8_lossy(&resp.data)
                        );
                    }
                }
            }
        },
        Commands::Touch { key, ttl } => {
            handler
                .touch(TouchRequest::new(key.clone(), ttl))
                .await
                .with_context(|| format!("Key '{key}' was not touched"))?;
            println!("TOUCHED");
        },
        Commands::Delete { key } => {
            handler
                .delete(DeleteRequest::new(key.clone()))
                .await
                .with_context(|| format!("Key '{key}' was not deleted"))?;
            println!("DELETED");
        },
        Commands::Stats => {
            let count = handler.entry_count().await?;
            let used = handler.used_bytes().await?;
            println!("Database: {}", handler.engine().file().display());
            println!("Entries:  {count}");
            println!("Used:     {used} of {} bytes", handler.engine().max_size());
        },
        Commands::Reap => {
            let report = handler.sweep_now().await?;
            println!(
                "Reaped {} of {} candidates ({} -> {} entries) in {:.2}ms",
                report.reaped,
                report.candidates,
                report.before,
                report.after,
                report.elapsed.as_secs_f64() * 1000.0
            );
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_default_log_filter_is_info() {
        let filter = EnvFilter::new(DEFAULT_LOG_FILTER);
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn test_parse_stats_with_path() {
        let cli = Cli::try_parse_from(["ttlcache", "--path", "/tmp/store", "stats"]).unwrap();
        assert!(matches!(cli.command, Commands::Stats));

        let config = load_config(&cli).unwrap();
        assert_eq!(config.path, PathBuf::from("/tmp/store"));
        assert_eq!(config.max_size, DEFAULT_MAX_SIZE);
    }

    #[test]
    fn test_config_source_required() {
        let cli = Cli::try_parse_from(["ttlcache", "reap"]).unwrap();
        assert!(load_config(&cli).is_err());
    }
}
