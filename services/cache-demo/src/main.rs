//! cache-demo - 缓存旁路策略演示
//!
//! 每个子命令演示一类缓存问题及其处理方式，结束时输出 Prometheus 格式的计数器

mod counting;
mod scenarios;

use std::time::Duration;

use aside_adapter_redis::EvictionPolicy;
use aside_bootstrap::{Infrastructure, init_runtime};
use aside_config::{AppConfig, ConsistencyPolicy, StrategyKind};
use aside_telemetry::init_metrics;
use clap::{Parser, Subcommand};
use tracing::info;

use scenarios::avalanche::AvalancheOptions;
use scenarios::eviction::EvictionOptions;
use scenarios::lock::LockOptions;

#[derive(Parser)]
#[command(name = "cache-demo")]
#[command(about = "Cache-aside strategy demonstrations against Redis and PostgreSQL", long_about = None)]
struct Cli {
    /// Configuration directory
    #[arg(short, long, default_value = "services/cache-demo/config", global = true)]
    config_dir: String,

    /// Override cache.strategy
    #[arg(long, value_parser = parse_strategy, global = true)]
    strategy: Option<StrategyKind>,

    /// Override cache.consistency
    #[arg(long, value_parser = parse_consistency, global = true)]
    consistency: Option<ConsistencyPolicy>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh vs invalidate on update
    Strategies,

    /// Repeated lookups of a missing id with and without absent markers
    Penetration {
        #[arg(long, default_value_t = 99999)]
        id: i64,

        #[arg(long, default_value_t = 5)]
        attempts: usize,
    },

    /// Warm a batch with fixed vs random expiry
    Avalanche {
        #[arg(long, default_value_t = 10)]
        batch: usize,

        /// Base expiry in seconds
        #[arg(long, default_value_t = 60)]
        base_secs: u64,

        /// Wait for the base expiry, then fire concurrent lookups
        #[arg(long)]
        wait: bool,

        #[arg(long, default_value_t = 50)]
        requests: usize,
    },

    /// Seed the bloom filter and query unknown ids
    Bloom {
        #[arg(long, default_value_t = 88888)]
        id: i64,

        #[arg(long, default_value_t = 5)]
        attempts: usize,
    },

    /// Observe a Redis maxmemory-policy (flushes the current database)
    Eviction {
        #[arg(value_parser = parse_eviction_policy)]
        policy: EvictionPolicy,

        #[arg(long, default_value = "5mb")]
        max_memory: String,

        #[arg(long, default_value_t = 100)]
        keys: usize,

        /// Value size in KB
        #[arg(long, default_value_t = 100)]
        value_kb: usize,
    },

    /// Stock decrement guarded by the distributed lock
    Lock {
        #[arg(long, default_value = "1001")]
        product: String,

        #[arg(long, default_value_t = 10)]
        quantity: i64,

        /// Concurrent buyers
        #[arg(long, default_value_t = 3)]
        buyers: usize,
    },

    /// Clear cache keys and reseed the users table
    Reset,
}

fn parse_strategy(s: &str) -> Result<StrategyKind, String> {
    s.parse().map_err(|e: aside_config::ConfigError| e.to_string())
}

fn parse_consistency(s: &str) -> Result<ConsistencyPolicy, String> {
    s.parse().map_err(|e: aside_config::ConfigError| e.to_string())
}

fn parse_eviction_policy(s: &str) -> Result<EvictionPolicy, String> {
    s.parse().map_err(|e: aside_errors::AppError| e.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(&cli.config_dir)?;
    if let Some(strategy) = cli.strategy {
        config.cache.strategy = strategy;
    }
    if let Some(consistency) = cli.consistency {
        config.cache.consistency = consistency;
    }

    init_runtime(&config);
    let metrics = init_metrics()?;

    let infra = Infrastructure::from_config(config).await?;
    let cache = &infra.config().cache;
    info!(strategy = %cache.strategy, consistency = %cache.consistency, "Cache policy");

    match cli.command {
        Commands::Strategies => {
            let policies = match cli.consistency {
                Some(policy) => vec![policy],
                None => vec![ConsistencyPolicy::Refresh, ConsistencyPolicy::Invalidate],
            };
            scenarios::strategies::run(&infra, cache.strategy, &policies).await?
        }
        Commands::Penetration { id, attempts } => {
            scenarios::penetration::run(&infra, id, attempts).await?
        }
        Commands::Avalanche {
            batch,
            base_secs,
            wait,
            requests,
        } => {
            let options = AvalancheOptions {
                batch,
                base: Duration::from_secs(base_secs),
                wait,
                requests,
            };
            scenarios::avalanche::run(&infra, &options).await?
        }
        Commands::Bloom { id, attempts } => scenarios::bloom::run(&infra, id, attempts).await?,
        Commands::Eviction {
            policy,
            max_memory,
            keys,
            value_kb,
        } => {
            let options = EvictionOptions {
                policy,
                max_memory,
                keys,
                value_bytes: value_kb * 1024,
                hot_keys: 10,
                new_keys: 20,
            };
            scenarios::eviction::run(&infra, &options).await?
        }
        Commands::Lock {
            product,
            quantity,
            buyers,
        } => {
            let options = LockOptions {
                product_id: product,
                quantity,
                buyers,
            };
            scenarios::lock::run(&infra, &options).await?
        }
        Commands::Reset => scenarios::reset::run(&infra).await?,
    }

    println!("{}", metrics.render());
    Ok(())
}
