//! Topdeck server binary.
//!
//! # Usage
//!
//! ```bash
//! # Built-in roster on the default port
//! topdeck-server --bind 0.0.0.0:3001
//!
//! # Custom catalog, faster rounds
//! topdeck-server --catalog cards.json --result-delay-ms 500 --next-round-delay-ms 1000
//! ```

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use topdeck_core::MatchConfig;
use topdeck_server::{DriverConfig, Server, ServerRuntimeConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Topdeck duel server
#[derive(Parser, Debug)]
#[command(name = "topdeck-server")]
#[command(about = "Two-player card comparison duel server")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, env = "TOPDECK_BIND", default_value = "0.0.0.0:3001")]
    bind: String,

    /// Port to listen on, overriding the port of --bind
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// JSON catalog file (built-in roster if omitted)
    #[arg(short, long)]
    catalog: Option<PathBuf>,

    /// Maximum concurrent connections
    #[arg(long, default_value = "10000")]
    max_connections: usize,

    /// Delay between the reveal and the round result
    #[arg(long, default_value = "1000")]
    result_delay_ms: u64,

    /// Delay between the round result and the next round
    #[arg(long, default_value = "2000")]
    next_round_delay_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn bind_address(&self) -> String {
        match self.port {
            Some(port) => {
                let host = self.bind.rsplit_once(':').map_or(self.bind.as_str(), |(host, _)| host);
                format!("{host}:{port}")
            },
            None => self.bind.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let bind_address = args.bind_address();
    tracing::info!("Topdeck server starting");
    tracing::info!("Binding to {}", bind_address);

    let config = ServerRuntimeConfig {
        bind_address,
        catalog_path: args.catalog,
        driver: DriverConfig {
            max_connections: args.max_connections,
            game: MatchConfig {
                result_delay: Duration::from_millis(args.result_delay_ms),
                next_round_delay: Duration::from_millis(args.next_round_delay_ms),
            },
        },
    };

    let server = Server::bind(config).await?;

    tracing::info!("Server listening on {}", server.local_addr()?);

    server.run().await?;

    Ok(())
}
