use std::path::PathBuf;

use clap::Parser;

use simnet_node::{Host, NodeConfig, Scenario};

#[derive(Parser)]
#[command(name = "simnet-node", about = "Simulated IPv4 host and forwarding engine")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "simnet.toml")]
    config: PathBuf,

    /// Scenario of timed events to replay against the host
    #[arg(short, long)]
    scenario: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let config = match NodeConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to load config from {}: {e}", cli.config.display());
            std::process::exit(1);
        }
    };

    // Initialize logging
    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        simnet_node::logging::init_json(&config.logging.level);
    } else {
        simnet_node::logging::init(&config.logging.level);
    }

    let mut host = match Host::from_config(&config) {
        Ok(h) => h,
        Err(e) => {
            tracing::error!("failed to build host: {e}");
            std::process::exit(1);
        }
    };

    if let Some(path) = &cli.scenario {
        let result = Scenario::load(path)
            .and_then(|scenario| simnet_node::scenario::run(&mut host, &scenario));
        if let Err(e) = result {
            tracing::error!("scenario {} failed: {e}", path.display());
            std::process::exit(1);
        }
    }

    if let Some(manet) = host.manet() {
        tracing::info!(table = %manet.info(), "manet routes");
    }
    let stats = host.stats();
    tracing::info!(
        host = host.name(),
        forwarded = stats.forwarded,
        local_delivered = stats.local_delivered,
        dropped = stats.dropped,
        unroutable = stats.unroutable,
        multicast = stats.multicast,
        "final statistics"
    );
    println!("{}: {stats}", host.name());
}
