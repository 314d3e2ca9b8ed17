// llm-observability/crates/llm-observability/src/main.rs

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use dotenvy::dotenv;
#[cfg(feature = "cli")]
use llm_observability::{config::Config, run_server, ConfigOverrides};

/// Browse llm conversations, responses, tool calls and usage metrics.
#[cfg(feature = "cli")]
#[derive(Debug, Parser)]
#[command(name = "llm-observability", version, about)]
struct Cli {
    /// Path to the llm logs database (default: ~/.config/io.datasette.llm/logs.db)
    #[arg(long = "db")]
    db_path: Option<std::path::PathBuf>,

    /// Host to bind to (default: 127.0.0.1)
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (default: 8778)
    #[arg(long)]
    port: Option<u16>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let cli = Cli::parse();
    let cfg = Config::resolve(ConfigOverrides {
        db_path: cli.db_path,
        host: cli.host,
        port: cli.port,
        debug: cli.debug.then_some(true),
    })?;

    run_server(cfg).await
}

#[cfg(not(feature = "cli"))]
fn main() {
    println!("CLI feature not enabled. Enable with --features cli");
}
