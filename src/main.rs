use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;

mod auth;
mod config;
mod derive;
mod format;
mod gate;
mod output;
mod render;
mod serve;
mod snapshot;
mod staleness;
mod tasks;
mod telemetry;
mod util;
mod view;

#[derive(Parser)]
#[command(name = "opsdash", about = "Operations dashboard CLI")]
struct Cli {
    /// Emit a single JSON envelope to stdout; logs go to stderr
    #[arg(global = true, long, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the snapshot and render the dashboard once
    Render(render::RenderCmd),
    /// Submit the dashboard password and persist the session marker
    Unlock(gate::UnlockCmd),
    /// Clear the session marker
    Lock,
    /// Print the SHA-256 hex digest of a password, for OPSDASH_PASSWORD_SHA256
    Digest(gate::DigestCmd),
    /// Serve the dashboard over HTTP behind Basic auth
    Serve(serve::ServeCmd),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    telemetry::config::set_json_mode(cli.json);

    // logs go to stderr; respects RUST_LOG and OPSDASH_LOG_FORMAT
    telemetry::config::init_tracing();
    let config = config::DashboardConfig::from_env();

    match cli.command {
        Commands::Render(args) => render::run(&config, args).await?,
        Commands::Unlock(args) => gate::unlock(&config, args)?,
        Commands::Lock => gate::lock(&config)?,
        Commands::Digest(args) => gate::digest(args)?,
        Commands::Serve(args) => serve::run(&config, args).await?,
    }

    Ok(())
}
