use breatheasy::{
    cmd::{ReplayArgs, replay},
    config::AppConfig,
    supervisor::Supervisor,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory containing `app.yaml`.
    #[arg(short, long, global = true)]
    config_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs the telemetry coordinator service.
    Run,
    /// Replays a recorded JSON-lines session and prints the final state.
    Replay(ReplayArgs),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Run => run_supervisor(cli.config_dir.as_deref()).await?,
        Commands::Replay(args) => replay::execute(args).await?,
    }

    Ok(())
}

async fn run_supervisor(config_dir: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    tracing::debug!("Loading application configuration...");
    let config = AppConfig::new(config_dir)?;
    tracing::debug!(
        telemetry_url = %config.telemetry.url,
        analysis_url = %config.analysis.base_url,
        server_enabled = config.server.enabled,
        "Configuration loaded."
    );

    let supervisor = Supervisor::builder().config(config).build().await?;
    tracing::info!("Supervisor initialized, starting session...");
    supervisor.run().await?;

    Ok(())
}
