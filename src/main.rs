use pubsub_pipe::cli::{commands, Cli};
use pubsub_pipe::config::{LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize tracing; stdout is reserved for message output
    init_tracing(&cli.to_config().logging);

    // Execute the command
    if let Err(e) = commands::execute_command(cli).await {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match config.format {
        LogFormat::Text => builder.compact().init(),
        LogFormat::Json => builder.json().init(),
    }
}
