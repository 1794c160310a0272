//! Feed Relay - relays new posts from a watched feed account into an IRC channel.

use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use feed_relay::config::ConfigLoader;
use feed_relay::diagnostics::TracingDiagnostics;
use feed_relay::feed::{FeedPoller, HttpFeedSource, RetryPolicy};
use feed_relay::irc::ChatSession;
use feed_relay::relay::{Relay, RelayError};

#[derive(Parser)]
#[command(
    name = "feed-relay",
    about = "Relays new posts from a feed account into an IRC channel",
    version
)]
struct Cli {
    /// Path to the TOML config file (default: ./feed-relay.toml, then the
    /// user config directory).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Append logs to this file instead of stderr.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8, log_file: Option<&PathBuf>) -> std::io::Result<()> {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    match log_file {
        Some(path) => {
            let file = File::options().create(true).append(true).open(path)?;
            registry
                .with(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
                .init();
            eprintln!("Logging to \"{}\"", path.display());
        }
        None => registry.with(fmt::layer()).init(),
    }
    Ok(())
}

async fn run(loader: ConfigLoader) -> Result<(), RelayError> {
    let config = loader.load()?;
    tracing::info!(
        server = %config.irc.server,
        channel = %config.irc.channel,
        account = %config.feed.account,
        "Starting feed relay"
    );

    let diagnostics = TracingDiagnostics::shared();

    let session = ChatSession::connect(config.irc.clone(), Arc::clone(&diagnostics)).await?;
    let mut keepalive = session.start_keepalive()?;

    let source = HttpFeedSource::from_config(&config.feed)?;
    let poller = FeedPoller::initialize(
        source,
        config.feed.account.clone(),
        RetryPolicy::from(&config.relay),
        diagnostics,
    )
    .await?;

    let relay = Relay::new(poller, session, config.relay.poll_interval());

    tokio::select! {
        result = relay.run() => match result {
            Err(e) => Err(e),
            Ok(never) => match never {},
        },
        result = keepalive.wait() => result.map_err(RelayError::from),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_tracing(cli.verbose, cli.log_file.as_ref()) {
        eprintln!("Failed to open log file: {e}");
        return ExitCode::FAILURE;
    }

    let loader = cli.config.map_or_else(ConfigLoader::new, ConfigLoader::with_path);
    match run(loader).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Feed relay stopped");
            ExitCode::FAILURE
        }
    }
}
