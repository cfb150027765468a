use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use tokio::io::AsyncReadExt;

use alert_relay::envelope::load_event_file;
use alert_relay::error::Error;
use alert_relay::relay::AlertRelay;
use alert_relay::social::BlueskyClient;

/// Event fixture used when no path is given.
const DEFAULT_EVENT_FILE: &str = "test_event.json";

/// sysexits.h `EX_CONFIG`.
const EXIT_CONFIG: u8 = 78;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let relay = match AlertRelay::from_env() {
        Ok(relay) => relay,
        Err(Error::Config(e)) => {
            tracing::error!(missing = ?e.missing(), "Unable to load environment: {e}");
            return ExitCode::from(EXIT_CONFIG);
        }
        Err(e) => {
            tracing::error!("Unable to start: {e}");
            return ExitCode::FAILURE;
        }
    };

    let source = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_EVENT_FILE.to_string());

    match run(&relay, &source).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Invocation failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(relay: &AlertRelay, source: &str) -> anyhow::Result<()> {
    let event = if source == "-" {
        let mut raw = String::new();
        tokio::io::stdin()
            .read_to_string(&mut raw)
            .await
            .context("reading event from stdin")?;
        serde_json::from_str(&raw).context("parsing event from stdin")?
    } else {
        load_event_file(&PathBuf::from(source)).await?
    };

    let mut client = BlueskyClient::new(relay.config().service.as_str());

    let outcome = relay.handle_event(&event, &mut client).await?;
    tracing::info!(outcome = outcome.label(), "Invocation complete");
    Ok(())
}
