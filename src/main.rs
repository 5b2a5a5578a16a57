mod cli;

use crate::cli::app::{App, Cli};
use clap::Parser;
use log::warn;
use topowrangler::InterruptSignal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let interrupt = InterruptSignal::new();
    {
        let interrupt = interrupt.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, abandoning lock waits");
                interrupt.interrupt();
            }
        });
    }

    App::new(cli, interrupt).run().await
}
