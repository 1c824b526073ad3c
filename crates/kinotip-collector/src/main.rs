use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use kinotip_channel::{ChannelSettings, TelegramChannel};
use kinotip_core::{
    collector::Collector,
    config::CollectorConfig,
    scheduler::{spawn_refresh_loop, RefreshSchedule},
    store::SnapshotStore,
};

#[derive(Parser, Debug)]
#[command(name = "kinotip-collector", version, about = "Titr channel parser and post feed")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch tagged posts and serve them over HTTP (default).
    Serve,
    /// Sign in interactively and create the session file.
    Login,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    kinotip_core::logging::init("kinotip-collector")?;
    let cli = Cli::parse();

    let cfg = CollectorConfig::load()?;
    let channel = Arc::new(TelegramChannel::new(ChannelSettings::from(&cfg)));

    match cli.command.unwrap_or(Command::Serve) {
        Command::Login => channel.login().await?,
        Command::Serve => serve(cfg, channel).await?,
    }
    Ok(())
}

async fn serve(cfg: CollectorConfig, channel: Arc<TelegramChannel>) -> anyhow::Result<()> {
    channel.check_session().await;

    let store = Arc::new(SnapshotStore::new());
    let collector = Arc::new(Collector::new(
        channel,
        store.clone(),
        cfg.hashtag.clone(),
        &cfg.channel_username,
    ));
    collector.refresh("server startup").await;

    let schedule = RefreshSchedule::new(&cfg.refresh_hours)?;
    let cancel = CancellationToken::new();
    let refresher = spawn_refresh_loop(collector, schedule, cancel.clone());

    let server = kinotip_http::bind(cfg.bind_addr, store)?;
    let handle = server.handle();
    tokio::pin!(server);

    tokio::select! {
        res = &mut server => res?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
            handle.stop(true).await;
            server.await?;
        }
    }

    cancel.cancel();
    if let Err(e) = refresher.await {
        tracing::warn!(error = %e, "refresh loop ended abnormally");
    }
    Ok(())
}
