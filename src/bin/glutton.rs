use anyhow::{bail, Context};
use glutton::command::{CommandReport, TorrentBatch, TorrentSource, UriBatch};
use glutton::store::StoreEvent;
use glutton::{AppConfig, GluttonClient};
use tokio::sync::broadcast::error::RecvError;

const USAGE: &str = "usage: glutton [--config PATH] [watch | add URI... | add-torrent FILE... | start GID... | pause GID... | remove GID... | history]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "glutton=info,warn".into()),
        )
        .init();

    // Parse command line arguments
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let config = if args.first().map(String::as_str) == Some("--config") {
        if args.len() < 2 {
            bail!(USAGE);
        }
        let path = args.remove(1);
        args.remove(0);
        AppConfig::load_or_default(&path).with_context(|| format!("loading {path}"))?
    } else {
        AppConfig::from_env()?
    };

    let command = if args.is_empty() {
        "watch".to_string()
    } else {
        args.remove(0)
    };

    if let Some(addr) = config.metrics_address {
        glutton::metrics::start_metrics_exporter(addr)?;
    }

    let client = GluttonClient::from_config(config).await?;

    match command.as_str() {
        "watch" => watch(&client).await?,
        "history" => {
            client.startup().await?;
            let history = client.sessions().history().await;
            if history.is_empty() {
                println!("No saved servers.");
            }
            for (i, server) in history.iter().enumerate() {
                println!("{i:>3}  {}", server.endpoint());
            }
        }
        "add" => {
            ensure_connected(&client).await?;
            let report = client.commands().add_uris(UriBatch::from_uris(args)).await?;
            print_report("Added", &report);
        }
        "add-torrent" => {
            let mut torrents = Vec::with_capacity(args.len());
            for path in &args {
                torrents.push(TorrentSource::from_path(path).await?);
            }
            ensure_connected(&client).await?;
            let report = client
                .commands()
                .add_torrents(TorrentBatch::new(torrents))
                .await?;
            print_report("Added", &report);
        }
        "start" => {
            ensure_connected(&client).await?;
            print_report("Started", &client.commands().start(&args).await?);
        }
        "pause" => {
            ensure_connected(&client).await?;
            print_report("Paused", &client.commands().pause(&args).await?);
        }
        "remove" => {
            ensure_connected(&client).await?;
            client.poller().tick().await;
            let mut targets = Vec::new();
            for gid in &args {
                match client.store().find(gid) {
                    Some(download) => targets.push(download),
                    None => eprintln!("Unknown gid {gid}, skipping"),
                }
            }
            print_report("Removed", &client.commands().remove(&targets).await?);
        }
        other => bail!("unknown command `{other}`\n{USAGE}"),
    }

    client.shutdown();
    Ok(())
}

/// Reconnect to the last server, falling back to the configured default.
async fn ensure_connected(client: &GluttonClient) -> anyhow::Result<()> {
    if client.startup().await? {
        return Ok(());
    }
    let server = client.config().default_server.clone();
    client
        .sessions()
        .connect(server.clone())
        .await
        .with_context(|| format!("connecting to {}", server.endpoint()))?;
    Ok(())
}

async fn watch(client: &GluttonClient) -> anyhow::Result<()> {
    let mut events = client.store().subscribe();
    ensure_connected(client).await?;

    let state = client.state();
    println!("Connected to {}", state.active_server.endpoint());
    if let Some(dir) = &state.default_destination {
        println!("Default destination: {dir}");
    }
    println!("Press Ctrl-C to stop.\n");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(StoreEvent::Replaced { .. }) | Err(RecvError::Lagged(_)) => print_downloads(client),
                Ok(_) => {}
                Err(RecvError::Closed) => break,
            },
        }
    }
    Ok(())
}

fn print_downloads(client: &GluttonClient) {
    let stat = client.global_stat();
    println!(
        "down {} B/s  up {} B/s  active {}  waiting {}  stopped {}",
        stat.download_speed, stat.upload_speed, stat.num_active, stat.num_waiting, stat.num_stopped
    );
    for download in client.download_list() {
        println!(
            "  {}  {:<8}  {:>5.1}%  {}",
            download.gid,
            download.status.as_str(),
            download.progress() * 100.0,
            download.name()
        );
    }
    println!();
}

fn print_report(verb: &str, report: &CommandReport) {
    for gid in report.accepted() {
        println!("{verb} {gid}");
    }
    for failure in &report.failures {
        eprintln!(
            "Item {} ({}) failed: {}",
            failure.index,
            failure.gid.as_deref().unwrap_or("-"),
            failure.message
        );
    }
}
