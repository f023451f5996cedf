//! Headless monitor: connects to the rig through a TCP bridge and prints
//! every sensor record until the link drops or Ctrl-C.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use coolmon::config::BridgePeer;
use coolmon::{EventSink, LinkConfig, LinkManager, LinkState, SensorRecord, TcpTransport};
use futures::StreamExt;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "coolmon", about = "Monitor the blood-cooling rig sensor link")]
struct Args {
    /// YAML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Peer name to connect to, overriding the configuration.
    #[arg(short, long)]
    target: Option<String>,

    /// Bridge address for the target peer (host:port).
    #[arg(short, long)]
    address: Option<String>,
}

/// Prints records to stdout.
#[derive(Default)]
struct ConsoleSink {
    records: u64,
    connected: bool,
}

impl EventSink for ConsoleSink {
    fn on_connected(&mut self) {
        self.connected = true;
        info!("Link up");
    }

    fn on_disconnected(&mut self) {
        info!(records = self.records, "Link down");
    }

    fn on_record(&mut self, record: SensorRecord) {
        self.records += 1;
        println!("{}", record);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = LinkConfig::load(args.config.as_deref()).context("loading configuration")?;
    if let Some(target) = args.target {
        config.target_name = target;
    }
    if let Some(address) = args.address {
        config.peers.retain(|p| p.name != config.target_name);
        config.peers.push(BridgePeer {
            name: config.target_name.clone(),
            address,
        });
    }

    let transport = Arc::new(TcpTransport::from_config(&config));
    let (manager, events) = LinkManager::new(transport, config);

    // Subscribe before connecting so no transition is missed.
    let mut updates = Box::pin(manager.state_updates());
    updates.next().await;

    let peer = manager.connect().await.context("starting link")?;
    info!(peer = %peer, "Connecting");

    let forward = tokio::spawn(async move {
        let mut sink = ConsoleSink::default();
        events.forward_to(&mut sink).await;
        sink
    });

    let interrupted = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
            true
        }
        _ = wait_for_disconnect(&mut updates) => false,
    };

    manager.shutdown().await;
    drop(updates);
    drop(manager);
    let sink = forward.await.context("event forwarder")?;
    info!(records = sink.records, "Exiting");

    if !interrupted && !sink.connected {
        warn!("Could not connect to {}", peer);
        anyhow::bail!("could not connect to {}", peer);
    }
    Ok(())
}

/// Resolves once the link is back to Disconnected.
async fn wait_for_disconnect<S>(updates: &mut S)
where
    S: futures::Stream<Item = LinkState> + Unpin,
{
    while let Some(state) = updates.next().await {
        if state == LinkState::Disconnected {
            return;
        }
    }
}
