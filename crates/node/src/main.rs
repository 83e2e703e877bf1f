use std::sync::Arc;

use base64::prelude::BASE64_STANDARD;
use base64::Engine as _;
use color_eyre::eyre::{bail, Result, WrapErr};
use tracing::{debug, info};

use vladiator_core::DriverKind;
use vladiator_driver::{Driver, EvmDriver, NodeSigner};
use vladiator_engine::{
    heartbeat, Bus, DriverTable, FeatureRegistry, Metrics, Node, NodeIdentity, Vladiator,
};
use vladiator_metrics::SharedRegistry;
use vladiator_network::{Config as NetConfig, Keypair};

use crate::args::{Args, Commands};
use crate::env::NodeEnv;

mod args;
mod env;
mod example;
mod logging;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::new();

    let debug = args.debug || std::env::var("DEBUG").is_ok_and(|v| v == "true");
    logging::init(debug);

    debug!("Command-line parameters: {args:?}");

    match args.command {
        Commands::Init => init(&args),
        Commands::Start => start(&args).await,
    }
}

fn init(args: &Args) -> Result<()> {
    let path = args.config_file_path();

    if path.exists() {
        bail!("refusing to overwrite existing config at {}", path.display());
    }

    std::fs::write(&path, serde_json::to_string_pretty(&example::sample_config())?)
        .wrap_err_with(|| format!("failed to write {}", path.display()))?;

    let keypair = Keypair::generate_ed25519();
    let encoded = BASE64_STANDARD.encode(keypair.to_protobuf_encoding()?);

    println!("Wrote sample config to {}", path.display());
    println!("P2P_PRIVATE_KEY={encoded}");

    Ok(())
}

async fn start(args: &Args) -> Result<()> {
    let env = NodeEnv::from_env()?;
    let config = args.load_config()?;

    let registry = SharedRegistry::global().clone();
    let metrics = Metrics::register(&registry);

    let signer = NodeSigner::from_hex(&env.node_private_key)?;

    let identity = NodeIdentity {
        public_key: env.node_public_key.clone(),
        signer_address: signer.address().to_string(),
    };

    info!(signer = %identity.signer_address, "Node identity loaded");

    let mut drivers: Vec<Arc<dyn Driver>> = Vec::new();

    for (label, network) in config.networks() {
        match network.kind {
            DriverKind::EvmMv3 => {
                info!(network = label, chain = %network.id, "Connecting driver");

                let driver = EvmDriver::connect(network, signer.clone())
                    .await
                    .wrap_err_with(|| format!("failed to connect driver for network {label}"))?;

                drivers.push(Arc::new(driver));
            }

            DriverKind::Reef => {
                bail!("driver family Reef is not built into this node (network {label})");
            }
        }
    }

    if drivers.is_empty() {
        bail!("no networks configured");
    }

    let keypair = match &env.p2p_private_key {
        Some(bytes) => Keypair::from_protobuf_encoding(bytes).wrap_err("bad P2P_PRIVATE_KEY")?,
        None => {
            info!("No P2P_PRIVATE_KEY set, generating an ephemeral overlay identity");
            Keypair::generate_ed25519()
        }
    };

    if let Some(port) = env.data_stream_port {
        // The broadcaster itself is an external collaborator; it attaches
        // through the engine's sink seam.
        info!(port, ws_port = ?env.ws_port(), "Data-stream broadcaster enabled");
    }

    let net_config = NetConfig::new(env.listen_addr()?)
        .with_bootstrap_peers(env.bootstrap_peers.clone());

    let bus = Bus::spawn(keypair, net_config, registry, metrics.clone(), None).await?;

    // Feature plug-ins are registered here as they are added to the build.
    let features = Arc::new(FeatureRegistry::new());

    let vladiator = Vladiator::new(
        identity.clone(),
        DriverTable::new(drivers),
        features,
        Vec::new(),
        bus.clone(),
        metrics,
    )
    .spawn(None)
    .await?;

    let (node, node_handle) =
        Node::new(bus.clone(), vladiator.clone(), tracing::info_span!("node")).spawn().await?;

    let heartbeat = heartbeat::spawn(bus.clone(), identity);

    info!("Validator up");

    tokio::signal::ctrl_c().await?;

    info!("Shutting down");

    heartbeat.abort();
    vladiator.stop(None);
    bus.stop(None);
    node.stop(None);

    let _ = node_handle.await;

    Ok(())
}
