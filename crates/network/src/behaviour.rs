use std::time::Duration;

use libp2p::swarm::NetworkBehaviour;
use libp2p::{gossipsub, identify, ping};

use vladiator_metrics::Registry;

pub use libp2p::identity::Keypair;

use crate::{BoxError, PROTOCOL_VERSION};

const MAX_TRANSMIT_SIZE: usize = 1024 * 1024; // 1 MiB

#[derive(NetworkBehaviour)]
pub struct Behaviour {
    pub gossipsub: gossipsub::Behaviour,
    pub identify: identify::Behaviour,
    pub ping: ping::Behaviour,
}

fn message_id(message: &gossipsub::Message) -> gossipsub::MessageId {
    use seahash::SeaHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = SeaHasher::new();
    message.hash(&mut hasher);
    gossipsub::MessageId::new(hasher.finish().to_be_bytes().as_slice())
}

fn gossipsub_config() -> gossipsub::Config {
    gossipsub::ConfigBuilder::default()
        .max_transmit_size(MAX_TRANSMIT_SIZE)
        .heartbeat_interval(Duration::from_secs(1))
        .validation_mode(gossipsub::ValidationMode::Strict)
        .history_gossip(3)
        .history_length(5)
        .message_id_fn(message_id)
        .build()
        .unwrap()
}

impl Behaviour {
    pub fn new_with_metrics(keypair: &Keypair, registry: &mut Registry) -> Result<Self, BoxError> {
        let gossipsub = gossipsub::Behaviour::new_with_metrics(
            gossipsub::MessageAuthenticity::Signed(keypair.clone()),
            gossipsub_config(),
            registry.sub_registry_with_prefix("gossipsub"),
            Default::default(),
        )?;

        let identify = identify::Behaviour::new(identify::Config::new(
            PROTOCOL_VERSION.to_string(),
            keypair.public(),
        ));

        let ping = ping::Behaviour::new(ping::Config::new().with_interval(Duration::from_secs(5)));

        Ok(Self {
            gossipsub,
            identify,
            ping,
        })
    }
}
