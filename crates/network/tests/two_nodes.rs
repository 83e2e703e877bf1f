use std::time::Duration;

use bytes::Bytes;
use tokio::time::{sleep, timeout};

use vladiator_core::{Message, Topic, TransferValues};
use vladiator_metrics::SharedRegistry;
use vladiator_network::{spawn, Config, Event, Keypair, Multiaddr};

const TEST_TIMEOUT: Duration = Duration::from_secs(20);

fn loopback() -> Multiaddr {
    "/ip4/127.0.0.1/tcp/0".parse().unwrap()
}

fn request_frame() -> Message {
    Message {
        transaction_hash: Some("0xfeed".to_string()),
        values: Some(TransferValues {
            tx_id: "7".to_string(),
            sender: "0x1111111111111111111111111111111111111111".to_string(),
            recipient: "0x2222222222222222222222222222222222222222".to_string(),
            chain: "56".to_string(),
            express: false,
            encoded_data: "0x".to_string(),
            confirmations: 1,
        }),
        ..Message::new(Topic::MessageRequest, "node-a", 1)
    }
}

async fn wait_listening(handle: &mut vladiator_network::Handle) -> Multiaddr {
    loop {
        match handle.recv().await.expect("gossip task died") {
            Event::Listening(addr) => return addr,
            _ => continue,
        }
    }
}

#[tokio::test]
async fn frames_propagate_between_two_nodes() {
    let registry = SharedRegistry::default();

    let mut alice = spawn(Keypair::generate_ed25519(), Config::new(loopback()), &registry)
        .await
        .expect("failed to spawn first node");

    let alice_addr = timeout(TEST_TIMEOUT, wait_listening(&mut alice))
        .await
        .expect("first node never started listening");

    let config = Config::new(loopback()).with_bootstrap_peers(vec![alice_addr]);
    let mut bob = spawn(Keypair::generate_ed25519(), config, &registry)
        .await
        .expect("failed to spawn second node");

    // Wait until both sides report the connection, then give the gossipsub
    // mesh a moment to exchange subscriptions.
    timeout(TEST_TIMEOUT, async {
        loop {
            if let Some(Event::PeerConnected(_)) = bob.recv().await {
                break;
            }
        }
    })
    .await
    .expect("second node never connected");

    sleep(Duration::from_secs(2)).await;

    let frame = request_frame();
    let data = Bytes::from(serde_json::to_vec(&frame).unwrap());

    // Gossip is best-effort: republish until the mesh carries the frame over.
    let received = timeout(TEST_TIMEOUT, async {
        loop {
            alice
                .publish(Topic::MessageRequest, data.clone())
                .await
                .expect("publish failed");

            let attempt = timeout(Duration::from_secs(1), async {
                loop {
                    match bob.recv().await.expect("gossip task died") {
                        Event::Message(_, topic, data) => return (topic, data),
                        _ => continue,
                    }
                }
            })
            .await;

            if let Ok(received) = attempt {
                return received;
            }
        }
    })
    .await
    .expect("frame never propagated");

    assert_eq!(received.0, Topic::MessageRequest);

    let decoded: Message = serde_json::from_slice(&received.1).unwrap();
    assert_eq!(decoded, frame);
}
