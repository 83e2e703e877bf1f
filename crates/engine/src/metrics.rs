use vladiator_metrics::{Counter, Gauge, SharedRegistry};

#[derive(Clone, Debug)]
pub struct Metrics {
    /// Frames received off the gossip bus (after decoding)
    pub frames_received: Counter,

    /// Frames published by this node
    pub frames_published: Counter,

    /// Frames dropped by the 5-second dedup window
    pub frames_deduplicated: Counter,

    /// Malformed frames dropped at ingress
    pub decode_errors: Counter,

    /// Requests accepted into the coordinator state machine
    pub requests_accepted: Counter,

    /// Requests dropped after exhausting the retry budget
    pub retries_exhausted: Counter,

    /// MESSAGE:SIGNED emissions, replays included
    pub signed: Counter,

    /// MESSAGE:INVALID emissions
    pub invalid: Counter,

    /// PENALTY:* emissions
    pub penalties: Counter,

    /// Feature invocations that ended in FEATURE:FAILED
    pub feature_failures: Counter,

    /// Number of connected gossip peers
    pub connected_peers: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            frames_received: Counter::default(),
            frames_published: Counter::default(),
            frames_deduplicated: Counter::default(),
            decode_errors: Counter::default(),
            requests_accepted: Counter::default(),
            retries_exhausted: Counter::default(),
            signed: Counter::default(),
            invalid: Counter::default(),
            penalties: Counter::default(),
            feature_failures: Counter::default(),
            connected_peers: Gauge::default(),
        }
    }

    pub fn register(registry: &SharedRegistry) -> Self {
        let metrics = Self::new();

        registry.with_prefix("vladiator", |registry| {
            registry.register(
                "frames_received",
                "Frames received off the gossip bus",
                metrics.frames_received.clone(),
            );
            registry.register(
                "frames_published",
                "Frames published by this node",
                metrics.frames_published.clone(),
            );
            registry.register(
                "frames_deduplicated",
                "Frames dropped by the dedup window",
                metrics.frames_deduplicated.clone(),
            );
            registry.register(
                "decode_errors",
                "Malformed frames dropped at ingress",
                metrics.decode_errors.clone(),
            );
            registry.register(
                "requests_accepted",
                "Requests accepted into the coordinator state machine",
                metrics.requests_accepted.clone(),
            );
            registry.register(
                "retries_exhausted",
                "Requests dropped after exhausting the retry budget",
                metrics.retries_exhausted.clone(),
            );
            registry.register(
                "signed",
                "MESSAGE:SIGNED emissions, replays included",
                metrics.signed.clone(),
            );
            registry.register(
                "invalid",
                "MESSAGE:INVALID emissions",
                metrics.invalid.clone(),
            );
            registry.register(
                "penalties",
                "PENALTY emissions",
                metrics.penalties.clone(),
            );
            registry.register(
                "feature_failures",
                "Feature invocations that failed",
                metrics.feature_failures.clone(),
            );
            registry.register(
                "connected_peers",
                "Number of connected gossip peers",
                metrics.connected_peers.clone(),
            );
        });

        metrics
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
