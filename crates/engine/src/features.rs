//! Feature plug-ins.
//!
//! A feature consumes the `featureData` attached to an on-chain message and
//! produces a `featureReply` bundled with the signature. Features are
//! registered explicitly at startup; there is no dynamic discovery.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use vladiator_core::Message;
use vladiator_driver::Driver;

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("no feature registered under id {0}")]
    Unknown(u32),

    #[error("feature failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait Feature: Send + Sync {
    fn feature_id(&self) -> u32;

    fn feature_name(&self) -> &str;

    fn feature_description(&self) -> &str;

    /// Transform a validated message, typically attaching `feature_reply`.
    /// Returning `feature_failed = true` counts as a failure.
    async fn process(
        &self,
        driver: Arc<dyn Driver>,
        message: Message,
    ) -> Result<Message, FeatureError>;

    /// Extra validity hook for inbound frames carrying this feature.
    async fn is_message_valid(
        &self,
        _driver: Arc<dyn Driver>,
        _message: &Message,
    ) -> Result<bool, FeatureError> {
        Ok(true)
    }
}

/// Features keyed by numeric id.
#[derive(Default)]
pub struct FeatureRegistry {
    features: BTreeMap<u32, Arc<dyn Feature>>,
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a feature; the last registration for an id wins.
    pub fn register(&mut self, feature: Arc<dyn Feature>) {
        self.features.insert(feature.feature_id(), feature);
    }

    pub fn get(&self, feature_id: u32) -> Option<&Arc<dyn Feature>> {
        self.features.get(&feature_id)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Dispatch `process` under failure isolation: an unknown id, an error,
    /// a `feature_failed` reply or a panic inside the feature all surface as
    /// a [`FeatureError`] without taking the caller down.
    pub async fn process(
        &self,
        feature_id: u32,
        driver: Arc<dyn Driver>,
        message: Message,
    ) -> Result<Message, FeatureError> {
        let feature = self
            .features
            .get(&feature_id)
            .cloned()
            .ok_or(FeatureError::Unknown(feature_id))?;

        let handle = tokio::spawn(async move { feature.process(driver, message).await });

        let processed = match handle.await {
            Ok(result) => result?,
            Err(e) => return Err(FeatureError::Failed(format!("feature panicked: {e}"))),
        };

        if processed.feature_failed == Some(true) {
            return Err(FeatureError::Failed(format!(
                "feature {feature_id} reported failure"
            )));
        }

        Ok(processed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use vladiator_core::Topic;

    struct Echo;

    #[async_trait]
    impl Feature for Echo {
        fn feature_id(&self) -> u32 {
            7
        }

        fn feature_name(&self) -> &str {
            "echo"
        }

        fn feature_description(&self) -> &str {
            "replies with the feature data it was given"
        }

        async fn process(
            &self,
            _driver: Arc<dyn Driver>,
            mut message: Message,
        ) -> Result<Message, FeatureError> {
            message.feature_reply = message.feature_data.clone();
            Ok(message)
        }
    }

    struct Panicky;

    #[async_trait]
    impl Feature for Panicky {
        fn feature_id(&self) -> u32 {
            8
        }

        fn feature_name(&self) -> &str {
            "panicky"
        }

        fn feature_description(&self) -> &str {
            "always panics"
        }

        async fn process(
            &self,
            _driver: Arc<dyn Driver>,
            _message: Message,
        ) -> Result<Message, FeatureError> {
            panic!("boom");
        }
    }

    fn registry() -> FeatureRegistry {
        let mut registry = FeatureRegistry::new();
        registry.register(Arc::new(Echo));
        registry.register(Arc::new(Panicky));
        registry
    }

    fn message() -> Message {
        Message {
            feature_id: Some(7),
            feature_data: Some("0xcafe".to_string()),
            ..Message::new(Topic::MessageRequest, "peer", 1)
        }
    }

    // The registry tests don't exercise the driver, but `process` takes one.
    mod stub {
        use super::*;
        use vladiator_driver::{DriverError, TransactionData};

        pub struct StubDriver;

        #[async_trait]
        impl Driver for StubDriver {
            fn chain_id(&self) -> u64 {
                1
            }

            fn name(&self) -> &str {
                "stub"
            }

            fn signer_address(&self) -> String {
                "0x0000000000000000000000000000000000000000".to_string()
            }

            async fn populate_message(&self, _message: &mut Message) -> Result<(), DriverError> {
                Ok(())
            }

            async fn is_message_valid(&self, _message: &Message) -> Result<bool, DriverError> {
                Ok(true)
            }

            async fn is_message_processed(&self, _message: &Message) -> Result<bool, DriverError> {
                Ok(false)
            }

            async fn sign_transaction_data(
                &self,
                _tx: &TransactionData,
            ) -> Result<String, DriverError> {
                Ok("0x00".to_string())
            }

            async fn get_chainsig(&self) -> Result<String, DriverError> {
                Ok("0x0000000000000000000000000000000000000000".to_string())
            }

            async fn get_exsig(&self, _project: &str) -> Result<String, DriverError> {
                Ok("0x0000000000000000000000000000000000000000".to_string())
            }
        }
    }

    fn driver() -> Arc<dyn Driver> {
        Arc::new(stub::StubDriver)
    }

    #[tokio::test]
    async fn dispatches_by_id() {
        let processed = registry().process(7, driver(), message()).await.unwrap();
        assert_eq!(processed.feature_reply.as_deref(), Some("0xcafe"));
    }

    #[tokio::test]
    async fn unknown_id_is_an_error() {
        let err = registry().process(99, driver(), message()).await.unwrap_err();
        assert!(matches!(err, FeatureError::Unknown(99)));
    }

    #[tokio::test]
    async fn panics_are_isolated() {
        let err = registry().process(8, driver(), message()).await.unwrap_err();
        assert!(matches!(err, FeatureError::Failed(_)));
    }

    #[tokio::test]
    async fn feature_failed_reply_is_a_failure() {
        struct Defeatist;

        #[async_trait]
        impl Feature for Defeatist {
            fn feature_id(&self) -> u32 {
                9
            }

            fn feature_name(&self) -> &str {
                "defeatist"
            }

            fn feature_description(&self) -> &str {
                "marks its own output as failed"
            }

            async fn process(
                &self,
                _driver: Arc<dyn Driver>,
                mut message: Message,
            ) -> Result<Message, FeatureError> {
                message.feature_failed = Some(true);
                Ok(message)
            }
        }

        let mut registry = FeatureRegistry::new();
        registry.register(Arc::new(Defeatist));

        let err = registry.process(9, driver(), message()).await.unwrap_err();
        assert!(matches!(err, FeatureError::Failed(_)));
    }
}
