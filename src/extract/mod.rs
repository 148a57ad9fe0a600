pub mod reward;

use crate::chain::ChainStateReader;
use crate::error::ExtractionError;
use crate::metrics::{namespace_attrs, INDEXER_METRICS};
use crate::model::Persistable;
use crate::types::ActorInfo;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info_span, Instrument};

pub use reward::RewardExtractor;

/// Decodes one actor type's state at a fixed epoch into a persistable
/// record. Implementations hold no mutable state and are safe to invoke
/// concurrently for different actors and epochs.
#[async_trait]
pub trait ActorExtractor: std::fmt::Debug + Send + Sync {
    /// Task namespace this extractor's measurements are tagged with.
    fn name(&self) -> &'static str;

    async fn extract(
        &self,
        info: &ActorInfo,
        chain: &dyn ChainStateReader,
    ) -> Result<Box<dyn Persistable>, ExtractionError>;
}

/// Write-once lookup table from actor code to extractor.
///
/// Constructed and populated during bootstrap, then shared by reference
/// with every worker; there is no hidden global registry, so tests can
/// substitute their own.
#[derive(Default)]
pub struct ExtractorRegistry {
    by_code: HashMap<String, Arc<dyn ActorExtractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bootstrap-only. Panics on a duplicate code: ambiguous dispatch must
    /// surface at startup, not at extraction time.
    pub fn register(&mut self, code: impl Into<String>, extractor: Arc<dyn ActorExtractor>) {
        let code = code.into();
        if let Some(existing) = self.by_code.get(&code) {
            panic!(
                "extractor {} already registered for actor code {code}, refusing {}",
                existing.name(),
                extractor.name()
            );
        }
        self.by_code.insert(code, extractor);
    }

    pub fn resolve(&self, code: &str) -> Result<Arc<dyn ActorExtractor>, ExtractionError> {
        self.by_code
            .get(code)
            .cloned()
            .ok_or_else(|| ExtractionError::NotFound(code.to_string()))
    }

    /// Distinct task namespaces of the registered extractors, sorted.
    pub fn task_namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> =
            self.by_code.values().map(|e| e.name().to_string()).collect();
        names.sort();
        names.dedup();
        names
    }

    /// Resolve and invoke the extractor for the actor's code.
    ///
    /// The tracing span and the duration measurement live here, at the
    /// dispatch boundary, so individual extractors stay uninstrumented.
    pub async fn extract(
        &self,
        info: &ActorInfo,
        chain: &dyn ChainStateReader,
    ) -> Result<Box<dyn Persistable>, ExtractionError> {
        let extractor = self.resolve(&info.code)?;
        let span = info_span!(
            "extract",
            task = extractor.name(),
            actor = %info.address,
            epoch = info.epoch,
        );
        let started = Instant::now();
        let result = extractor.extract(info, chain).instrument(span).await;
        INDEXER_METRICS.processing_duration.record(
            started.elapsed().as_secs_f64() * 1e3,
            &namespace_attrs(extractor.name()),
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MockChainStateReader;
    use crate::types::task::TASK_REWARD;

    fn reward_registry() -> ExtractorRegistry {
        let mut registry = ExtractorRegistry::new();
        registry.register("bafkrewardcode", Arc::new(RewardExtractor));
        registry
    }

    #[test]
    fn resolve_returns_the_registered_extractor_every_time() {
        let registry = reward_registry();
        let first = registry.resolve("bafkrewardcode").unwrap();
        let second = registry.resolve("bafkrewardcode").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.name(), TASK_REWARD);
    }

    #[test]
    fn resolve_unregistered_code_fails_not_found() {
        let registry = reward_registry();
        let err = registry.resolve("bafkunknown").unwrap_err();
        assert!(matches!(err, ExtractionError::NotFound(code) if code == "bafkunknown"));
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn duplicate_registration_panics() {
        let mut registry = reward_registry();
        registry.register("bafkrewardcode", Arc::new(RewardExtractor));
    }

    #[test]
    fn task_namespaces_are_deduplicated() {
        let mut registry = ExtractorRegistry::new();
        for code in reward::REWARD_ACTOR_CODES {
            registry.register(*code, Arc::new(RewardExtractor));
        }
        assert_eq!(registry.task_namespaces(), vec![TASK_REWARD.to_string()]);
    }

    #[tokio::test]
    async fn extract_dispatches_by_actor_code() {
        let registry = reward_registry();
        let chain = MockChainStateReader::new();
        let info = ActorInfo {
            address: "f02".into(),
            code: "bafkunknown".into(),
            head: "bafyhead".into(),
            epoch: 1,
            parent_state_root: "bafyroot".into(),
        };
        let err = registry.extract(&info, &chain).await.unwrap_err();
        assert!(matches!(err, ExtractionError::NotFound(_)));
    }
}
