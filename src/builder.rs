//! Builder for evictors.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use servant_evictor::builder::EvictorBuilder;
//! use servant_evictor::prelude::*;
//!
//! struct Counter;
//!
//! impl Servant for Counter {
//!     fn dispatch(&self, _: &Current, _: &[u8]) -> Result<Vec<u8>, UserException> {
//!         Ok(Vec::new())
//!     }
//! }
//!
//! let store = MemoryStore::from_records([("c1", 0u64)]);
//! let evictor = EvictorBuilder::new(8)
//!     .adapter("counters")
//!     .build(store, |_: &Identity, _: u64| -> ServantHandle { Arc::new(Counter) })
//!     .unwrap();
//! assert_eq!(evictor.adapter(), "counters");
//! assert_eq!(evictor.capacity(), 8);
//! ```

use crate::config::EvictorConfig;
use crate::error::ConfigError;
use crate::evictor::Evictor;
use crate::servant::ServantFactory;
use crate::store::PersistentStore;

/// Collects evictor settings before the store and factory are supplied.
#[derive(Debug, Clone)]
pub struct EvictorBuilder {
    config: EvictorConfig,
}

impl EvictorBuilder {
    /// Starts a builder for an evictor with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            config: EvictorConfig {
                capacity,
                ..EvictorConfig::default()
            },
        }
    }

    /// Starts a builder from a loaded configuration.
    pub fn from_config(config: EvictorConfig) -> Self {
        Self { config }
    }

    /// Sets the serving scope name.
    pub fn adapter(mut self, adapter: impl Into<String>) -> Self {
        self.config.adapter = adapter.into();
        self
    }

    pub fn config(&self) -> &EvictorConfig {
        &self.config
    }

    /// Validates the settings and builds the evictor.
    pub fn build<P, F>(self, store: P, factory: F) -> Result<Evictor<P, F>, ConfigError>
    where
        P: PersistentStore,
        F: ServantFactory<P::State>,
    {
        self.config.validate()?;
        Ok(Evictor::with_adapter(
            &self.config.adapter,
            self.config.capacity,
            store,
            factory,
        ))
    }
}

impl Default for EvictorBuilder {
    fn default() -> Self {
        Self::from_config(EvictorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;
    use crate::servant::{Current, Servant, ServantHandle, UserException};
    use crate::store::MemoryStore;
    use std::sync::Arc;

    struct Unit;

    impl Servant for Unit {
        fn dispatch(&self, _: &Current, _: &[u8]) -> Result<Vec<u8>, UserException> {
            Ok(Vec::new())
        }
    }

    fn unit(_: &Identity, _: ()) -> ServantHandle {
        Arc::new(Unit)
    }

    #[test]
    fn default_builder_matches_default_config() {
        let builder = EvictorBuilder::default();
        assert_eq!(builder.config(), &EvictorConfig::default());
    }

    #[test]
    fn build_applies_capacity_and_adapter() {
        let evictor = EvictorBuilder::new(3)
            .adapter("a1")
            .build(MemoryStore::<()>::new(), unit)
            .unwrap();
        assert_eq!(evictor.capacity(), 3);
        assert_eq!(evictor.adapter(), "a1");
    }

    #[test]
    fn build_rejects_empty_adapter() {
        let err = EvictorBuilder::new(3)
            .adapter("")
            .build(MemoryStore::<()>::new(), unit)
            .unwrap_err();
        assert!(err.message().contains("adapter"));
    }

    #[test]
    fn zero_capacity_is_accepted() {
        let evictor = EvictorBuilder::new(0)
            .build(MemoryStore::<()>::new(), unit)
            .unwrap();
        assert_eq!(evictor.capacity(), 0);
    }
}
