pub use crate::builder::EvictorBuilder;
pub use crate::config::EvictorConfig;
pub use crate::dispatch::{DispatchState, Dispatcher, Reply, Request};
pub use crate::error::{ConfigError, DispatchError, LocateError, StoreError};
pub use crate::evictor::{Cookie, Evictor, Located, Release};
pub use crate::identity::Identity;
pub use crate::locator::ServantLocator;
#[cfg(feature = "metrics")]
pub use crate::metrics::{EvictorMetricsSnapshot, MetricsSnapshotProvider};
pub use crate::servant::{Current, Servant, ServantFactory, ServantHandle, UserException};
pub use crate::store::{MemoryStore, PersistentStore};
