//! servant-evictor: a bounded LRU cache of live servants backed by a
//! persistent store, driven by a two-phase `locate` / `finished` protocol.
//!
//! See `DESIGN.md` for internal architecture and invariants.

pub mod builder;
pub mod config;
pub mod dispatch;
pub mod ds;
pub mod error;
pub mod evictor;
pub mod identity;
pub mod locator;

#[cfg(feature = "metrics")]
pub mod metrics;

pub mod prelude;
pub mod servant;
pub mod store;

pub use crate::dispatch::{Dispatcher, Reply, Request};
pub use crate::evictor::{Cookie, Evictor, Located, Release};
pub use crate::identity::Identity;
pub use crate::locator::ServantLocator;
