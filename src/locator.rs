//! The servant-locator capability consumed by the dispatcher.
//!
//! A locator has exactly two obligations: find (and pin) a servant before a
//! request is delivered, and release it after the request completes. The
//! dispatcher guarantees the pairing: `finished` runs once for every `locate`
//! that returned a servant, and never for one that did not.

use std::sync::Arc;

use crate::error::LocateError;
use crate::evictor::{Cookie, Evictor, Located};
use crate::servant::{Current, ServantFactory, ServantHandle};
use crate::store::PersistentStore;

/// Two-phase servant lookup used around every dispatch.
///
/// With this trait in scope, `locate`/`finished` called on an
/// `Arc<Evictor<..>>` resolve to the trait methods (taking `&Current`)
/// rather than the evictor's inherent ones. Call `Evictor::locate(&*arc, ..)`
/// to reach the identity-based API through an `Arc`.
pub trait ServantLocator: Send + Sync {
    /// Finds the servant for `current.identity`. `Ok(None)` means the object
    /// does not exist.
    fn locate(&self, current: &Current) -> Result<Option<Located>, LocateError>;

    /// Releases a servant returned by [`locate`](Self::locate).
    fn finished(&self, current: &Current, servant: &ServantHandle, cookie: Cookie);
}

impl<P, F> ServantLocator for Evictor<P, F>
where
    P: PersistentStore,
    F: ServantFactory<P::State>,
{
    fn locate(&self, current: &Current) -> Result<Option<Located>, LocateError> {
        Evictor::locate(self, &current.identity)
    }

    fn finished(&self, current: &Current, _servant: &ServantHandle, cookie: Cookie) {
        Evictor::finished(self, &current.identity, cookie);
    }
}

impl<L: ServantLocator + ?Sized> ServantLocator for Arc<L> {
    fn locate(&self, current: &Current) -> Result<Option<Located>, LocateError> {
        (**self).locate(current)
    }

    fn finished(&self, current: &Current, servant: &ServantHandle, cookie: Cookie) {
        (**self).finished(current, servant, cookie)
    }
}

impl<L: ServantLocator + ?Sized> ServantLocator for &L {
    fn locate(&self, current: &Current) -> Result<Option<Located>, LocateError> {
        (**self).locate(current)
    }

    fn finished(&self, current: &Current, servant: &ServantHandle, cookie: Cookie) {
        (**self).finished(current, servant, cookie)
    }
}
