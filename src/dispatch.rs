//! Request dispatch through a [`ServantLocator`].
//!
//! ## Per-request State Machine
//!
//! ```text
//!   Arrived ──► Locating ──┬──► Dispatching ──► Completing ──► Done
//!                          │
//!                          ├──► UnknownObject      (locate returned no servant)
//!                          └──► Unavailable        (store failed during locate)
//! ```
//!
//! `finished` is issued by a [`FinishedGuard`] created as soon as `locate`
//! returns a servant, so it runs exactly once on every path out of
//! `Dispatching`: normal return, user exception, or a panic in the servant.
//! Requests that end in `UnknownObject` or `Unavailable` never hold a servant
//! and never call `finished`.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::DispatchError;
use crate::evictor::Cookie;
use crate::identity::Identity;
use crate::locator::ServantLocator;
use crate::servant::{Current, ServantHandle, UserException};

/// Where a request is in the locate/dispatch/finished protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchState {
    Arrived,
    Locating,
    Dispatching,
    Completing,
    Done,
    UnknownObject,
    Unavailable,
}

impl DispatchState {
    /// Returns `true` if the request can make no further progress.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DispatchState::Done | DispatchState::UnknownObject | DispatchState::Unavailable
        )
    }

    /// Returns `true` if `self → next` is a legal transition.
    pub fn can_transition_to(self, next: DispatchState) -> bool {
        use DispatchState::*;
        matches!(
            (self, next),
            (Arrived, Locating)
                | (Locating, Dispatching)
                | (Locating, UnknownObject)
                | (Locating, Unavailable)
                | (Dispatching, Completing)
                | (Completing, Done)
        )
    }
}

/// Inbound request addressed to one identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub identity: Identity,
    pub operation: String,
    pub payload: Vec<u8>,
}

impl Request {
    pub fn new(identity: impl Into<Identity>, operation: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            operation: operation.into(),
            payload: Vec::new(),
        }
    }

    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }
}

/// Normal completion of a dispatched request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Success(Vec<u8>),
    UserException(UserException),
}

/// Result of a dispatch together with the states it went through.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub result: Result<Reply, DispatchError>,
    pub trail: Vec<DispatchState>,
}

impl DispatchOutcome {
    /// Final state of the request.
    pub fn state(&self) -> DispatchState {
        self.trail.last().copied().unwrap_or(DispatchState::Arrived)
    }
}

struct StateTrail {
    states: Vec<DispatchState>,
}

impl StateTrail {
    fn new() -> Self {
        Self {
            states: vec![DispatchState::Arrived],
        }
    }

    fn current(&self) -> DispatchState {
        self.states.last().copied().unwrap_or(DispatchState::Arrived)
    }

    fn advance(&mut self, next: DispatchState, identity: &Identity) {
        let from = self.current();
        debug_assert!(
            from.can_transition_to(next),
            "illegal dispatch transition {:?} -> {:?}",
            from,
            next
        );
        debug!(identity = %identity, ?from, to = ?next, "dispatch transition");
        self.states.push(next);
    }
}

/// Calls `finished` when dropped.
pub struct FinishedGuard<'a, L: ServantLocator + ?Sized> {
    locator: &'a L,
    current: &'a Current,
    servant: ServantHandle,
    cookie: Cookie,
}

impl<'a, L: ServantLocator + ?Sized> FinishedGuard<'a, L> {
    pub fn new(locator: &'a L, current: &'a Current, servant: ServantHandle, cookie: Cookie) -> Self {
        Self {
            locator,
            current,
            servant,
            cookie,
        }
    }

    pub fn servant(&self) -> &ServantHandle {
        &self.servant
    }
}

impl<L: ServantLocator + ?Sized> Drop for FinishedGuard<'_, L> {
    fn drop(&mut self) {
        self.locator.finished(self.current, &self.servant, self.cookie);
    }
}

/// Delivers requests to servants found through a locator.
pub struct Dispatcher<L> {
    adapter: Arc<str>,
    locator: L,
}

impl<L: ServantLocator> Dispatcher<L> {
    pub fn new(adapter: impl AsRef<str>, locator: L) -> Self {
        Self {
            adapter: Arc::from(adapter.as_ref()),
            locator,
        }
    }

    pub fn adapter(&self) -> &str {
        &self.adapter
    }

    pub fn locator(&self) -> &L {
        &self.locator
    }

    /// Dispatches `request` and returns its result.
    pub fn dispatch(&self, request: &Request) -> Result<Reply, DispatchError> {
        self.dispatch_traced(request).result
    }

    /// Dispatches `request`, also returning the protocol states it visited.
    pub fn dispatch_traced(&self, request: &Request) -> DispatchOutcome {
        let mut trail = StateTrail::new();
        let current = Current {
            adapter: Arc::clone(&self.adapter),
            identity: request.identity.clone(),
            operation: request.operation.clone(),
        };

        trail.advance(DispatchState::Locating, &current.identity);
        let located = match self.locator.locate(&current) {
            Ok(Some(located)) => located,
            Ok(None) => {
                trail.advance(DispatchState::UnknownObject, &current.identity);
                return DispatchOutcome {
                    result: Err(DispatchError::ObjectNotExist {
                        identity: current.identity.clone(),
                    }),
                    trail: trail.states,
                };
            },
            Err(err) => {
                warn!(adapter = %self.adapter, error = %err, "locate failed");
                trail.advance(DispatchState::Unavailable, &current.identity);
                return DispatchOutcome {
                    result: Err(err.into()),
                    trail: trail.states,
                };
            },
        };

        trail.advance(DispatchState::Dispatching, &current.identity);
        let result = {
            let guard = FinishedGuard::new(&self.locator, &current, located.servant, located.cookie);
            let servant = guard.servant();
            let invoked = panic::catch_unwind(AssertUnwindSafe(|| {
                servant.dispatch(&current, &request.payload)
            }));
            trail.advance(DispatchState::Completing, &current.identity);
            match invoked {
                Ok(Ok(body)) => Ok(Reply::Success(body)),
                Ok(Err(user)) => Ok(Reply::UserException(user)),
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!(
                        adapter = %self.adapter,
                        identity = %current.identity,
                        operation = %current.operation,
                        %message,
                        "servant panicked"
                    );
                    Err(DispatchError::UnknownException {
                        identity: current.identity.clone(),
                        operation: current.operation.clone(),
                        message,
                    })
                },
            }
            // guard dropped here: finished
        };
        trail.advance(DispatchState::Done, &current.identity);

        DispatchOutcome {
            result,
            trail: trail.states,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "servant panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LocateError, StoreError};
    use crate::evictor::Located;
    use parking_lot::Mutex;

    #[test]
    fn legal_transitions() {
        use DispatchState::*;
        assert!(Arrived.can_transition_to(Locating));
        assert!(Locating.can_transition_to(UnknownObject));
        assert!(Completing.can_transition_to(Done));
        assert!(!Locating.can_transition_to(Done));
        assert!(!UnknownObject.can_transition_to(Completing));
        assert!(!Done.can_transition_to(Locating));
        assert!(Done.is_terminal());
        assert!(UnknownObject.is_terminal());
        assert!(!Dispatching.is_terminal());
    }

    struct Echo;

    impl crate::servant::Servant for Echo {
        fn dispatch(&self, current: &Current, payload: &[u8]) -> Result<Vec<u8>, UserException> {
            match current.operation.as_str() {
                "echo" => Ok(payload.to_vec()),
                "reject" => Err(UserException::new("Rejected", "no")),
                _ => panic!("unsupported operation {}", current.operation),
            }
        }
    }

    /// Locator that records every call.
    #[derive(Default)]
    struct Recording {
        calls: Mutex<Vec<String>>,
        missing: bool,
        failing: bool,
    }

    impl ServantLocator for Recording {
        fn locate(&self, current: &Current) -> Result<Option<Located>, LocateError> {
            self.calls.lock().push(format!("locate {}", current.identity));
            if self.failing {
                return Err(LocateError::StoreUnavailable {
                    identity: current.identity.clone(),
                    source: StoreError::Unavailable("down".into()),
                });
            }
            if self.missing {
                return Ok(None);
            }
            Ok(Some(test_located()))
        }

        fn finished(&self, current: &Current, _: &ServantHandle, _: Cookie) {
            self.calls.lock().push(format!("finished {}", current.identity));
        }
    }

    fn test_located() -> Located {
        let store = crate::store::MemoryStore::from_records([("x", 0u8)]);
        let evictor = crate::evictor::Evictor::new(1, store, |_: &Identity, _: u8| -> ServantHandle {
            Arc::new(Echo)
        });
        match evictor.locate(&Identity::new("x")) {
            Ok(Some(located)) => located,
            _ => panic!("test servant unavailable"),
        }
    }

    fn calls(dispatcher: &Dispatcher<Recording>) -> Vec<String> {
        dispatcher.locator().calls.lock().clone()
    }

    #[test]
    fn success_pairs_locate_with_finished() {
        let dispatcher = Dispatcher::new("test", Recording::default());
        let outcome = dispatcher.dispatch_traced(&Request::new("x", "echo").with_payload(b"hi".to_vec()));
        assert_eq!(outcome.result, Ok(Reply::Success(b"hi".to_vec())));
        assert_eq!(
            outcome.trail,
            vec![
                DispatchState::Arrived,
                DispatchState::Locating,
                DispatchState::Dispatching,
                DispatchState::Completing,
                DispatchState::Done,
            ]
        );
        assert_eq!(calls(&dispatcher), vec!["locate x", "finished x"]);
    }

    #[test]
    fn user_exception_is_a_normal_completion() {
        let dispatcher = Dispatcher::new("test", Recording::default());
        let outcome = dispatcher.dispatch_traced(&Request::new("x", "reject"));
        assert!(matches!(outcome.result, Ok(Reply::UserException(_))));
        assert_eq!(outcome.state(), DispatchState::Done);
        assert_eq!(calls(&dispatcher), vec!["locate x", "finished x"]);
    }

    #[test]
    fn servant_panic_still_calls_finished() {
        let dispatcher = Dispatcher::new("test", Recording::default());
        let outcome = dispatcher.dispatch_traced(&Request::new("x", "explode"));
        match &outcome.result {
            Err(DispatchError::UnknownException { message, .. }) => {
                assert!(message.contains("unsupported operation explode"));
            },
            other => panic!("unexpected result {:?}", other),
        }
        assert_eq!(outcome.state(), DispatchState::Done);
        assert_eq!(calls(&dispatcher), vec!["locate x", "finished x"]);
    }

    #[test]
    fn unknown_object_never_calls_finished() {
        let dispatcher = Dispatcher::new(
            "test",
            Recording {
                missing: true,
                ..Default::default()
            },
        );
        let outcome = dispatcher.dispatch_traced(&Request::new("ghost", "echo"));
        assert_eq!(
            outcome.result,
            Err(DispatchError::ObjectNotExist {
                identity: Identity::new("ghost"),
            })
        );
        assert_eq!(outcome.state(), DispatchState::UnknownObject);
        assert_eq!(calls(&dispatcher), vec!["locate ghost"]);
    }

    #[test]
    fn store_failure_surfaces_as_unavailable() {
        let dispatcher = Dispatcher::new(
            "test",
            Recording {
                failing: true,
                ..Default::default()
            },
        );
        let outcome = dispatcher.dispatch_traced(&Request::new("x", "echo"));
        assert!(matches!(
            outcome.result,
            Err(DispatchError::StoreUnavailable { .. })
        ));
        assert!(outcome.result.as_ref().unwrap_err().is_retryable());
        assert_eq!(outcome.state(), DispatchState::Unavailable);
        assert_eq!(calls(&dispatcher), vec!["locate x"]);
    }

    #[test]
    fn panic_message_extracts_strings() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42u32), "servant panicked");
    }
}
