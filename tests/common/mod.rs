// Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use servant_evictor::error::StoreError;
use servant_evictor::prelude::*;

/// Store with a fetch counter, optional latency and switchable failures.
#[derive(Default)]
pub struct FakeStore {
    records: Mutex<HashMap<String, String>>,
    fetches: AtomicUsize,
    latency: Mutex<Option<Duration>>,
    failing: AtomicBool,
}

impl FakeStore {
    pub fn with_records(records: &[(&str, &str)]) -> Self {
        let store = Self::default();
        for (identity, state) in records {
            store.put(identity, state);
        }
        store
    }

    pub fn put(&self, identity: &str, state: &str) {
        self.records
            .lock()
            .insert(identity.to_string(), state.to_string());
    }

    pub fn remove(&self, identity: &str) {
        self.records.lock().remove(identity);
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl PersistentStore for FakeStore {
    type State = String;

    fn get(&self, identity: &Identity) -> Result<Option<String>, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            thread::sleep(latency);
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected failure".into()));
        }
        Ok(self.records.lock().get(identity.as_str()).cloned())
    }
}

/// Servant whose `get` operation returns the state it was built from.
pub struct Record {
    pub state: String,
}

impl Servant for Record {
    fn dispatch(&self, current: &Current, payload: &[u8]) -> Result<Vec<u8>, UserException> {
        match current.operation.as_str() {
            "get" => Ok(self.state.clone().into_bytes()),
            "echo" => Ok(payload.to_vec()),
            "fail" => Err(UserException::new("Refused", "operation refused")),
            "slow" => {
                thread::sleep(Duration::from_millis(30));
                Ok(Vec::new())
            },
            other => panic!("unsupported operation {}", other),
        }
    }
}

pub fn record_factory(_: &Identity, state: String) -> ServantHandle {
    Arc::new(Record { state })
}

pub type RecordFactory = fn(&Identity, String) -> ServantHandle;
pub type TestEvictor = Evictor<Arc<FakeStore>, RecordFactory>;

pub fn evictor(capacity: usize, store: &Arc<FakeStore>) -> TestEvictor {
    Evictor::new(capacity, Arc::clone(store), record_factory as RecordFactory)
}

/// Calls the `get` operation directly on a located servant.
pub fn state_of(located: &Located) -> String {
    let current = Current {
        adapter: Arc::from("test"),
        identity: Identity::new("-"),
        operation: "get".into(),
    };
    let body = located
        .servant
        .dispatch(&current, &[])
        .expect("get never fails");
    String::from_utf8(body).expect("utf-8 state")
}
