//! Phonebook demo: contacts live in a store, servants are materialized on
//! demand and evicted once more than `capacity` have been touched.
//!
//! Run with `RUST_LOG=servant_evictor=debug cargo run --example phonebook`.

use std::sync::Arc;

use parking_lot::Mutex;
use servant_evictor::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct Contact {
    name: String,
    phone: String,
}

struct ContactServant {
    contact: Mutex<Contact>,
}

impl Servant for ContactServant {
    fn dispatch(&self, current: &Current, payload: &[u8]) -> Result<Vec<u8>, UserException> {
        let mut contact = self.contact.lock();
        match current.operation.as_str() {
            "getName" => Ok(contact.name.clone().into_bytes()),
            "getPhone" => Ok(contact.phone.clone().into_bytes()),
            "setPhone" => {
                let phone = String::from_utf8(payload.to_vec())
                    .map_err(|_| UserException::new("InvalidPhone", "phone is not utf-8"))?;
                if phone.is_empty() {
                    return Err(UserException::new("InvalidPhone", "phone must not be empty"));
                }
                contact.phone = phone;
                Ok(Vec::new())
            },
            other => Err(UserException::new("UnknownOperation", other)),
        }
    }
}

fn contact_servant(_: &Identity, contact: Contact) -> ServantHandle {
    Arc::new(ContactServant {
        contact: Mutex::new(contact),
    })
}

fn show(dispatcher: &Dispatcher<impl ServantLocator>, request: Request) {
    let label = format!("{} {}", request.identity, request.operation);
    match dispatcher.dispatch(&request) {
        Ok(Reply::Success(body)) => println!("{:<24} -> {}", label, String::from_utf8_lossy(&body)),
        Ok(Reply::UserException(err)) => println!("{:<24} -> user exception {}", label, err),
        Err(err) => println!("{:<24} -> error: {}", label, err),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let store = MemoryStore::from_records([
        (
            "alice",
            Contact {
                name: "Alice".into(),
                phone: "555-0100".into(),
            },
        ),
        (
            "bob",
            Contact {
                name: "Bob".into(),
                phone: "555-0101".into(),
            },
        ),
        (
            "carol",
            Contact {
                name: "Carol".into(),
                phone: "555-0102".into(),
            },
        ),
    ]);

    let config: EvictorConfig = serde_json::from_str(r#"{ "capacity": 2, "adapter": "phonebook" }"#)?;
    let evictor = Arc::new(EvictorBuilder::from_config(config).build(store, contact_servant)?);
    let dispatcher = Dispatcher::new(evictor.adapter().to_string(), Arc::clone(&evictor));

    show(&dispatcher, Request::new("alice", "getName"));
    show(&dispatcher, Request::new("bob", "getPhone"));
    show(&dispatcher, Request::new("alice", "setPhone").with_payload(b"555-0199".to_vec()));
    show(&dispatcher, Request::new("carol", "getName"));
    show(&dispatcher, Request::new("bob", "getName"));
    show(&dispatcher, Request::new("dave", "getName"));
    show(&dispatcher, Request::new("carol", "setPhone"));

    // Destroying a contact removes its record and its servant.
    evictor.store().remove("bob");
    evictor.invalidate(&Identity::new("bob"));
    show(&dispatcher, Request::new("bob", "getName"));

    info!(resident = ?evictor.resident_identities(), "final residency");
    let snapshot = evictor.metrics_snapshot();
    println!(
        "hits={} misses={} evictions={} hit_ratio={:.2}",
        snapshot.hits,
        snapshot.misses,
        snapshot.evictions,
        snapshot.hit_ratio()
    );
    Ok(())
}
