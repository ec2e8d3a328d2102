//! Process store lookup contract.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::thread;

use serde_json::json;

use silo_core::{DataStore, ErrorCode, Key};

#[test]
fn set_then_get_returns_value() {
    let store = DataStore::new();
    store.set("appName", "demo".to_string());
    assert_eq!(store.get_cloned::<String>("appName").unwrap(), "demo");
}

#[test]
fn overwrite_replaces_value_and_type() {
    let store = DataStore::new();
    store.set("limit", 10u64);
    store.set("limit", json!({ "max": 20 }));

    let v = store.get::<serde_json::Value>("limit").unwrap();
    assert_eq!(v["max"], 20);
    assert_eq!(
        store.get::<u64>("limit").unwrap_err().code(),
        ErrorCode::TypeMismatch
    );
}

#[test]
fn unset_key_is_key_not_found() {
    let store = DataStore::new();
    let err = store.get::<String>("missing").expect_err("must fail");
    assert_eq!(err.code().as_str(), "KEY_NOT_FOUND");
    assert!(err.to_string().contains("missing"));
}

#[test]
fn incompatible_type_is_type_mismatch() {
    let store = DataStore::new();
    store.set("flag", true);
    let err = store.get::<String>("flag").expect_err("must fail");
    assert_eq!(err.code(), ErrorCode::TypeMismatch);
}

#[test]
fn trait_objects_round_trip_behind_arc() {
    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }
    struct En;
    impl Greeter for En {
        fn greet(&self) -> String {
            "hello".into()
        }
    }

    const GREETER: Key<Arc<dyn Greeter>> = Key::new("greeter");

    let store = DataStore::new();
    store.put(&GREETER, Arc::new(En) as Arc<dyn Greeter>);
    assert_eq!(store.fetch_cloned(&GREETER).unwrap().greet(), "hello");
}

#[test]
fn concurrent_writers_do_not_lose_updates() {
    let store = DataStore::new();
    let mut handles = Vec::new();

    for t in 0..8u32 {
        let store = store.clone();
        handles.push(thread::spawn(move || {
            for i in 0..500u32 {
                let key = format!("t{t}-{i}");
                store.set(key.clone(), t * 10_000 + i);
                assert_eq!(store.get_cloned::<u32>(&key).unwrap(), t * 10_000 + i);
                // shared key: readers must always see a whole u32
                store.set("shared", i);
                let _ = store.get::<u32>("shared").unwrap();
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(store.len(), 8 * 500 + 1);
    assert_eq!(store.get_cloned::<u32>("t7-499").unwrap(), 70_499);
}
