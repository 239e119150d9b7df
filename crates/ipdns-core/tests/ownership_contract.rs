//! Contract Test: Record Set Ownership
//!
//! The first client to write a record set owns it. Only the owner may change
//! its addresses afterwards.
//!
//! Constraints verified:
//! - Unclaimed record sets are created with the writer as owner
//! - The owner's writes replace the addresses and keep owner and TTL
//! - A different client's write is refused and nothing is written
//! - Ownership is never released
//!
//! If this test fails, clients can hijack each other's names.

mod common;

use common::*;
use ipdns_core::traits::{AddressFamily, RecordSet};
use ipdns_core::{EngineEvent, Error, UpsertAction};
use std::net::IpAddr;

fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

#[tokio::test]
async fn first_write_creates_owned_record_set() {
    let store = RecordingStore::new();
    let (engine, _events) = engine_over(&store);

    let report = engine
        .process(
            Some("Basic Zm9vOmJhcg=="),
            &fields(Some("1.2.3.4"), None, "www.foo.bar"),
        )
        .await
        .unwrap();

    let written = report.into_result().unwrap();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].action, UpsertAction::Created);
    assert_eq!(written[0].key.name, "www");
    assert_eq!(written[0].key.zone, "foo.bar");

    let record_set = store.record_set("www", AddressFamily::V4).unwrap();
    assert_eq!(record_set.owner.as_deref(), Some("foo"));
    assert_eq!(record_set.ttl, 3600);
    assert_eq!(record_set.addresses, vec![ip("1.2.3.4")]);
}

#[tokio::test]
async fn owner_replaces_addresses() {
    let mut existing = RecordSet::claimed_by("foo", 600, ip("5.6.7.8"));
    existing.addresses.push(ip("9.9.9.9"));
    let store = RecordingStore::new().with_record_set("www", AddressFamily::V4, existing);
    let (engine, _events) = engine_over(&store);

    let report = engine
        .process(
            Some(&basic("foo", "bar")),
            &fields(Some("1.2.3.4"), None, "www.foo.bar"),
        )
        .await
        .unwrap();
    assert!(report.is_success());

    let record_set = store.record_set("www", AddressFamily::V4).unwrap();
    assert_eq!(record_set.addresses, vec![ip("1.2.3.4")]);
    assert_eq!(record_set.owner.as_deref(), Some("foo"));
    assert_eq!(record_set.ttl, 600, "TTL is pinned at creation");
}

#[tokio::test]
async fn other_owner_is_refused_without_write() {
    let existing = RecordSet::claimed_by("baz", 3600, ip("5.6.7.8"));
    let store =
        RecordingStore::new().with_record_set("www", AddressFamily::V4, existing.clone());
    let (engine, mut events) = engine_over(&store);

    let report = engine
        .process(
            Some(&basic("foo", "bar")),
            &fields(Some("1.2.3.4"), None, "www.foo.bar"),
        )
        .await
        .unwrap();

    match report.into_result() {
        Err(Error::OwnershipConflict {
            record_set_name,
            requesting_client,
            current_owner,
        }) => {
            assert_eq!(record_set_name, "www");
            assert_eq!(requesting_client, "foo");
            assert_eq!(current_owner.as_deref(), Some("baz"));
        }
        other => panic!("expected OwnershipConflict, got {:?}", other),
    }

    assert_eq!(store.write_calls(), 0);
    assert_eq!(store.record_set("www", AddressFamily::V4), Some(existing));
    assert!(drain(&mut events).iter().any(|event| matches!(
        event,
        EngineEvent::OwnershipConflict { current_owner: Some(owner), .. } if owner == "baz"
    )));
}

#[tokio::test]
async fn ownership_survives_repeated_writes() {
    let store = RecordingStore::new();
    let (engine, _events) = engine_over(&store);

    for address in ["1.1.1.1", "2.2.2.2", "3.3.3.3"] {
        engine
            .process(
                Some(&basic("foo", "bar")),
                &fields(Some(address), None, "home.foo.bar"),
            )
            .await
            .unwrap()
            .into_result()
            .unwrap();
    }

    let record_set = store.record_set("home", AddressFamily::V4).unwrap();
    assert_eq!(record_set.owner.as_deref(), Some("foo"));
    assert_eq!(record_set.addresses, vec![ip("3.3.3.3")]);
    assert_eq!(store.write_calls(), 3);
}

#[tokio::test]
async fn ownership_is_per_family() {
    // baz owns the A record set only; the AAAA record set is free
    let store = RecordingStore::new().with_record_set(
        "www",
        AddressFamily::V4,
        RecordSet::claimed_by("baz", 3600, ip("5.6.7.8")),
    );
    let (engine, _events) = engine_over(&store);

    let report = engine
        .process(
            Some(&basic("foo", "bar")),
            &fields(None, Some("2001:db8::1"), "www.foo.bar"),
        )
        .await
        .unwrap();

    assert!(report.is_success());
    let aaaa = store.record_set("www", AddressFamily::V6).unwrap();
    assert_eq!(aaaa.owner.as_deref(), Some("foo"));
}
