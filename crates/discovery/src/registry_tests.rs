// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use tokio::time::Instant;

use super::*;

fn names(registry: &Registry) -> Vec<String> {
    registry.iter().map(|i| format!("{}@{}", i.name, i.address)).collect()
}

#[test]
fn equality_ignores_origin_and_timestamps() {
    let mut a = ServiceInfo::new("svc", "10.0.0.1:9000");
    let b = ServiceInfo::new("svc", "10.0.0.1:9000");
    a.origin_id = "peer-a".to_owned();
    a.good_until += Duration::from_secs(5);
    assert_eq!(a, b);
    assert_eq!(a.key(), b.key());
    assert_ne!(a, ServiceInfo::new("svc", "10.0.0.2:9000"));
    assert_ne!(a, ServiceInfo::new("other", "10.0.0.1:9000"));
}

#[test]
fn discovered_copies_match_by_identity() {
    let mut reg = Registry::new();
    let mut remote = ServiceInfo::new("svc", "10.0.0.1:9000");
    remote.origin_id = "peer".to_owned();
    remote.good_until += Duration::from_secs(1);
    reg.upsert(remote);

    let found = reg.named("svc");
    assert!(found.contains(&ServiceInfo::new("svc", "10.0.0.1:9000")));
    assert!(!found.contains(&ServiceInfo::new("svc", "10.0.0.2:9000")));
}

#[test]
fn upsert_then_remove_leaves_registry_empty() {
    let mut reg = Registry::new();
    let info = ServiceInfo::new("svc", "10.0.0.1:9000");
    assert!(reg.upsert(info.clone()));
    assert_eq!(reg.len(), 1);
    assert!(reg.remove(&info.key()).is_some());
    assert!(reg.is_empty());
    assert!(reg.remove(&info.key()).is_none());
}

#[test]
fn upsert_existing_updates_in_place() {
    let mut reg = Registry::new();
    reg.upsert(ServiceInfo::new("a", "1"));
    reg.upsert(ServiceInfo::new("b", "2"));

    let mut refreshed = ServiceInfo::new("a", "1");
    refreshed.origin_id = "peer-b".to_owned();
    assert!(!reg.upsert(refreshed));

    assert_eq!(names(&reg), vec!["a@1", "b@2"]);
    let a = reg.find_mut(&ServiceInfo::new("a", "1").key());
    assert_eq!(a.map(|i| i.origin_id.clone()), Some("peer-b".to_owned()));
}

#[test]
fn removing_head_keeps_iteration_intact() {
    let mut reg = Registry::new();
    for (n, addr) in [("a", "1"), ("b", "2"), ("c", "3")] {
        reg.upsert(ServiceInfo::new(n, addr));
    }

    reg.remove(&ServiceInfo::new("a", "1").key());
    assert_eq!(names(&reg), vec!["b@2", "c@3"]);

    reg.remove(&ServiceInfo::new("b", "2").key());
    assert_eq!(names(&reg), vec!["c@3"]);

    reg.upsert(ServiceInfo::new("d", "4"));
    assert_eq!(names(&reg), vec!["c@3", "d@4"]);
}

#[test]
fn removing_tail_then_appending() {
    let mut reg = Registry::new();
    reg.upsert(ServiceInfo::new("a", "1"));
    reg.upsert(ServiceInfo::new("b", "2"));
    reg.remove(&ServiceInfo::new("b", "2").key());
    reg.upsert(ServiceInfo::new("c", "3"));
    assert_eq!(names(&reg), vec!["a@1", "c@3"]);
}

#[test]
fn retain_reports_removed_count() {
    let mut reg = Registry::new();
    reg.upsert(ServiceInfo::new("a", "1"));
    reg.upsert(ServiceInfo::new("a", "2"));
    reg.upsert(ServiceInfo::new("b", "3"));

    let removed = reg.retain(|i| i.name != "a");
    assert_eq!(removed, 2);
    assert_eq!(names(&reg), vec!["b@3"]);
}

#[test]
fn named_returns_copies_in_order() {
    let mut reg = Registry::new();
    reg.upsert(ServiceInfo::new("a", "1"));
    reg.upsert(ServiceInfo::new("b", "2"));
    reg.upsert(ServiceInfo::new("a", "3"));

    let mut found = reg.named("a");
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].address, "1");
    assert_eq!(found[1].address, "3");

    found[0].address = "mutated".to_owned();
    assert!(reg.find_mut(&ServiceInfo::new("a", "1").key()).is_some());
}

#[test]
fn clear_empties_everything() {
    let mut reg = Registry::new();
    reg.upsert(ServiceInfo::new("a", "1"));
    reg.upsert(ServiceInfo::new("b", "2"));
    reg.clear();
    assert!(reg.is_empty());
    assert_eq!(reg.iter().count(), 0);
}

#[test]
fn expiry_is_strict() {
    let mut info = ServiceInfo::new("a", "1");
    let now = Instant::now();
    info.good_until = now;
    assert!(!info.is_expired(now));
    assert!(info.is_expired(now + Duration::from_millis(1)));
}
