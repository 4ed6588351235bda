// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ordered service registries.
//!
//! Each agent keeps two: `provided` (hosted locally, never expires) and
//! `known` (announced by peers, bounded by `good_until`). Records are keyed by
//! (name, address); insertion order is kept so broadcasts are deterministic.

use indexmap::IndexMap;
use tokio::time::Instant;

/// Identity of a service record. Two records are the same service iff both
/// name and address match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceKey {
    pub name: String,
    pub address: String,
}

/// A single service instance.
///
/// Equality is identity: two records are equal iff name and address match,
/// whatever their origin and timestamps.
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    /// Logical service name.
    pub name: String,
    /// Dial target.
    pub address: String,
    /// Last time this record was refreshed.
    pub updated_at: Instant,
    /// Absolute expiry deadline. Meaningless for locally provided records.
    pub good_until: Instant,
    /// Identifier of the agent that last announced this record. Empty for
    /// locally provided records.
    pub origin_id: String,
}

impl ServiceInfo {
    /// A record for a locally provided service.
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        let now = Instant::now();
        Self {
            name: name.into(),
            address: address.into(),
            updated_at: now,
            good_until: now,
            origin_id: String::new(),
        }
    }

    pub fn key(&self) -> ServiceKey {
        ServiceKey { name: self.name.clone(), address: self.address.clone() }
    }

    /// Whether the record's deadline lies strictly before `now`.
    pub fn is_expired(&self, now: Instant) -> bool {
        now > self.good_until
    }
}

impl PartialEq for ServiceInfo {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.address == other.address
    }
}

impl Eq for ServiceInfo {}

/// Insertion-ordered collection of [`ServiceInfo`] with O(1) identity lookup.
#[derive(Debug, Default)]
pub struct Registry {
    entries: IndexMap<ServiceKey, ServiceInfo>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_mut(&mut self, key: &ServiceKey) -> Option<&mut ServiceInfo> {
        self.entries.get_mut(key)
    }

    /// Insert a record, or replace the stored one in place (keeping its
    /// position) when the identity already exists. Returns true if new.
    pub fn upsert(&mut self, info: ServiceInfo) -> bool {
        let key = info.key();
        match self.entries.get_mut(&key) {
            Some(existing) => {
                *existing = info;
                false
            }
            None => {
                self.entries.insert(key, info);
                true
            }
        }
    }

    /// Remove a record by identity, preserving the order of the rest.
    pub fn remove(&mut self, key: &ServiceKey) -> Option<ServiceInfo> {
        self.entries.shift_remove(key)
    }

    /// Keep only records matching `keep`. Returns the number removed.
    pub fn retain(&mut self, mut keep: impl FnMut(&ServiceInfo) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, info| keep(info));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceInfo> {
        self.entries.values()
    }

    /// Copies of every record with the given name, in insertion order.
    pub fn named(&self, name: &str) -> Vec<ServiceInfo> {
        self.iter().filter(|info| info.name == name).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
