/*
 * Copyright (c) Huawei Technologies Co., Ltd. 2025. All rights reserved.
 * Global Trust Authority is licensed under the Mulan PSL v2.
 * You can use this software according to the terms and conditions of the Mulan PSL v2.
 * You may obtain a copy of Mulan PSL v2 at:
 *     http://license.coscl.org.cn/MulanPSL2
 * THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND, EITHER EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR
 * PURPOSE.
 * See the Mulan PSL v2 for more details.
 */

use std::collections::HashMap;
use std::time::{Duration, Instant};
use parking_lot::Mutex;
use super::config::instant_after;
use super::error::Result;
use super::store::{Lease, LeaseStore};

/// In-process lease store with the same semantics as the Redis one.
///
/// Useful for single-process deployments and for tests. Expiry is measured
/// on the monotonic clock and applied lazily on access.
#[derive(Debug, Default)]
pub struct MemoryLeaseStore {
    leases: Mutex<HashMap<String, Lease>>,
}

impl MemoryLeaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the live lease on `key`, if any.
    pub fn lease(&self, key: &str) -> Option<Lease> {
        let now = Instant::now();
        self.leases
            .lock()
            .get(key)
            .filter(|lease| lease.is_live_at(now))
            .cloned()
    }
}

/// Drops the lease on `key` if it has expired, returning the live one.
fn live_lease<'a>(leases: &'a mut HashMap<String, Lease>, key: &str, now: Instant) -> Option<&'a mut Lease> {
    if leases.get(key).map_or(false, |lease| !lease.is_live_at(now)) {
        leases.remove(key);
    }
    leases.get_mut(key)
}

impl LeaseStore for MemoryLeaseStore {
    fn try_create(&self, key: &str, owner_token: &str, ttl: Duration) -> Result<bool> {
        let now = Instant::now();
        let mut leases = self.leases.lock();
        if live_lease(&mut leases, key, now).is_some() {
            return Ok(false);
        }
        leases.insert(key.to_string(), Lease::new(key, owner_token, ttl));
        Ok(true)
    }

    fn extend(&self, key: &str, owner_token: &str, ttl: Duration) -> Result<bool> {
        let now = Instant::now();
        let mut leases = self.leases.lock();
        match live_lease(&mut leases, key, now) {
            Some(lease) if lease.owner_token == owner_token => {
                lease.expires_at = instant_after(now, ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn delete_if_owner(&self, key: &str, owner_token: &str) -> Result<bool> {
        let now = Instant::now();
        let mut leases = self.leases.lock();
        let owned = live_lease(&mut leases, key, now)
            .map_or(false, |lease| lease.owner_token == owner_token);
        if owned {
            leases.remove(key);
        }
        Ok(owned)
    }

    fn remaining_ttl(&self, key: &str) -> Result<Option<Duration>> {
        let now = Instant::now();
        let mut leases = self.leases.lock();
        Ok(live_lease(&mut leases, key, now).map(|lease| lease.remaining_at(now)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    const KEY: &str = "Test-Lock";

    #[test]
    fn test_try_create_is_exclusive() {
        let store = MemoryLeaseStore::new();
        assert!(store.try_create(KEY, "a", Duration::from_secs(5)).unwrap());
        assert!(!store.try_create(KEY, "b", Duration::from_secs(5)).unwrap());
        assert_eq!(store.lease(KEY).unwrap().owner_token, "a");
    }

    #[test]
    fn test_expired_lease_can_be_taken_over() {
        let store = MemoryLeaseStore::new();
        assert!(store.try_create(KEY, "a", Duration::from_millis(30)).unwrap());
        thread::sleep(Duration::from_millis(60));
        assert!(store.lease(KEY).is_none());
        assert!(store.try_create(KEY, "b", Duration::from_secs(5)).unwrap());
        assert!(!store.extend(KEY, "a", Duration::from_secs(5)).unwrap());
        assert_eq!(store.lease(KEY).unwrap().owner_token, "b");
    }

    #[test]
    fn test_foreign_token_never_changes_lease() {
        let store = MemoryLeaseStore::new();
        store.try_create(KEY, "owner", Duration::from_secs(5)).unwrap();
        let before = store.lease(KEY).unwrap();

        assert!(!store.extend(KEY, "intruder", Duration::from_secs(60)).unwrap());
        assert!(!store.delete_if_owner(KEY, "intruder").unwrap());
        assert_eq!(store.lease(KEY), Some(before));
    }

    #[test]
    fn test_owner_extends_and_deletes() {
        let store = MemoryLeaseStore::new();
        store.try_create(KEY, "owner", Duration::from_millis(100)).unwrap();
        assert!(store.extend(KEY, "owner", Duration::from_secs(10)).unwrap());
        assert!(store.remaining_ttl(KEY).unwrap().unwrap() > Duration::from_secs(5));
        assert!(store.delete_if_owner(KEY, "owner").unwrap());
        assert!(!store.delete_if_owner(KEY, "owner").unwrap());
        assert!(store.remaining_ttl(KEY).unwrap().is_none());
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let store = MemoryLeaseStore::new();
        assert!(store.try_create(KEY, "owner", Duration::MAX).unwrap());
        assert!(store.extend(KEY, "owner", Duration::MAX).unwrap());
        assert!(store.lease(KEY).is_some());
    }

    #[test]
    fn test_keys_are_independent() {
        let store = MemoryLeaseStore::new();
        assert!(store.try_create("Test-Lock", "a", Duration::from_secs(5)).unwrap());
        assert!(store.try_create("Test-Lock-Time", "b", Duration::from_secs(5)).unwrap());
    }
}
