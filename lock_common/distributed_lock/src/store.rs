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

use std::time::{Duration, Instant};
use super::config::instant_after;
use super::error::Result;

/// Time-bounded ownership record of a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    /// Lock key name
    pub key: String,
    /// Token of the acquisition that owns the lease
    pub owner_token: String,
    /// Instant after which the lease is gone unless extended
    pub expires_at: Instant,
}

impl Lease {
    /// Lease starting now and lasting `ttl`.
    pub fn new(key: impl Into<String>, owner_token: impl Into<String>, ttl: Duration) -> Self {
        Self {
            key: key.into(),
            owner_token: owner_token.into(),
            expires_at: instant_after(Instant::now(), ttl),
        }
    }

    pub fn is_live_at(&self, now: Instant) -> bool {
        now < self.expires_at
    }

    pub fn remaining_at(&self, now: Instant) -> Duration {
        self.expires_at.saturating_duration_since(now)
    }
}

/// Atomic lease operations against the key-value store backing the locks.
///
/// Every method must be a single atomic operation on the store side: two
/// callers racing on `try_create` never both get `true`, and `extend` or
/// `delete_if_owner` never touch a lease whose owner token differs.
#[cfg_attr(test, mockall::automock)]
pub trait LeaseStore: Send + Sync {
    /// Creates the lease for `key` unless a live one already exists.
    fn try_create(&self, key: &str, owner_token: &str, ttl: Duration) -> Result<bool>;

    /// Resets the lease expiry to `ttl` from now if `owner_token` still owns it.
    fn extend(&self, key: &str, owner_token: &str, ttl: Duration) -> Result<bool>;

    /// Removes the lease if `owner_token` owns it. Absence or a different
    /// owner is a no-op returning `false`.
    fn delete_if_owner(&self, key: &str, owner_token: &str) -> Result<bool>;

    /// Remaining lifetime of the live lease on `key`, if any.
    fn remaining_ttl(&self, key: &str) -> Result<Option<Duration>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lease_liveness() {
        let lease = Lease::new("Test-Lock", "owner", Duration::from_secs(5));
        let now = Instant::now();
        assert!(lease.is_live_at(now));
        assert!(lease.remaining_at(now) <= Duration::from_secs(5));
        assert!(!lease.is_live_at(now + Duration::from_secs(6)));
        assert_eq!(lease.remaining_at(now + Duration::from_secs(6)), Duration::ZERO);
    }
}
