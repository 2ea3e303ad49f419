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
use serde::Deserialize;
use super::error::{DistributedLockError, Result};

pub const DEFAULT_WATCHDOG_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_RETRY_MIN_DELAY_MS: u64 = 50;
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 1_000;
pub const DEFAULT_STORE_RETRY_LIMIT: u32 = 20;

/// Watchdog ticks happen this many times per lease lifetime.
pub const RENEWALS_PER_LEASE: u32 = 3;

/// Smallest lease a lock may be taken with, so that the renewal interval
/// stays above one millisecond.
pub const MIN_LEASE: Duration = Duration::from_millis(RENEWALS_PER_LEASE as u64);

/// Longest lease accepted, the largest expiry Redis takes in `PX`.
pub const MAX_LEASE: Duration = Duration::from_millis(i64::MAX as u64);

/// Stand-in for "never" where an instant cannot be represented.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Lock manager settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LockConfig {
    /// Lease time used in watchdog mode, renewed every third of it.
    #[serde(default = "default_watchdog_timeout_ms")]
    pub watchdog_timeout_ms: u64,
    /// First backoff delay between acquisition attempts.
    #[serde(default = "default_retry_min_delay_ms")]
    pub retry_min_delay_ms: u64,
    /// Upper bound for the backoff delay.
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
    /// Consecutive store failures tolerated by one acquisition.
    #[serde(default = "default_store_retry_limit")]
    pub store_retry_limit: u32,
    /// Default acquisition timeout, absent means wait until acquired.
    #[serde(default)]
    pub acquire_timeout_ms: Option<u64>,
}

fn default_watchdog_timeout_ms() -> u64 {
    DEFAULT_WATCHDOG_TIMEOUT_MS
}

fn default_retry_min_delay_ms() -> u64 {
    DEFAULT_RETRY_MIN_DELAY_MS
}

fn default_retry_max_delay_ms() -> u64 {
    DEFAULT_RETRY_MAX_DELAY_MS
}

fn default_store_retry_limit() -> u32 {
    DEFAULT_STORE_RETRY_LIMIT
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            watchdog_timeout_ms: DEFAULT_WATCHDOG_TIMEOUT_MS,
            retry_min_delay_ms: DEFAULT_RETRY_MIN_DELAY_MS,
            retry_max_delay_ms: DEFAULT_RETRY_MAX_DELAY_MS,
            store_retry_limit: DEFAULT_STORE_RETRY_LIMIT,
            acquire_timeout_ms: None,
        }
    }
}

impl LockConfig {
    pub fn watchdog_timeout(&self) -> Duration {
        Duration::from_millis(self.watchdog_timeout_ms)
    }

    pub fn retry_min_delay(&self) -> Duration {
        Duration::from_millis(self.retry_min_delay_ms)
    }

    pub fn retry_max_delay(&self) -> Duration {
        Duration::from_millis(self.retry_max_delay_ms)
    }

    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout_ms.map(Duration::from_millis)
    }

    /// Checks that the settings describe a usable lock manager.
    pub fn validate(&self) -> Result<()> {
        validate_lease(self.watchdog_timeout())?;
        if self.retry_min_delay_ms == 0 {
            return Err(DistributedLockError::InvalidArgument(
                "retry_min_delay_ms must be positive".to_string(),
            ));
        }
        if self.retry_max_delay_ms < self.retry_min_delay_ms {
            return Err(DistributedLockError::InvalidArgument(format!(
                "retry_max_delay_ms ({}) is smaller than retry_min_delay_ms ({})",
                self.retry_max_delay_ms, self.retry_min_delay_ms
            )));
        }
        if self.store_retry_limit == 0 {
            return Err(DistributedLockError::InvalidArgument(
                "store_retry_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Interval between two renewals of a lease of length `ttl`.
pub fn renewal_interval(ttl: Duration) -> Duration {
    ttl / RENEWALS_PER_LEASE
}

pub(crate) fn validate_lease(ttl: Duration) -> Result<()> {
    if ttl < MIN_LEASE {
        return Err(DistributedLockError::InvalidArgument(format!(
            "lease time {:?} is shorter than {:?}",
            ttl, MIN_LEASE
        )));
    }
    if ttl > MAX_LEASE {
        return Err(DistributedLockError::InvalidArgument(format!(
            "lease time {:?} is longer than {:?}",
            ttl, MAX_LEASE
        )));
    }
    Ok(())
}

/// `base + after`, saturating to a far future instant instead of
/// overflowing.
pub(crate) fn instant_after(base: Instant, after: Duration) -> Instant {
    base.checked_add(after)
        .or_else(|| base.checked_add(FAR_FUTURE))
        .unwrap_or(base)
}
