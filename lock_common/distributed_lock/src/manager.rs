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

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use log::{debug, error, info, warn};
use uuid::Uuid;
use super::backoff::Backoff;
use super::config::{validate_lease, LockConfig};
use super::error::{DistributedLockError, Result};
use super::lock::{LockHandle, ReleaseOutcome, SharedState};
use super::store::LeaseStore;
use super::watchdog::RenewalScheduler;

const BACKOFF_MULTIPLIER: f64 = 2.0;

/// How `LockManager::acquire` takes a lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AcquireOptions {
    /// Lease time; the manager's watchdog timeout when `None`.
    pub lease_time: Option<Duration>,
    /// Keep extending the lease until release.
    pub auto_renew: bool,
    /// Give up after this long; the manager's default when `None`.
    pub timeout: Option<Duration>,
}

impl AcquireOptions {
    /// Watchdog mode: lease of the configured watchdog timeout, renewed
    /// while held.
    pub fn watchdog() -> Self {
        Self {
            lease_time: None,
            auto_renew: true,
            timeout: None,
        }
    }

    /// Fixed lease that is never renewed.
    pub fn fixed(lease_time: Duration) -> Self {
        Self {
            lease_time: Some(lease_time),
            auto_renew: false,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Entry point for taking and releasing distributed locks.
///
/// The lease store is injected; the manager owns one renewal thread shared by
/// every auto-renewing lock it hands out.
pub struct LockManager {
    store: Arc<dyn LeaseStore>,
    config: LockConfig,
    scheduler: RenewalScheduler,
}

impl LockManager {
    /// Create a lock manager on top of `store`
    ///
    /// # Errors
    ///
    /// * `InvalidArgument` - The configuration is not usable.
    /// * `SchedulerUnavailable` - The renewal thread could not be spawned.
    pub fn new(store: Arc<dyn LeaseStore>, config: LockConfig) -> Result<Self> {
        config.validate()?;
        let scheduler = RenewalScheduler::start()?;
        Ok(Self {
            store,
            config,
            scheduler,
        })
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    /// Options for watchdog mode with the configured default timeout.
    pub fn watchdog_options(&self) -> AcquireOptions {
        AcquireOptions {
            timeout: self.config.acquire_timeout(),
            ..AcquireOptions::watchdog()
        }
    }

    /// Blocks until the lock on `key` is acquired or the timeout elapses.
    ///
    /// Attempts are spaced by a jittered exponential backoff. With
    /// `auto_renew` the lease is extended every third of its lifetime until
    /// the handle is released or dropped.
    ///
    /// # Errors
    ///
    /// * `AcquisitionTimeout` - Not acquired in time, or the store kept failing.
    /// * `InvalidArgument` - Empty key or a lease time out of range.
    pub fn acquire(&self, key: &str, options: &AcquireOptions) -> Result<LockHandle> {
        let ttl = options.lease_time.unwrap_or_else(|| self.config.watchdog_timeout());
        let timeout = options.timeout.or_else(|| self.config.acquire_timeout());
        let (owner_token, acquired_at) = self.acquire_lease(key, ttl, timeout)?;

        let (state, renewal) = if options.auto_renew {
            let state = SharedState::renewed(acquired_at, ttl);
            let renewal = self.scheduler.schedule(
                key,
                &owner_token,
                ttl,
                acquired_at,
                state.clone(),
                self.store.clone(),
            );
            (state, Some(renewal))
        } else {
            (SharedState::held(acquired_at), None)
        };

        Ok(LockHandle::new(
            key.to_string(),
            owner_token,
            thread::current().id(),
            ttl,
            acquired_at,
            state,
            self.store.clone(),
            renewal,
        ))
    }

    /// Acquires `key` with a fixed lease of `ttl` that is never renewed,
    /// trying until `timeout` elapses (a single attempt for a zero timeout).
    ///
    /// The caller must keep `ttl` longer than the critical section: once it
    /// expires another caller can take the lock while the first one is still
    /// running.
    pub fn try_acquire(&self, key: &str, ttl: Duration, timeout: Duration) -> Result<LockHandle> {
        self.acquire(key, &AcquireOptions::fixed(ttl).with_timeout(timeout))
    }

    /// Releases the lock behind `handle`. Later calls are no-ops.
    pub fn release(&self, handle: &LockHandle) -> Result<ReleaseOutcome> {
        handle.release()
    }

    /// Number of leases the watchdog is currently renewing.
    pub fn active_renewals(&self) -> usize {
        self.scheduler.active_tasks()
    }

    /// Returns the owner token and the instant the successful create was sent.
    fn acquire_lease(&self, key: &str, ttl: Duration, timeout: Option<Duration>) -> Result<(String, Instant)> {
        if key.is_empty() {
            return Err(DistributedLockError::InvalidArgument("lock key must not be empty".to_string()));
        }
        validate_lease(ttl)?;

        let owner_token = new_owner_token();
        let started = Instant::now();
        // a timeout too large to represent means no deadline
        let deadline = timeout.and_then(|timeout| started.checked_add(timeout));
        let mut backoff = Backoff::new(
            self.config.retry_min_delay(),
            self.config.retry_max_delay(),
            BACKOFF_MULTIPLIER,
        );
        let mut attempts: u32 = 0;
        let mut store_failures: u32 = 0;

        loop {
            attempts += 1;
            let issued_at = Instant::now();
            match self.store.try_create(key, &owner_token, ttl) {
                Ok(true) => {
                    info!(
                        "acquired lock {} with lease {:?} after {} attempt(s)",
                        key, ttl, attempts
                    );
                    return Ok((owner_token, issued_at));
                }
                Ok(false) => {
                    store_failures = 0;
                    debug!("lock {} is held by another owner, attempt {}", key, attempts);
                }
                Err(e) => {
                    store_failures += 1;
                    warn!(
                        "lease store failed while acquiring {} ({}/{}): {}",
                        key, store_failures, self.config.store_retry_limit, e
                    );
                    if store_failures >= self.config.store_retry_limit {
                        error!("giving up on lock {}, the lease store keeps failing", key);
                        return Err(DistributedLockError::AcquisitionTimeout {
                            key: key.to_string(),
                            waited: started.elapsed(),
                        });
                    }
                }
            }

            let delay = backoff.next_delay();
            let delay = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        info!("timed out acquiring lock {} after {} attempt(s)", key, attempts);
                        return Err(DistributedLockError::AcquisitionTimeout {
                            key: key.to_string(),
                            waited: started.elapsed(),
                        });
                    }
                    delay.min(deadline - now)
                }
                None => delay,
            };
            thread::sleep(delay);
        }
    }
}

impl fmt::Debug for LockManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockManager")
            .field("config", &self.config)
            .field("active_renewals", &self.active_renewals())
            .finish()
    }
}

/// Unique per acquisition: a random UUID plus the acquiring thread.
fn new_owner_token() -> String {
    format!("{}:{:?}", Uuid::new_v4(), thread::current().id())
}
