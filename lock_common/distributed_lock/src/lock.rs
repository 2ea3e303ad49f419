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
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::ThreadId;
use std::time::{Duration, Instant};
use log::{debug, error, info, warn};
use super::error::{DistributedLockError, Result};
use super::store::LeaseStore;
use super::watchdog::RenewalTicket;

/// Lifecycle of an acquired lock. `Released` and `Lost` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockState {
    /// The lease is ours, as far as the client knows.
    Held,
    /// `release` was called.
    Released,
    /// The watchdog could not keep the lease; work done under the handle is
    /// no longer protected.
    Lost,
}

/// What a call to `release` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReleaseOutcome {
    /// The lease was deleted from the store.
    Released,
    /// The lease was already gone or owned by someone else when deleting, so
    /// it expired while the handle was held.
    Expired,
    /// The handle had been released before; nothing was done.
    AlreadyReleased,
}

const STATE_HELD: u8 = 0;
const STATE_RELEASED: u8 = 1;
const STATE_LOST: u8 = 2;

const NO_DEADLINE: u64 = u64::MAX;

/// State shared between a handle and its renewal task.
///
/// A renewed lease also carries the expiry the store last confirmed, kept as
/// milliseconds after `origin`. Reading the state past that deadline turns a
/// held lock into a lost one, whether or not the watchdog has heard back from
/// the store yet.
#[derive(Debug)]
pub(crate) struct SharedState {
    state: AtomicU8,
    origin: Instant,
    lease_until_ms: AtomicU64,
}

impl SharedState {
    /// Held state of a lease whose create was sent at `origin`, with no
    /// tracked expiry.
    pub(crate) fn held(origin: Instant) -> Arc<Self> {
        Arc::new(Self {
            state: AtomicU8::new(STATE_HELD),
            origin,
            lease_until_ms: AtomicU64::new(NO_DEADLINE),
        })
    }

    /// Held state whose lease runs out `ttl` after `origin` unless confirmed
    /// again.
    pub(crate) fn renewed(origin: Instant, ttl: Duration) -> Arc<Self> {
        let state = Self::held(origin);
        state.lease_until_ms.store(to_deadline_ms(ttl), Ordering::Release);
        state
    }

    pub(crate) fn get(&self) -> LockState {
        self.get_at(Instant::now())
    }

    pub(crate) fn get_at(&self, now: Instant) -> LockState {
        match self.state.load(Ordering::Acquire) {
            STATE_HELD if self.expired_at(now) => {
                self.leave_held(LockState::Lost);
                self.load()
            }
            STATE_HELD => LockState::Held,
            _ => self.load(),
        }
    }

    /// Moves `Held` to `to`. Returns false if the state was already terminal.
    pub(crate) fn leave_held(&self, to: LockState) -> bool {
        let to = match to {
            LockState::Held => return false,
            LockState::Released => STATE_RELEASED,
            LockState::Lost => STATE_LOST,
        };
        self.state
            .compare_exchange(STATE_HELD, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Records that the store confirmed the lease until `until`. Does nothing
    /// and returns false once the lock is no longer held.
    pub(crate) fn confirm_until(&self, until: Instant) -> bool {
        if self.get() != LockState::Held {
            return false;
        }
        let ms = to_deadline_ms(until.saturating_duration_since(self.origin));
        self.lease_until_ms.fetch_max(ms, Ordering::AcqRel);
        true
    }

    /// Last confirmed expiry, `None` when it is not tracked.
    pub(crate) fn lease_until(&self) -> Option<Instant> {
        match self.lease_until_ms.load(Ordering::Acquire) {
            NO_DEADLINE => None,
            ms => self.origin.checked_add(Duration::from_millis(ms)),
        }
    }

    fn expired_at(&self, now: Instant) -> bool {
        match self.lease_until_ms.load(Ordering::Acquire) {
            NO_DEADLINE => false,
            ms => now.saturating_duration_since(self.origin) >= Duration::from_millis(ms),
        }
    }

    fn load(&self) -> LockState {
        match self.state.load(Ordering::Acquire) {
            STATE_HELD => LockState::Held,
            STATE_RELEASED => LockState::Released,
            _ => LockState::Lost,
        }
    }
}

/// Rounded down, so a tracked expiry never lies after the real one.
fn to_deadline_ms(after_origin: Duration) -> u64 {
    u64::try_from(after_origin.as_millis())
        .unwrap_or(NO_DEADLINE - 1)
        .min(NO_DEADLINE - 1)
}

/// One acquired lock.
///
/// A handle belongs to the caller that acquired it and is not `Clone`.
/// Dropping it without `release` stops its renewal and leaves the lease to
/// expire after its TTL.
pub struct LockHandle {
    key: String,
    owner_token: String,
    owner_thread: ThreadId,
    ttl: Duration,
    acquired_at: Instant,
    state: Arc<SharedState>,
    store: Arc<dyn LeaseStore>,
    renewal: Option<RenewalTicket>,
}

impl LockHandle {
    pub(crate) fn new(
        key: String,
        owner_token: String,
        owner_thread: ThreadId,
        ttl: Duration,
        acquired_at: Instant,
        state: Arc<SharedState>,
        store: Arc<dyn LeaseStore>,
        renewal: Option<RenewalTicket>,
    ) -> Self {
        Self {
            key,
            owner_token,
            owner_thread,
            ttl,
            acquired_at,
            state,
            store,
            renewal,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn owner_token(&self) -> &str {
        &self.owner_token
    }

    /// Thread that acquired the lock.
    pub fn owner_thread(&self) -> ThreadId {
        self.owner_thread
    }

    /// Lease time the lock was taken with; in watchdog mode the lease is
    /// reset to this value on every renewal.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// When the successful create was sent to the store; the lease counts
    /// from here.
    pub fn acquired_at(&self) -> Instant {
        self.acquired_at
    }

    pub fn state(&self) -> LockState {
        self.state.get()
    }

    pub fn is_held(&self) -> bool {
        self.state() == LockState::Held
    }

    /// Whether the watchdog is still extending this lease.
    pub fn is_renewing(&self) -> bool {
        self.renewal.is_some() && self.is_held()
    }

    /// Fails unless the handle is still held.
    ///
    /// Long critical sections should call this between steps: a lost lease
    /// means another owner may already be inside.
    pub fn ensure_held(&self) -> Result<()> {
        match self.state() {
            LockState::Held => Ok(()),
            LockState::Lost => Err(DistributedLockError::LeaseLost(self.key.clone())),
            LockState::Released => Err(DistributedLockError::InvalidArgument(format!(
                "lock `{}` has already been released",
                self.key
            ))),
        }
    }

    /// Remaining lifetime of the lease on this key as reported by the store.
    pub fn remaining_ttl(&self) -> Result<Option<Duration>> {
        self.store.remaining_ttl(&self.key)
    }

    /// Releases the lock. Safe to call more than once.
    ///
    /// # Returns
    ///
    /// * `ReleaseOutcome::Released` when the lease was deleted
    /// * `ReleaseOutcome::Expired` when the lease had expired before release
    /// * `ReleaseOutcome::AlreadyReleased` on every later call
    ///
    /// # Errors
    ///
    /// * `LeaseLost` - The watchdog lost the lease while the lock was held.
    /// * `StoreUnavailable` - The delete could not reach the store; the lease
    ///   then expires after its TTL.
    pub fn release(&self) -> Result<ReleaseOutcome> {
        // a lease past its confirmed expiry is lost, not released
        if self.state.get() != LockState::Held || !self.state.leave_held(LockState::Released) {
            self.cancel_renewal();
            return match self.state() {
                LockState::Lost => Err(DistributedLockError::LeaseLost(self.key.clone())),
                _ => Ok(ReleaseOutcome::AlreadyReleased),
            };
        }
        self.cancel_renewal();

        match self.store.delete_if_owner(&self.key, &self.owner_token) {
            Ok(true) => {
                info!(
                    "released lock {} after {:?}",
                    self.key,
                    self.acquired_at.elapsed()
                );
                Ok(ReleaseOutcome::Released)
            }
            Ok(false) => {
                warn!(
                    "lease on {} had expired before release, held for {:?} with ttl {:?}",
                    self.key,
                    self.acquired_at.elapsed(),
                    self.ttl
                );
                Ok(ReleaseOutcome::Expired)
            }
            Err(e) => {
                error!("Failed to release lock {}: {}", self.key, e);
                Err(e)
            }
        }
    }

    fn cancel_renewal(&self) {
        if let Some(renewal) = &self.renewal {
            renewal.cancel();
        }
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        self.cancel_renewal();
        if self.is_held() {
            debug!(
                "handle for {} dropped while held, lease expires within {:?}",
                self.key, self.ttl
            );
        }
    }
}

impl fmt::Debug for LockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockHandle")
            .field("key", &self.key)
            .field("owner_token", &self.owner_token)
            .field("owner_thread", &self.owner_thread)
            .field("ttl", &self.ttl)
            .field("state", &self.state())
            .field("renewing", &self.is_renewing())
            .finish()
    }
}
