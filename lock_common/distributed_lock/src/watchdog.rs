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
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use log::{debug, error, info, warn};
use parking_lot::{Condvar, Mutex, MutexGuard};
use super::config::{instant_after, renewal_interval};
use super::error::Result;
use super::lock::{LockState, SharedState};
use super::store::LeaseStore;

const WATCHDOG_THREAD_NAME: &str = "lock-watchdog";

/// Renewal of one held lease. The confirmed expiry lives in `state`, shared
/// with the handle.
struct RenewalTask {
    key: String,
    owner_token: String,
    ttl: Duration,
    interval: Duration,
    /// Next time the lease should be extended
    next_due: Instant,
    state: Arc<SharedState>,
    store: Arc<dyn LeaseStore>,
}

impl RenewalTask {
    /// Earliest instant the scheduler has to look at this task again.
    fn wake_at(&self) -> Instant {
        match self.state.lease_until() {
            Some(lease_until) => self.next_due.min(lease_until),
            None => self.next_due,
        }
    }
}

/// Snapshot of a due task, taken so the store call runs unlocked.
struct DueRenewal {
    id: u64,
    key: String,
    owner_token: String,
    ttl: Duration,
    state: Arc<SharedState>,
    store: Arc<dyn LeaseStore>,
}

/// Outcome of one extend, with the instant it was sent.
struct RenewalResult {
    id: u64,
    issued_at: Instant,
    extended: Result<bool>,
}

impl DueRenewal {
    /// Skips leases that stopped being held while earlier calls ran.
    fn renew(&self) -> Option<RenewalResult> {
        if self.state.get() != LockState::Held {
            return None;
        }
        let issued_at = Instant::now();
        let extended = self.store.extend(&self.key, &self.owner_token, self.ttl);
        Some(RenewalResult {
            id: self.id,
            issued_at,
            extended,
        })
    }
}

#[derive(Default)]
struct TaskTable {
    tasks: HashMap<u64, RenewalTask>,
    next_id: u64,
    shutdown: bool,
}

#[derive(Default)]
struct Shared {
    table: Mutex<TaskTable>,
    wakeup: Condvar,
}

/// Single background thread renewing every auto-renewing lease.
///
/// Extends run one after another on this thread, so a slow store call holds
/// back the renewals queued behind it. Store calls are bounded by the store
/// client's own timeout, which has to stay well below the renewal interval.
/// A lease whose confirmed expiry passes in the meantime reads as lost on
/// its handle at once; it does not wait for the pending call.
pub(crate) struct RenewalScheduler {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

/// Registration of a lease with the scheduler; cancelling it stops renewals.
#[derive(Debug)]
pub(crate) struct RenewalTicket {
    id: u64,
    shared: Weak<Shared>,
}

impl RenewalScheduler {
    /// Starts the scheduler thread
    pub(crate) fn start() -> Result<Self> {
        let shared = Arc::new(Shared::default());
        let worker_shared = shared.clone();
        let worker = thread::Builder::new()
            .name(WATCHDOG_THREAD_NAME.to_string())
            .spawn(move || run(worker_shared))?;
        info!("lock watchdog started");
        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    /// Registers a lease created at `acquired_at` for renewal every third of
    /// `ttl`. `state` must track the lease expiry.
    pub(crate) fn schedule(
        &self,
        key: &str,
        owner_token: &str,
        ttl: Duration,
        acquired_at: Instant,
        state: Arc<SharedState>,
        store: Arc<dyn LeaseStore>,
    ) -> RenewalTicket {
        let interval = renewal_interval(ttl);
        let mut table = self.shared.table.lock();
        let id = table.next_id;
        table.next_id += 1;
        table.tasks.insert(
            id,
            RenewalTask {
                key: key.to_string(),
                owner_token: owner_token.to_string(),
                ttl,
                interval,
                next_due: instant_after(acquired_at, interval),
                state,
                store,
            },
        );
        drop(table);
        self.shared.wakeup.notify_one();
        debug!("scheduled renewal of {} every {:?}", key, interval);

        RenewalTicket {
            id,
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Number of leases currently being renewed.
    pub(crate) fn active_tasks(&self) -> usize {
        self.shared.table.lock().tasks.len()
    }
}

impl Drop for RenewalScheduler {
    fn drop(&mut self) {
        self.shared.table.lock().shutdown = true;
        self.shared.wakeup.notify_all();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("lock watchdog thread panicked");
            }
        }
    }
}

impl RenewalTicket {
    /// Removes the task. Returns false if it was already gone.
    pub(crate) fn cancel(&self) -> bool {
        let Some(shared) = self.shared.upgrade() else {
            return false;
        };
        let removed = shared.table.lock().tasks.remove(&self.id);
        shared.wakeup.notify_one();
        if let Some(task) = &removed {
            debug!("cancelled renewal of {}", task.key);
        }
        removed.is_some()
    }
}

fn run(shared: Arc<Shared>) {
    let mut table = shared.table.lock();
    loop {
        if table.shutdown {
            break;
        }

        let now = Instant::now();
        drop_unheld(&mut table, now);
        let due: Vec<DueRenewal> = table
            .tasks
            .iter()
            .filter(|(_, task)| task.next_due <= now)
            .map(|(id, task)| DueRenewal {
                id: *id,
                key: task.key.clone(),
                owner_token: task.owner_token.clone(),
                ttl: task.ttl,
                state: task.state.clone(),
                store: task.store.clone(),
            })
            .collect();

        if due.is_empty() {
            match table.tasks.values().map(RenewalTask::wake_at).min() {
                Some(wake_at) => {
                    shared.wakeup.wait_until(&mut table, wake_at);
                }
                None => shared.wakeup.wait(&mut table),
            }
            continue;
        }

        let results: Vec<RenewalResult> =
            MutexGuard::unlocked(&mut table, || due.iter().filter_map(DueRenewal::renew).collect());

        let now = Instant::now();
        for result in results {
            apply_result(&mut table, result, now);
        }
    }
    info!("lock watchdog stopped");
}

/// Removes tasks whose lease ran out unconfirmed or whose handle is gone.
fn drop_unheld(table: &mut TaskTable, now: Instant) {
    table.tasks.retain(|_, task| match task.state.get_at(now) {
        LockState::Held => true,
        LockState::Lost => {
            error!(
                "lease on {} passed its confirmed expiry without a renewal, renewal stopped",
                task.key
            );
            false
        }
        LockState::Released => false,
    });
}

fn apply_result(table: &mut TaskTable, result: RenewalResult, now: Instant) {
    let RenewalResult { id, issued_at, extended } = result;
    // cancelled while the store call was running
    let Some(task) = table.tasks.get_mut(&id) else {
        return;
    };

    match extended {
        Ok(true) => {
            // the new expiry counts from when the extend was sent
            if task.state.confirm_until(instant_after(issued_at, task.ttl)) {
                task.next_due = instant_after(now, task.interval);
                debug!("renewed lease on {} for {:?}", task.key, task.ttl);
            } else if let Some(task) = table.tasks.remove(&id) {
                warn!("renewal of {} came back after the lease was given up", task.key);
            }
        }
        Ok(false) => {
            if let Some(task) = table.tasks.remove(&id) {
                if task.state.leave_held(LockState::Lost) {
                    warn!("lease on {} was lost, renewal stopped", task.key);
                }
            }
        }
        Err(e) if task.state.get_at(now) != LockState::Held => {
            if let Some(task) = table.tasks.remove(&id) {
                error!(
                    "lease on {} expired while the store was unavailable: {}",
                    task.key, e
                );
            }
        }
        Err(e) => {
            let retry_in = (task.interval / 2).max(Duration::from_millis(1));
            task.next_due = instant_after(now, retry_in);
            warn!(
                "failed to renew lease on {}, retrying in {:?}: {}",
                task.key, retry_in, e
            );
        }
    }
}
