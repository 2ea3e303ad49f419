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

use std::sync::Arc;
use std::thread;
use std::time::Duration;
use config_manager::types::context::DemoConfig;
use distributed_lock::{
    AcquireOptions, DistributedLockError, LockGuard, LockManager, ReleaseOutcome, Result,
};
use log::{info, warn};

/// Key locked by the watchdog demo
pub const WATCHDOG_LOCK_KEY: &str = "Test-Lock";
/// Key locked by the fixed lease demo
pub const FIXED_LEASE_LOCK_KEY: &str = "Test-Lock-Time";

const WORK_TICK: Duration = Duration::from_secs(1);

/// Simulated critical sections run under the two lock modes.
pub struct LockDemoService {
    manager: Arc<LockManager>,
    demo: DemoConfig,
    tick: Duration,
}

impl LockDemoService {
    pub fn new(manager: Arc<LockManager>, demo: DemoConfig) -> Self {
        Self::with_tick(manager, demo, WORK_TICK)
    }

    /// `tick` is the length of one unit of simulated work.
    pub(crate) fn with_tick(manager: Arc<LockManager>, demo: DemoConfig, tick: Duration) -> Self {
        Self { manager, demo, tick }
    }

    /// Takes `Test-Lock` in watchdog mode, works for the configured number of
    /// ticks while checking the lease, then releases.
    ///
    /// The lock stays renewed for as long as the task runs, so the work may
    /// exceed the lease time safely.
    pub fn run_watchdog_task(&self, task_name: &str) -> Result<()> {
        info!("{}: started", task_name);
        let guard = LockGuard::new(
            self.manager
                .acquire(WATCHDOG_LOCK_KEY, &self.manager.watchdog_options())?,
        );
        info!("{} acquired {}, running task", task_name, WATCHDOG_LOCK_KEY);

        for i in 0..self.demo.watchdog_task_seconds {
            thread::sleep(self.tick);
            guard.ensure_held()?;
            info!("{} running task.. {}s", task_name, i);
        }

        info!("{} finished", task_name);
        match guard.release()? {
            ReleaseOutcome::Expired => Err(DistributedLockError::LeaseLost(WATCHDOG_LOCK_KEY.to_string())),
            ReleaseOutcome::Released | ReleaseOutcome::AlreadyReleased => Ok(()),
        }
    }

    /// Takes `Test-Lock-Time` with a fixed lease and no renewal, works for
    /// `ticks` ticks, then releases.
    ///
    /// The lease must outlast the work; if it ran out first the work was not
    /// protected for its whole duration and the task fails with `LeaseLost`.
    pub fn run_fixed_lease_task(&self, task_name: &str, ticks: u32) -> Result<()> {
        info!("{}: started", task_name);
        let handle = self
            .manager
            .acquire(FIXED_LEASE_LOCK_KEY, &AcquireOptions::fixed(self.demo.fixed_lease()))?;

        let mut expiry_reported = false;
        for i in 0..ticks {
            thread::sleep(self.tick);
            info!("{} running business.. {}s", task_name, i);
            if !expiry_reported && handle.acquired_at().elapsed() >= handle.ttl() {
                warn!(
                    "{}: lease on {} ran out after {:?} while the task is still running",
                    task_name, FIXED_LEASE_LOCK_KEY, handle.ttl()
                );
                expiry_reported = true;
            }
        }

        info!("{} business finished", task_name);
        match self.manager.release(&handle)? {
            ReleaseOutcome::Expired => Err(DistributedLockError::LeaseLost(FIXED_LEASE_LOCK_KEY.to_string())),
            ReleaseOutcome::Released | ReleaseOutcome::AlreadyReleased => Ok(()),
        }
    }
}
