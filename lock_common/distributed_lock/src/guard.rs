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

use std::ops::Deref;

use log::error;

use super::lock::{LockHandle, ReleaseOutcome};
use super::error::Result;

/// Releases the wrapped lock when dropped.
pub struct LockGuard {
    handle: LockHandle,
    released: bool,
}

impl LockGuard {
    pub fn new(handle: LockHandle) -> Self {
        Self { handle, released: false }
    }

    /// Releases now and reports the outcome instead of logging it on drop.
    pub fn release(mut self) -> Result<ReleaseOutcome> {
        self.released = true;
        self.handle.release()
    }
}

impl Deref for LockGuard {
    type Target = LockHandle;

    fn deref(&self) -> &Self::Target {
        &self.handle
    }
}

impl From<LockHandle> for LockGuard {
    fn from(handle: LockHandle) -> Self {
        Self::new(handle)
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.handle.release() {
            error!("Failed to release lock {}: {}", self.handle.key(), e);
        }
    }
}
