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


use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DistributedLockError {
    #[error("Lock acquisition timeout for `{key}` after {waited:?}")]
    AcquisitionTimeout { key: String, waited: Duration },

    #[error("Lease for `{0}` was lost while the lock was held")]
    LeaseLost(String),

    #[error("Lease store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Parameter error: {0}")]
    InvalidArgument(String),

    #[error("Renewal scheduler failed to start: {0}")]
    SchedulerUnavailable(#[from] std::io::Error),
}

impl From<cache::RedisError> for DistributedLockError {
    fn from(err: cache::RedisError) -> Self {
        DistributedLockError::StoreUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DistributedLockError>;
