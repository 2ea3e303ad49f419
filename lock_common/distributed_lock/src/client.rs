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
use cache::operations::duration_to_millis;
use cache::RedisClient;
use log::debug;
use super::error::Result;
use super::scripts::{EXTEND_SCRIPT, RELEASE_SCRIPT};
use super::store::LeaseStore;

/// Lease store backed by a single Redis instance.
#[derive(Debug, Clone)]
pub struct RedisLeaseStore {
    client: RedisClient,
}

impl RedisLeaseStore {
    /// Wraps an already constructed client.
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    /// Creates a store for `redis_url` with the client's default timeout.
    /// Keep it below a third of the shortest lease renewed through this store.
    pub fn open(redis_url: &str) -> Result<Self> {
        Ok(Self::new(RedisClient::open(redis_url)?))
    }

    /// Current owner token stored under `key`.
    pub fn owner(&self, key: &str) -> Result<Option<String>> {
        Ok(self.client.get(key)?)
    }
}

impl LeaseStore for RedisLeaseStore {
    fn try_create(&self, key: &str, owner_token: &str, ttl: Duration) -> Result<bool> {
        let created = self.client.set_nx_px(key, owner_token, ttl)?;
        debug!("SET NX PX {} -> {}", key, created);
        Ok(created)
    }

    fn extend(&self, key: &str, owner_token: &str, ttl: Duration) -> Result<bool> {
        let result = self.client.eval_int(
            &EXTEND_SCRIPT,
            &[key],
            &[owner_token.to_string(), duration_to_millis(ttl)?.to_string()],
        )?;
        Ok(result == 1)
    }

    fn delete_if_owner(&self, key: &str, owner_token: &str) -> Result<bool> {
        let result = self.client.eval_int(&RELEASE_SCRIPT, &[key], &[owner_token.to_string()])?;
        Ok(result == 1)
    }

    fn remaining_ttl(&self, key: &str) -> Result<Option<Duration>> {
        Ok(self.client.pttl(key)?)
    }
}
