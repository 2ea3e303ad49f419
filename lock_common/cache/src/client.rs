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
use log::info;
use redis::{Client, Connection};
use crate::error::RedisError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Explicitly constructed Redis client.
///
/// Instances are cheap to clone and are handed to their users directly;
/// there is no process-wide instance.
#[derive(Clone, Debug)]
pub struct RedisClient {
    pub(crate) client: Client,
    timeout: Duration,
}

impl RedisClient {
    /// Creates a client for `redis_url` without connecting yet.
    ///
    /// # Errors
    /// * `RedisError::ConnectionError` - If the URL cannot be parsed.
    pub fn open(redis_url: &str) -> Result<RedisClient, RedisError> {
        Self::open_with_timeout(redis_url, DEFAULT_TIMEOUT)
    }

    /// Creates a client whose connects, and every command read and write,
    /// give up after `timeout`.
    pub fn open_with_timeout(redis_url: &str, timeout: Duration) -> Result<RedisClient, RedisError> {
        if timeout.is_zero() {
            return Err(RedisError::OperationError("timeout must be positive".to_string()));
        }
        let client = Client::open(redis_url).map_err(RedisError::ConnectionError)?;
        info!("redis client created for {:?}", client.get_connection_info().addr);
        Ok(RedisClient { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub(crate) fn connection(&self) -> Result<Connection, RedisError> {
        let conn = self
            .client
            .get_connection_with_timeout(self.timeout)
            .map_err(RedisError::ConnectionError)?;
        conn.set_read_timeout(Some(self.timeout))
            .map_err(RedisError::ConnectionError)?;
        conn.set_write_timeout(Some(self.timeout))
            .map_err(RedisError::ConnectionError)?;
        Ok(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_rejects_malformed_url() {
        let result = RedisClient::open("not a redis url");
        assert!(matches!(result, Err(RedisError::ConnectionError(_))));
    }

    #[test]
    fn test_open_does_not_connect() {
        let client = RedisClient::open("redis://127.0.0.1:1/").unwrap();
        assert_eq!(client.timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let result = RedisClient::open_with_timeout("redis://127.0.0.1/", Duration::ZERO);
        assert!(matches!(result, Err(RedisError::OperationError(_))));
    }
}
