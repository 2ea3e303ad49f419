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
use redis::{Commands, Script};
use crate::client::RedisClient;
use crate::error::RedisError;

impl RedisClient {
    /// Sets `key` to `value` only if the key does not exist, with a
    /// millisecond expiry, as one `SET NX PX` command.
    ///
    /// # Arguments
    ///
    /// * `key` - The key to set.
    /// * `value` - The value to store.
    /// * `ttl` - Expiration of the key, rounded down to milliseconds (at least 1ms).
    ///
    /// # Returns
    ///
    /// Returns `Ok(true)` if the key was created, `Ok(false)` if it already existed.
    ///
    /// # Errors
    /// * `RedisError::ConnectionError` - If there is an error talking to Redis.
    /// * `RedisError::OperationError` - If `ttl` is beyond what Redis accepts.
    pub fn set_nx_px(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, RedisError> {
        let mut conn = self.connection()?;
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(duration_to_millis(ttl)?)
            .query(&mut conn)
            .map_err(RedisError::ConnectionError)?;
        Ok(reply.is_some())
    }

    /// Gets the value for a given key, `None` when the key does not exist.
    pub fn get(&self, key: &str) -> Result<Option<String>, RedisError> {
        let mut conn = self.connection()?;
        conn.get(key).map_err(RedisError::ConnectionError)
    }

    /// Gets the remaining time to live of a key.
    ///
    /// # Returns
    ///
    /// Returns `Ok(None)` when the key does not exist or has no expiry.
    pub fn pttl(&self, key: &str) -> Result<Option<Duration>, RedisError> {
        let mut conn = self.connection()?;
        let millis: i64 = conn.pttl(key).map_err(RedisError::ConnectionError)?;
        if millis > 0 {
            Ok(Some(Duration::from_millis(millis as u64)))
        } else {
            Ok(None)
        }
    }

    /// Runs a Lua script with the given keys and arguments and returns its
    /// integer reply.
    ///
    /// # Errors
    /// * `RedisError::ConnectionError` - If the connection or the script fails.
    pub fn eval_int(&self, script: &Script, keys: &[&str], args: &[String]) -> Result<i64, RedisError> {
        let mut conn = self.connection()?;
        let mut invocation = script.prepare_invoke();
        for key in keys {
            invocation.key(*key);
        }
        for arg in args {
            invocation.arg(arg.as_str());
        }
        invocation.invoke(&mut conn).map_err(RedisError::ConnectionError)
    }
}

/// Largest expiry Redis accepts, in milliseconds.
pub const MAX_EXPIRE_MILLIS: u64 = i64::MAX as u64;

/// Converts a duration into the millisecond argument Redis expects, rounded
/// down with a floor of 1ms.
///
/// # Errors
/// * `RedisError::OperationError` - If the duration exceeds `MAX_EXPIRE_MILLIS`.
pub fn duration_to_millis(ttl: Duration) -> Result<u64, RedisError> {
    u64::try_from(ttl.as_millis())
        .ok()
        .filter(|millis| *millis <= MAX_EXPIRE_MILLIS)
        .map(|millis| millis.max(1))
        .ok_or_else(|| RedisError::OperationError(format!("expiry {:?} is too large", ttl)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_to_millis_has_floor() {
        assert_eq!(duration_to_millis(Duration::from_micros(10)).unwrap(), 1);
        assert_eq!(duration_to_millis(Duration::from_secs(30)).unwrap(), 30_000);
    }

    #[test]
    fn test_duration_to_millis_rejects_huge_expiry() {
        assert_eq!(
            duration_to_millis(Duration::from_millis(MAX_EXPIRE_MILLIS)).unwrap(),
            MAX_EXPIRE_MILLIS
        );
        assert!(matches!(
            duration_to_millis(Duration::from_millis(MAX_EXPIRE_MILLIS + 1)),
            Err(RedisError::OperationError(_))
        ));
        assert!(matches!(duration_to_millis(Duration::MAX), Err(RedisError::OperationError(_))));
    }

    #[test]
    fn test_unreachable_server_reports_connection_error() {
        let client = RedisClient::open_with_timeout("redis://127.0.0.1:1/", Duration::from_millis(200)).unwrap();
        let result = client.set_nx_px("cache-test", "value", Duration::from_secs(1));
        assert!(matches!(result, Err(RedisError::ConnectionError(_))));
    }
}
