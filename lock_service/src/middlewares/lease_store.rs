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
use config_manager::types::context::{StoreConfig, StoreKind};
use distributed_lock::{LeaseStore, MemoryLeaseStore, RedisLeaseStore};
use env_config_parse::get_env_value;
use log::{info, warn};

/// Environment variable that overrides the configured redis url
pub const REDIS_URL_ENV: &str = "REDIS_URL";

/// Builds the lease store the lock manager runs on.
pub fn create_lease_store(config: &StoreConfig) -> Result<Arc<dyn LeaseStore>, String> {
    match config.kind {
        StoreKind::Memory => {
            warn!("Using the in-process lease store, locks are not shared with other processes");
            Ok(Arc::new(MemoryLeaseStore::new()))
        }
        StoreKind::Redis => {
            let url = redis_url(config)?;
            let store = RedisLeaseStore::open(&url)
                .map_err(|e| format!("failed to open redis lease store: {}", e))?;
            info!("Redis lease store ready");
            Ok(Arc::new(store))
        }
    }
}

fn redis_url(config: &StoreConfig) -> Result<String, String> {
    get_env_value(REDIS_URL_ENV)
        .or_else(|| config.redis_url.clone())
        .ok_or_else(|| format!("redis store needs store.redis_url or {}", REDIS_URL_ENV))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_memory_store() {
        let config = StoreConfig {
            kind: StoreKind::Memory,
            redis_url: None,
        };
        let store = create_lease_store(&config).unwrap();
        assert!(store.try_create("Test-Lock", "owner", Duration::from_secs(1)).unwrap());
        assert!(!store.try_create("Test-Lock", "other", Duration::from_secs(1)).unwrap());
    }

    #[test]
    fn test_redis_store_with_bad_url() {
        if get_env_value(REDIS_URL_ENV).is_some() {
            return;
        }
        let config = StoreConfig {
            kind: StoreKind::Redis,
            redis_url: Some("not-a-url".to_string()),
        };
        assert!(create_lease_store(&config).is_err());
    }
}
