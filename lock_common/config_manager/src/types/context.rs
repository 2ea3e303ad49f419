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
use distributed_lock::LockConfig;
use serde::Deserialize;
use crate::{ConfigSingleton, Validate};

/// Main configuration structure that matches the server_config.yaml file structure.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Lock service settings
    pub lock_service: LockService,
}

/// Lock service settings
#[derive(Debug, Deserialize, Clone)]
pub struct LockService {
    /// Listen address, `host:port`
    #[serde(default = "default_address")]
    pub address: String,
    /// Number of HTTP workers
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Where leases are kept
    #[serde(default)]
    pub store: StoreConfig,
    /// Lock manager settings
    #[serde(default)]
    pub lock: LockConfig,
    /// Simulated workloads of the demo endpoints
    #[serde(default)]
    pub demo: DemoConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Redis,
    Memory,
}

/// Lease store configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct StoreConfig {
    /// Store implementation
    #[serde(default)]
    pub kind: StoreKind,
    /// Redis connection URL, required for the redis store
    pub redis_url: Option<String>,
}

/// Demo endpoint settings
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct DemoConfig {
    /// Fixed workload of the watchdog endpoint, in seconds
    #[serde(default = "default_watchdog_task_seconds")]
    pub watchdog_task_seconds: u64,
    /// Lease of the fixed-TTL endpoint, in seconds
    #[serde(default = "default_fixed_lease_seconds")]
    pub fixed_lease_seconds: u64,
}

fn default_address() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_workers() -> usize {
    4
}

fn default_watchdog_task_seconds() -> u64 {
    5
}

fn default_fixed_lease_seconds() -> u64 {
    30
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            watchdog_task_seconds: default_watchdog_task_seconds(),
            fixed_lease_seconds: default_fixed_lease_seconds(),
        }
    }
}

impl DemoConfig {
    pub fn fixed_lease(&self) -> Duration {
        Duration::from_secs(self.fixed_lease_seconds)
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<(), String> {
        let service = &self.lock_service;
        if service.address.trim().is_empty() {
            return Err("lock_service.address must not be empty".to_string());
        }
        if service.workers == 0 {
            return Err("lock_service.workers must be at least 1".to_string());
        }
        if service.store.kind == StoreKind::Redis
            && service.store.redis_url.as_deref().map_or(true, |url| url.trim().is_empty())
        {
            return Err("lock_service.store.redis_url is required for the redis store".to_string());
        }
        if service.demo.fixed_lease_seconds == 0 {
            return Err("lock_service.demo.fixed_lease_seconds must be positive".to_string());
        }
        service.lock.validate().map_err(|e| format!("lock_service.lock: {}", e))
    }
}

/// Global configuration singleton instance
///
/// Users should call `CONFIG.initialize(path)` to load the configuration and
/// `CONFIG.get_instance()` to access the loaded configuration.
pub static CONFIG: ConfigSingleton<ServerConfig> = ConfigSingleton::new();
