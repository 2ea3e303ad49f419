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

pub mod config;
pub mod logger;

use std::{path::PathBuf, sync::OnceLock};

static LOGGER: OnceLock<logger::Logger> = OnceLock::new();

const DEFAULT_LOGGING_FILE: &str = "logging.yaml";

/// Looks for "logging.yaml" below the working directory and initializes
/// file logging from it; falls back to console logging when there is none.
pub fn init_auto() -> Result<(), Box<dyn std::error::Error>> {
    match find_file(DEFAULT_LOGGING_FILE) {
        Ok(path) => init_with_yaml(path),
        Err(reason) => {
            init_console()?;
            info!("console logging enabled: {}", reason);
            Ok(())
        }
    }
}

/// Initialize logging system
///
/// # Arguments
/// * `config_path` - Path to the logging configuration file
pub fn init_with_yaml(config_path: impl Into<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let logger = logger::Logger::new_from_yaml(config_path)?;
    if LOGGER.set(logger).is_err() {
        return Err("Logger already initialized".into());
    }
    Ok(())
}

/// Console logging through `env_logger`, filtered by `RUST_LOG` (default `info`).
pub fn init_console() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init()?;
    Ok(())
}

// Re-export log macros for convenient use in other modules
use env_config_parse::find_file;
pub use log::{debug, error, info, trace, warn};
