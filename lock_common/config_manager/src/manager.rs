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

use serde::Deserialize;
use std::fs::File;
use std::io::{Read, BufReader};
use std::path::Path;
use std::sync::OnceLock;

/// Checks a freshly parsed configuration before it is published.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// A thread-safe singleton configuration manager that loads and provides access to configuration data.
///
/// # Type Parameters
///
/// * `T` - The configuration type; it must implement `Deserialize` and `Validate`.
pub struct ConfigSingleton<T: for<'a> Deserialize<'a> + Validate + Send + Sync + 'static> {
    instance: OnceLock<T>,
}

impl <T: for<'a> Deserialize<'a> + Validate + Send + Sync + 'static> ConfigSingleton<T> {
    /// Creates a new, uninitialized `ConfigSingleton` instance.
    pub const fn new() -> Self {
        ConfigSingleton {
            instance: OnceLock::new(),
        }
    }

    /// Initializes the configuration singleton by loading and parsing a YAML configuration file.
    ///
    /// If the singleton has already been initialized, this method returns
    /// `Ok(())` without changing the existing configuration.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// * The file cannot be opened or read
    /// * The YAML content cannot be parsed into the target type `T`
    /// * The parsed configuration does not pass validation
    pub fn initialize<P: AsRef<Path>>(&self, path: P) -> Result<(), String> {
        if self.instance.get().is_some() {
            return Ok(());
        }

        let file = File::open(path).map_err(|e| format!("Failed to open config file: {}", e))?;

        let mut contents = String::new();
        let mut reader = BufReader::new(file);
        reader.read_to_string(&mut contents).map_err(|e| format!("Failed to read config file: {}", e))?;

        self.initialize_from_str(&contents)
    }

    /// Same as `initialize`, with the YAML given directly.
    pub fn initialize_from_str(&self, contents: &str) -> Result<(), String> {
        if self.instance.get().is_some() {
            return Ok(());
        }
        let config = parse_config::<T>(contents)?;
        let _ = self.instance.set(config);
        Ok(())
    }

    /// Retrieves a reference to the configuration instance.
    ///
    /// # Errors
    ///
    /// Returns an error if `initialize` has not been called successfully before calling this method.
    pub fn get_instance(&self) -> Result<&T, String> {
        self.instance.get().ok_or_else(|| "Configuration not initialized".to_string())
    }
}

/// Parses and validates a configuration without publishing it anywhere.
pub fn parse_config<T: for<'a> Deserialize<'a> + Validate>(contents: &str) -> Result<T, String> {
    let config: T = serde_yaml::from_str(contents).map_err(|e| format!("Failed to parse YAML: {}", e))?;
    config.validate().map_err(|e| format!("Invalid configuration: {}", e))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[derive(Debug, Deserialize)]
    struct SampleConfig {
        name: String,
        #[serde(default)]
        port: u16,
    }

    impl Validate for SampleConfig {
        fn validate(&self) -> Result<(), String> {
            if self.name.is_empty() {
                return Err("name must not be empty".to_string());
            }
            Ok(())
        }
    }

    #[test]
    fn test_initialize_from_file_once() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "name: lock\nport: 8080\n").unwrap();

        let singleton: ConfigSingleton<SampleConfig> = ConfigSingleton::new();
        assert!(singleton.get_instance().is_err());
        singleton.initialize(file.path()).unwrap();
        singleton.initialize_from_str("name: other\n").unwrap();

        let config = singleton.get_instance().unwrap();
        assert_eq!(config.name, "lock");
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_invalid_config_is_not_published() {
        let singleton: ConfigSingleton<SampleConfig> = ConfigSingleton::new();
        let err = singleton.initialize_from_str("name: ''\n").unwrap_err();
        assert!(err.contains("name must not be empty"));
        assert!(singleton.get_instance().is_err());
    }

    #[test]
    fn test_missing_file() {
        let singleton: ConfigSingleton<SampleConfig> = ConfigSingleton::new();
        let err = singleton.initialize("/nonexistent/server_config.yaml").unwrap_err();
        assert!(err.starts_with("Failed to open config file"));
    }
}
