use chrono::{DateTime, Local};
use log::LevelFilter;
use log4rs::append::rolling_file::policy::compound::roll::fixed_window::FixedWindowRoller;
use log4rs::append::rolling_file::policy::compound::trigger::size::SizeTrigger as SizeBasedTriggerPolicy;
use log4rs::append::rolling_file::policy::compound::CompoundPolicy;
use log4rs::{
    append::rolling_file::RollingFileAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    Config, Handle,
};
use std::path::{Path, PathBuf};
use env_config_parse::get_env_value;
use crate::config::{LogConfig, LoggerConfig};

const LOG_OUTPUT_DIR: &str = "LOG_OUTPUT_DIR";
const LOG_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S:%3f)} {l} [{M}:{L}] - {m}{n}";
const ROOT_APPENDER: &str = "root_appender";

pub struct Logger {
    _handle: Handle,
}

impl Logger {
    pub fn new_from_yaml(config_path: impl Into<PathBuf>) -> Result<Self, Box<dyn std::error::Error>> {
        let config = LogConfig::from_yaml(config_path)?;
        Self::new_from_config(config)
    }

    pub fn new_from_config(config: LogConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let final_config = Self::build_config(&config, &log_root())?;
        let handle = log4rs::init_config(final_config)?;
        Ok(Self { _handle: handle })
    }

    /// Builds the log4rs configuration with every log file placed under `log_root`.
    pub(crate) fn build_config(config: &LogConfig, log_root: &Path) -> Result<Config, Box<dyn std::error::Error>> {
        let mut log4rs_config = Config::builder();

        // One appender per module logger
        for logger_config in config.module_loggers() {
            let appender = Self::create_appender(logger_config, log_root)?;
            let appender_name = format!("{}_appender", logger_config.path_prefix);
            log4rs_config = log4rs_config
                .appender(Appender::builder().build(&appender_name, Box::new(appender)));

            let logger = log4rs::config::Logger::builder()
                .appender(appender_name)
                .additive(false)
                .build(
                    logger_config.path_prefix.clone(),
                    Self::parse_level(&logger_config.level),
                );
            log4rs_config = log4rs_config.logger(logger);
        }

        let root = match config.get_root_config() {
            Some(root_config) => {
                let root_appender = Self::create_appender(root_config, log_root)?;
                log4rs_config = log4rs_config
                    .appender(Appender::builder().build(ROOT_APPENDER, Box::new(root_appender)));
                Root::builder()
                    .appender(ROOT_APPENDER)
                    .build(Self::parse_level(&root_config.level))
            }
            None => Root::builder().build(LevelFilter::Info),
        };

        Ok(log4rs_config.build(root)?)
    }

    fn create_appender(
        config: &LoggerConfig,
        log_root: &Path,
    ) -> Result<RollingFileAppender, Box<dyn std::error::Error>> {
        let log_directory = log_root.join(&config.log_directory);
        std::fs::create_dir_all(&log_directory)?;

        let now: DateTime<Local> = Local::now();
        let formatted_time = now.format("%Y%m%d%H%M%S%3f").to_string();

        let log_file = log_directory.join(&config.log_file_name);
        let archived_log_pattern = format!(
            "{}/{}-{{}}-{}.zip",
            log_directory.display(), config.log_file_name, formatted_time
        );

        let size_trigger = SizeBasedTriggerPolicy::new(config.max_file_size);
        let roller =
            FixedWindowRoller::builder().build(&archived_log_pattern, config.max_zip_count)?;
        let compound_policy = CompoundPolicy::new(Box::new(size_trigger), Box::new(roller));

        let appender = RollingFileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
            .build(log_file, Box::new(compound_policy))?;

        Ok(appender)
    }

    pub(crate) fn parse_level(level: &str) -> LevelFilter {
        match level.to_lowercase().as_str() {
            "trace" => LevelFilter::Trace,
            "debug" => LevelFilter::Debug,
            "info" => LevelFilter::Info,
            "warn" => LevelFilter::Warn,
            "error" => LevelFilter::Error,
            "off" => LevelFilter::Off,
            _ => LevelFilter::Info,
        }
    }
}

fn log_root() -> PathBuf {
    get_env_value(LOG_OUTPUT_DIR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(Logger::parse_level("DEBUG"), LevelFilter::Debug);
        assert_eq!(Logger::parse_level("warn"), LevelFilter::Warn);
        assert_eq!(Logger::parse_level("verbose"), LevelFilter::Info);
    }

    #[test]
    fn test_build_config_creates_log_directories() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig::from_yaml_str(
            r#"loggers:
  - path_prefix: root
    log_directory: logs
    log_file_name: root.log
    max_file_size: 1048576
    max_zip_count: 3
    level: info
  - path_prefix: distributed_lock
    log_directory: lock-logs
    log_file_name: lock.log
    max_file_size: 1048576
    max_zip_count: 3
    level: debug
"#,
        )
        .unwrap();

        let built = Logger::build_config(&config, dir.path()).unwrap();
        assert_eq!(built.root().level(), LevelFilter::Info);
        assert_eq!(built.loggers().len(), 1);
        assert_eq!(built.loggers()[0].name(), "distributed_lock");
        assert!(dir.path().join("logs").is_dir());
        assert!(dir.path().join("lock-logs").is_dir());
    }
}
