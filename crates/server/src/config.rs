// SPDX-License-Identifier: MIT

//! Typed config loaded directly from environment variables (spec §6), in the
//! teacher's `Config::load()` style rather than via a config-file crate.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("environment variable {0} has an invalid value: {1}")]
    Invalid(&'static str, String),
}

/// Process-wide configuration, read once at `oted` startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub db_file: PathBuf,
    pub db_max_idle_conns: u32,
    pub db_max_open_conns: u32,
    pub db_max_conn_lifetime: Duration,
    pub log_file: Option<PathBuf>,
    pub task_logger_dir_path: PathBuf,
    pub cmd_validate: bool,
    pub debug: bool,
    pub swagger_file_path: Option<PathBuf>,
}

impl Config {
    /// Load from environment, with the same defaults the original daemon
    /// ships (`DB_MAX_IDLE_CONNS=2`, `DB_MAX_OPEN_CONNS=5`,
    /// `DB_MAX_CONN_LIFETIME=10s`, `TASK_LOGGER_DIR_PATH=./task_logs`,
    /// `CMD_VALIDATE=true`).
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            server_port: parse_env_or("SERVER_PORT", 8080)?,
            db_file: required_path("DB_FILE")?,
            db_max_idle_conns: parse_env_or("DB_MAX_IDLE_CONNS", 2)?,
            db_max_open_conns: parse_env_or("DB_MAX_OPEN_CONNS", 5)?,
            db_max_conn_lifetime: Duration::from_secs(parse_env_or("DB_MAX_CONN_LIFETIME", 10)?),
            log_file: optional_path("LOG_FILE"),
            task_logger_dir_path: optional_path("TASK_LOGGER_DIR_PATH")
                .unwrap_or_else(|| PathBuf::from("./task_logs")),
            cmd_validate: parse_bool_or("CMD_VALIDATE", true)?,
            debug: parse_bool_or("DEBUG", false)?,
            swagger_file_path: optional_path("SWAGGER_FILE_PATH"),
        })
    }
}

fn optional_path(name: &str) -> Option<PathBuf> {
    std::env::var(name).ok().map(PathBuf::from)
}

fn required_path(name: &'static str) -> Result<PathBuf, ConfigError> {
    std::env::var(name)
        .map(PathBuf::from)
        .map_err(|_| ConfigError::Missing(name))
}

fn parse_env_or<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::Invalid(name, raw.clone())),
        Err(_) => Ok(default),
    }
}

fn parse_bool_or(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid(name, raw)),
        },
        Err(_) => Ok(default),
    }
}
