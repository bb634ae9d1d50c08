use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[cfg(windows)]
pub const DEFAULT_PIPE_NAME: &str = r"\\.\pipe\jshellpipe";
#[cfg(not(windows))]
pub const DEFAULT_PIPE_NAME: &str = "/tmp/jshellpipe";

pub const DEFAULT_CONNECT_RETRIES: u32 = 20;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 100;
pub const DEFAULT_READ_BUFFER_SIZE: usize = 32 * 1024;
pub const DEFAULT_TARGET_PROCESS: &str = "RuneLite.exe";

/// Process-wide bridge settings, fixed when the session is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub pipe_name: String,
    pub connect_retries: u32,
    pub retry_delay_ms: u64,
    pub read_buffer_size: usize,
    /// No timeout when `None`: a stalled remote blocks the caller.
    pub read_timeout_ms: Option<u64>,
    pub payload_path: Option<PathBuf>,
    pub target_process: String,
    pub run_prelude: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            pipe_name: DEFAULT_PIPE_NAME.to_string(),
            connect_retries: DEFAULT_CONNECT_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            read_timeout_ms: None,
            payload_path: None,
            target_process: DEFAULT_TARGET_PROCESS.to_string(),
            run_prelude: true,
        }
    }
}

impl BridgeConfig {
    /// Build a config from `JSHELL_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(name) = lookup("JSHELL_PIPE_NAME").filter(|v| !v.trim().is_empty()) {
            config.pipe_name = name;
        }
        if let Some(retries) = parse_var(&lookup, "JSHELL_CONNECT_RETRIES")? {
            config.connect_retries = retries;
        }
        if let Some(delay) = parse_var(&lookup, "JSHELL_RETRY_DELAY_MS")? {
            config.retry_delay_ms = delay;
        }
        if let Some(size) = parse_var::<usize, _>(&lookup, "JSHELL_READ_BUFFER")? {
            if size == 0 {
                return Err(BridgeError::Config(
                    "JSHELL_READ_BUFFER must be greater than zero".to_string(),
                ));
            }
            config.read_buffer_size = size;
        }
        if let Some(timeout) = parse_var(&lookup, "JSHELL_READ_TIMEOUT_MS")? {
            config.read_timeout_ms = Some(timeout);
        }
        if let Some(path) = lookup("JSHELL_PAYLOAD").filter(|v| !v.trim().is_empty()) {
            config.payload_path = Some(PathBuf::from(path));
        }
        if let Some(process) = lookup("JSHELL_TARGET_PROCESS").filter(|v| !v.trim().is_empty()) {
            config.target_process = process;
        }
        if let Some(skip) = lookup("JSHELL_SKIP_PRELUDE") {
            config.run_prelude = !is_truthy(&skip);
        }

        Ok(config)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| BridgeError::Config(format!("{} has invalid value '{}'", key, raw))),
        None => Ok(None),
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
