//! 应用运行配置加载。

use std::env;
use std::path::PathBuf;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: String,
    pub registry_dir: PathBuf,
    pub backup_dir: PathBuf,
    /// 备份计划表达式；合法性由备份模块在启动调度时校验。
    pub backup_schedule: String,
    /// 保留的快照数量，0 表示不限。
    pub backup_max_count: usize,
    pub backup_compress: bool,
    pub backup_enabled: bool,
    pub backup_stop_grace_ms: u64,
    pub printer_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub shutdown_timeout_ms: u64,
    pub log_level: String,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从任意键值来源读取配置（测试中用 HashMap 代替进程环境）。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup };
        let http_addr = vars
            .read_optional("PRINTCOMM_HTTP_ADDR")
            .ok_or_else(|| ConfigError::Missing("PRINTCOMM_HTTP_ADDR".to_string()))?;
        let registry_dir = vars
            .read_optional("PRINTCOMM_REGISTRY_DIR")
            .unwrap_or_else(|| "./data/registry".to_string());
        let backup_dir = vars
            .read_optional("PRINTCOMM_BACKUP_DIR")
            .unwrap_or_else(|| "./data/backups".to_string());
        let backup_schedule = vars
            .read_optional("PRINTCOMM_BACKUP_SCHEDULE")
            .unwrap_or_else(|| "@every 24h".to_string());
        let backup_max_count = vars.read_u64_with_default("PRINTCOMM_BACKUP_MAX_COUNT", 7)?;
        let backup_compress = vars.read_bool_with_default("PRINTCOMM_BACKUP_COMPRESS", true)?;
        let backup_enabled = vars.read_bool_with_default("PRINTCOMM_BACKUP_ENABLED", true)?;
        let backup_stop_grace_ms =
            vars.read_u64_with_default("PRINTCOMM_BACKUP_STOP_GRACE_MS", 10_000)?;
        let printer_timeout_ms = vars.read_u64_with_default("PRINTCOMM_PRINTER_TIMEOUT_MS", 1_000)?;
        let request_timeout_ms = vars.read_u64_with_default("PRINTCOMM_REQUEST_TIMEOUT_MS", 3_000)?;
        let shutdown_timeout_ms =
            vars.read_u64_with_default("PRINTCOMM_SHUTDOWN_TIMEOUT_MS", 5_000)?;
        let log_level = vars
            .read_optional("PRINTCOMM_LOG_LEVEL")
            .unwrap_or_else(|| "info".to_string());

        Ok(Self {
            http_addr,
            registry_dir: PathBuf::from(registry_dir),
            backup_dir: PathBuf::from(backup_dir),
            backup_schedule,
            backup_max_count: backup_max_count as usize,
            backup_compress,
            backup_enabled,
            backup_stop_grace_ms,
            printer_timeout_ms: positive("PRINTCOMM_PRINTER_TIMEOUT_MS", printer_timeout_ms)?,
            request_timeout_ms: positive("PRINTCOMM_REQUEST_TIMEOUT_MS", request_timeout_ms)?,
            shutdown_timeout_ms,
            log_level,
        })
    }
}

struct Vars<F> {
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn read_optional(&self, key: &str) -> Option<String> {
        match (self.lookup)(key) {
            Some(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
            _ => None,
        }
    }

    fn read_u64_with_default(&self, key: &str, default: u64) -> Result<u64, ConfigError> {
        let value = match self.read_optional(key) {
            Some(value) => value,
            None => return Ok(default),
        };
        value
            .parse::<u64>()
            .map_err(|_| ConfigError::Invalid(key.to_string(), value))
    }

    fn read_bool_with_default(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        let value = match self.read_optional(key) {
            Some(value) => value,
            None => return Ok(default),
        };
        match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "on" | "yes" => Ok(true),
            "0" | "false" | "off" | "no" => Ok(false),
            _ => Err(ConfigError::Invalid(key.to_string(), value)),
        }
    }
}

fn positive(key: &str, value: u64) -> Result<u64, ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid(key.to_string(), value.to_string()));
    }
    Ok(value)
}
