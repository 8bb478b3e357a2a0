//! 备份计划表达式
//!
//! 支持的写法：
//! - `@every <时长>`：`@every 6h`、`@every 90s`、`@every 1h 30m`
//! - 裸时长：`30m`
//! - 描述符：`@hourly`、`@daily` / `@midnight`、`@weekly`
//!
//! 所有写法都解析为固定间隔，从调度启动时刻开始计时。

use crate::error::SchedulerError;
use std::time::Duration;

const HOUR: u64 = 60 * 60;
const DAY: u64 = 24 * HOUR;

pub fn parse_schedule(expr: &str) -> Result<Duration, SchedulerError> {
    let trimmed = expr.trim();
    let lowered = trimmed.to_ascii_lowercase();
    let interval = match lowered.as_str() {
        "@hourly" => Duration::from_secs(HOUR),
        "@daily" | "@midnight" => Duration::from_secs(DAY),
        "@weekly" => Duration::from_secs(7 * DAY),
        _ => {
            let raw = match lowered.strip_prefix("@every") {
                Some(rest) => rest.trim(),
                None => lowered.as_str(),
            };
            humantime::parse_duration(raw).map_err(|err| invalid(expr, err.to_string()))?
        }
    };
    if interval.is_zero() {
        return Err(invalid(expr, "interval must be greater than zero"));
    }
    Ok(interval)
}

fn invalid(expr: &str, reason: impl Into<String>) -> SchedulerError {
    SchedulerError::InvalidSchedule {
        expr: expr.to_string(),
        reason: reason.into(),
    }
}
