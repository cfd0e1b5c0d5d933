pub mod time;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

const MINUTE_MS: i64 = 60 * 1000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

/// `all` 周期的标签。该标签会改变 `TimeframeSpec::window_ms` 的语义。
pub const ALL_LABEL: &str = "all";

/// `all` 周期的历史起点：2010-01-01T00:00:00Z（毫秒）。
pub const ALL_EPOCH_MS: i64 = 1_262_304_000_000;

/// # Summary
/// 向交易所请求的 K 线采样周期。
///
/// # Invariants
/// - 文本形式区分大小写（`1m` 为分钟，与图表标签 `1M` 无关）。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Interval {
    #[serde(rename = "1m")]
    Minute1,
    #[serde(rename = "15m")]
    Minute15,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "6h")]
    Hour6,
    #[serde(rename = "1d")]
    Day1,
    #[serde(rename = "1w")]
    Week1,
}

impl Interval {
    /// 单根 K 线覆盖的毫秒数。
    pub fn duration_ms(self) -> i64 {
        match self {
            Interval::Minute1 => MINUTE_MS,
            Interval::Minute15 => 15 * MINUTE_MS,
            Interval::Hour1 => HOUR_MS,
            Interval::Hour6 => 6 * HOUR_MS,
            Interval::Day1 => DAY_MS,
            Interval::Week1 => 7 * DAY_MS,
        }
    }
}

impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(Interval::Minute1),
            "15m" => Ok(Interval::Minute15),
            "1h" => Ok(Interval::Hour1),
            "6h" => Ok(Interval::Hour6),
            "1d" => Ok(Interval::Day1),
            "1w" => Ok(Interval::Week1),
            _ => Err(format!("Unknown Interval: {}", s)),
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Interval::Minute1 => write!(f, "1m"),
            Interval::Minute15 => write!(f, "15m"),
            Interval::Hour1 => write!(f, "1h"),
            Interval::Hour6 => write!(f, "6h"),
            Interval::Day1 => write!(f, "1d"),
            Interval::Week1 => write!(f, "1w"),
        }
    }
}

/// # Summary
/// 图表周期定义：标签、采样周期与窗口。
///
/// # Invariants
/// - 标签为 `all` 时，`window_ms` 表示绝对起始时间戳，而不是窗口长度。
/// - 其余标签的 `window_ms` 为相对 "now" 的回溯长度。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeframeSpec {
    // 图表周期标签 (例如: 1d, 1w, all)
    pub label: String,
    // 向交易所请求的采样周期
    pub interval: Interval,
    // 窗口长度，或 `all` 标签下的绝对起点
    pub window_ms: i64,
}

impl TimeframeSpec {
    pub fn new(label: &str, interval: Interval, window_ms: i64) -> Self {
        Self {
            label: label.to_string(),
            interval,
            window_ms,
        }
    }

    /// # Summary
    /// 计算该周期的分页起点。
    ///
    /// # Logic
    /// 1. 标签为 `all`：直接返回 `window_ms`（绝对时间戳）。
    /// 2. 其他标签：返回 `now_ms - window_ms`。
    ///
    /// # Arguments
    /// * `now_ms`: 本次运行采样的统一时刻。
    ///
    /// # Returns
    /// 起始时间戳（毫秒）。
    pub fn start_time_ms(&self, now_ms: i64) -> i64 {
        if self.label == ALL_LABEL {
            self.window_ms
        } else {
            now_ms - self.window_ms
        }
    }
}

/// 批量模式的周期表，包含 `1h`。
pub fn batch_timeframes() -> Vec<TimeframeSpec> {
    vec![
        TimeframeSpec::new("1h", Interval::Minute1, HOUR_MS),
        TimeframeSpec::new("1d", Interval::Minute15, DAY_MS),
        TimeframeSpec::new("1w", Interval::Hour1, 7 * DAY_MS),
        TimeframeSpec::new("1M", Interval::Hour6, 30 * DAY_MS),
        TimeframeSpec::new("1y", Interval::Day1, 365 * DAY_MS),
        TimeframeSpec::new(ALL_LABEL, Interval::Week1, ALL_EPOCH_MS),
    ]
}

/// 单周期模式的周期表，不包含 `1h`。
pub fn single_timeframes() -> Vec<TimeframeSpec> {
    batch_timeframes()
        .into_iter()
        .filter(|spec| spec.label != "1h")
        .collect()
}
