use crate::common::{TimeframeSpec, batch_timeframes, single_timeframes};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// 全局应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub batch: FetchProfile,
    pub single: FetchProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

/// # Summary
/// 一种运行模式的完整抓取参数，显式传入定位器与聚合器。
///
/// # Invariants
/// - `exchanges` 的顺序即探测顺序，不能排序或去重。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchProfile {
    pub output_dir: String,
    pub exchanges: Vec<String>,
    pub page_limit: usize,
    pub timeframes: Vec<TimeframeSpec>,
}

impl FetchProfile {
    /// 批量模式：全部周期写入 `ohlc_data/`。
    pub fn batch() -> Self {
        Self {
            output_dir: "ohlc_data".to_string(),
            exchanges: ["binance", "kucoin", "bitget", "okx", "gate", "mexc"]
                .map(String::from)
                .to_vec(),
            page_limit: 1500,
            timeframes: batch_timeframes(),
        }
    }

    /// 单周期模式：供其他进程调用，输出到 `/tmp/output_data`。
    pub fn single() -> Self {
        Self {
            output_dir: "/tmp/output_data".to_string(),
            exchanges: ["kucoin", "bitget", "mexc"].map(String::from).to_vec(),
            page_limit: 1500,
            timeframes: single_timeframes(),
        }
    }

    pub fn timeframe(&self, label: &str) -> Option<&TimeframeSpec> {
        self.timeframes.iter().find(|spec| spec.label == label)
    }

    pub fn labels(&self) -> Vec<String> {
        self.timeframes.iter().map(|spec| spec.label.clone()).collect()
    }

    fn apply(&mut self, overrides: ProfileOverrides) {
        if let Some(dir) = overrides.output_dir {
            self.output_dir = dir;
        }
        if let Some(exchanges) = overrides.exchanges {
            self.exchanges = exchanges;
        }
        if let Some(limit) = overrides.page_limit {
            self.page_limit = limit;
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig {
                timeout_secs: 30,
                user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string(),
            },
            batch: FetchProfile::batch(),
            single: FetchProfile::single(),
        }
    }
}

/// # Summary
/// 配置文件与环境变量中可覆盖的字段，缺省字段保留内置值。
///
/// # Invariants
/// - 周期表不可覆盖，只能由运行模式决定。
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    pub http: HttpOverrides,
    pub batch: ProfileOverrides,
    pub single: ProfileOverrides,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HttpOverrides {
    pub timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfileOverrides {
    pub output_dir: Option<String>,
    pub exchanges: Option<Vec<String>>,
    pub page_limit: Option<usize>,
}

impl AppConfig {
    /// # Summary
    /// 在内置默认值之上叠加覆盖项。
    ///
    /// # Logic
    /// 1. 逐字段检查覆盖项，存在则替换。
    /// 2. 列表字段整体替换，不做合并。
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        debug!(?overrides, "Applying configuration overrides");
        if let Some(secs) = overrides.http.timeout_secs {
            self.http.timeout_secs = secs;
        }
        if let Some(agent) = overrides.http.user_agent {
            self.http.user_agent = agent;
        }
        self.batch.apply(overrides.batch);
        self.single.apply(overrides.single);
        self
    }
}
