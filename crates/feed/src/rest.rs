use ohlc_core::common::Interval;
use ohlc_core::config::HttpConfig;
use ohlc_core::market::entity::Candle;
use ohlc_core::market::error::MarketError;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Once;
use std::time::Duration;
use tracing::debug;

static CRYPTO_PROVIDER: Once = Once::new();

/// 安装进程级 rustls 加密后端（reqwest 以 `rustls-no-provider` 编译）。
pub fn install_crypto_provider() {
    CRYPTO_PROVIDER.call_once(|| {
        if rustls::crypto::ring::default_provider()
            .install_default()
            .is_err()
        {
            debug!("rustls crypto provider was already installed");
        }
    });
}

/// # Summary
/// 交易所公共 REST 接口的轻量封装。
///
/// # Invariants
/// - 所有请求共享同一个带超时与 User-Agent 的 `reqwest` 客户端。
/// - 非 2xx 响应统一映射为 `MarketError::Exchange`。
#[derive(Clone)]
pub struct RestClient {
    client: Client,
    base_url: String,
}

impl RestClient {
    /// # Summary
    /// 创建指向 `base_url` 的 REST 客户端。
    ///
    /// # Logic
    /// 1. 确保 rustls 加密后端已安装。
    /// 2. 按配置设置超时与 User-Agent。
    ///
    /// # Returns
    /// 客户端构建失败时返回 `MarketError::Network`。
    pub fn new(base_url: &str, http: &HttpConfig) -> Result<Self, MarketError> {
        install_crypto_provider();
        let client = Client::builder()
            .timeout(Duration::from_secs(http.timeout_secs))
            .user_agent(http.user_agent.as_str())
            .build()
            .map_err(|e| MarketError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// # Summary
    /// 发起 GET 请求并将响应体解析为 `T`。
    ///
    /// # Logic
    /// 1. 拼接 URL 与查询参数后发送请求。
    /// 2. 非 2xx 时读取响应体作为错误详情。
    /// 3. 解析 JSON。
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, MarketError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, ?query, "GET");

        let resp = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| MarketError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MarketError::Exchange(format!("HTTP {}: {}", status, body)));
        }

        resp.json()
            .await
            .map_err(|e| MarketError::Parse(e.to_string()))
    }
}

/// 统一交易对格式 `BASE/QUOTE`。
pub fn unified_symbol(base: &str, quote: &str) -> String {
    format!("{}/{}", base.to_uppercase(), quote.to_uppercase())
}

/// `since + limit * interval`，溢出时饱和。
pub fn window_end_ms(since_ms: i64, interval: Interval, limit: usize) -> i64 {
    let count = i64::try_from(limit).unwrap_or(i64::MAX);
    since_ms.saturating_add(interval.duration_ms().saturating_mul(count))
}

/// 读取字符串或数字形式的价格字段，只接受有限值（`NaN`、`inf` 无法写入 JSON）。
pub fn decimal(value: &Value) -> Result<f64, MarketError> {
    let parsed = match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| MarketError::Parse(format!("not a finite number: {}", n)))?,
        Value::String(s) => s
            .parse::<f64>()
            .map_err(|_| MarketError::Parse(format!("not a decimal: {:?}", s)))?,
        other => return Err(MarketError::Parse(format!("expected decimal, got {}", other))),
    };
    if !parsed.is_finite() {
        return Err(MarketError::Parse(format!("not a finite number: {}", value)));
    }
    Ok(parsed)
}

/// 读取字符串或数字形式的整数时间戳。
pub fn integer(value: &Value) -> Result<i64, MarketError> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| MarketError::Parse(format!("not an integer: {}", n))),
        Value::String(s) => s
            .parse()
            .map_err(|_| MarketError::Parse(format!("not an integer: {:?}", s))),
        other => Err(MarketError::Parse(format!("expected integer, got {}", other))),
    }
}

/// 按下标读取行字段，行过短时报错。
pub fn field(row: &[Value], index: usize) -> Result<&Value, MarketError> {
    row.get(index).ok_or_else(|| {
        MarketError::Parse(format!(
            "candle row has {} fields, expected more than {}",
            row.len(),
            index
        ))
    })
}

/// # Summary
/// 统一整理一页 K 线。
///
/// # Logic
/// 1. 按开盘时间升序排序（部分交易所倒序返回）。
/// 2. 丢弃早于 `since_ms` 的 K 线（秒级接口会向下取整）。
/// 3. 截断到 `limit` 根。
pub fn finish_page(mut candles: Vec<Candle>, since_ms: i64, limit: usize) -> Vec<Candle> {
    candles.sort_by_key(|c| c.time_ms);
    candles.retain(|c| c.time_ms >= since_ms);
    candles.truncate(limit);
    candles
}
