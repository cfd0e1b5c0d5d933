use crate::rest::{RestClient, decimal, field, finish_page, integer, unified_symbol, window_end_ms};
use async_trait::async_trait;
use ohlc_core::common::Interval;
use ohlc_core::common::time::{RealTimeProvider, TimeProvider};
use ohlc_core::config::HttpConfig;
use ohlc_core::market::entity::Candle;
use ohlc_core::market::error::MarketError;
use ohlc_core::market::port::ExchangeConnector;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tokio::sync::OnceCell;
use tracing::debug;

const BASE_URL: &str = "https://api.bitget.com";
const MAX_LIMIT: usize = 1000;
const MAX_HISTORY_LIMIT: usize = 200;
const SUCCESS_CODE: &str = "00000";
const DAY_MS: i64 = 86_400_000;
const RECENT_PATH: &str = "/api/v2/spot/market/candles";
const HISTORY_PATH: &str = "/api/v2/spot/market/history-candles";

/// # Summary
/// Bitget v2 现货行情实现。
///
/// # Invariants
/// - `market/candles` 只能回溯有限范围，更早的起点改走 `market/history-candles`。
/// - `history-candles` 只接受 `endTime`，单页上限 200。
pub struct BitgetConnector {
    rest: RestClient,
    markets: OnceCell<HashMap<String, String>>,
}

#[derive(Deserialize, Debug)]
struct Envelope<T> {
    code: String,
    #[serde(default)]
    msg: Option<String>,
    data: Option<T>,
}

impl<T> Envelope<T> {
    fn into_data(self) -> Result<T, MarketError> {
        if self.code != SUCCESS_CODE {
            return Err(MarketError::Exchange(format!(
                "bitget code {}: {}",
                self.code,
                self.msg.unwrap_or_default()
            )));
        }
        self.data
            .ok_or_else(|| MarketError::Parse("bitget response without data".into()))
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct SymbolInfo {
    symbol: String,
    base_coin: String,
    quote_coin: String,
}

impl BitgetConnector {
    pub fn new(http: &HttpConfig) -> Result<Self, MarketError> {
        Ok(Self {
            rest: RestClient::new(BASE_URL, http)?,
            markets: OnceCell::new(),
        })
    }

    async fn markets(&self) -> Result<&HashMap<String, String>, MarketError> {
        self.markets
            .get_or_try_init(|| async {
                let resp: Envelope<Vec<SymbolInfo>> =
                    self.rest.get("/api/v2/spot/public/symbols", &[]).await?;
                let index: HashMap<String, String> = resp
                    .into_data()?
                    .into_iter()
                    .map(|s| (unified_symbol(&s.base_coin, &s.quote_coin), s.symbol))
                    .collect();
                Ok::<_, MarketError>(index)
            })
            .await
    }
}

fn interval_param(interval: Interval) -> &'static str {
    match interval {
        Interval::Minute1 => "1min",
        Interval::Minute15 => "15min",
        Interval::Hour1 => "1h",
        Interval::Hour6 => "6h",
        Interval::Day1 => "1day",
        Interval::Week1 => "1week",
    }
}

/// `market/candles` 能覆盖的回溯范围。
fn recent_range_ms(interval: Interval) -> i64 {
    match interval {
        Interval::Minute1 => 30 * DAY_MS,
        Interval::Minute15 => 52 * DAY_MS,
        Interval::Hour1 => 83 * DAY_MS,
        Interval::Hour6 | Interval::Day1 | Interval::Week1 => 360 * DAY_MS,
    }
}

/// 一次 K 线请求的端点与参数。
#[derive(Debug, PartialEq, Eq)]
struct CandleRequest {
    path: &'static str,
    limit: usize,
    window_end_ms: i64,
    query: Vec<(&'static str, String)>,
}

impl CandleRequest {
    fn is_history(&self) -> bool {
        self.path == HISTORY_PATH
    }
}

/// # Summary
/// 按起点距离当前时间的远近选择端点。
///
/// # Logic
/// 1. 起点超出近期范围：`history-candles`，只带 `endTime = since + limit * 周期`。
/// 2. 否则：`candles`，带 `startTime`/`endTime`。
fn candle_request(
    native: &str,
    interval: Interval,
    since_ms: i64,
    now_ms: i64,
    limit: usize,
) -> CandleRequest {
    let granularity = interval_param(interval).to_string();
    if now_ms.saturating_sub(since_ms) > recent_range_ms(interval) {
        let limit = limit.clamp(1, MAX_HISTORY_LIMIT);
        let end = window_end_ms(since_ms, interval, limit);
        return CandleRequest {
            path: HISTORY_PATH,
            limit,
            window_end_ms: end,
            query: vec![
                ("symbol", native.to_string()),
                ("granularity", granularity),
                ("endTime", end.to_string()),
                ("limit", limit.to_string()),
            ],
        };
    }

    let limit = limit.clamp(1, MAX_LIMIT);
    let end = window_end_ms(since_ms, interval, limit);
    CandleRequest {
        path: RECENT_PATH,
        limit,
        window_end_ms: end,
        query: vec![
            ("symbol", native.to_string()),
            ("granularity", granularity),
            ("startTime", since_ms.to_string()),
            ("endTime", end.to_string()),
            ("limit", limit.to_string()),
        ],
    }
}

/// 行格式：`[ts, open, high, low, close, baseVolume, usdtVolume, quoteVolume]`，全部为字符串。
fn parse_rows(rows: &[Vec<Value>]) -> Result<Vec<Candle>, MarketError> {
    rows.iter()
        .map(|row| -> Result<Candle, MarketError> {
            Ok(Candle::new(
                integer(field(row, 0)?)?,
                decimal(field(row, 1)?)?,
                decimal(field(row, 2)?)?,
                decimal(field(row, 3)?)?,
                decimal(field(row, 4)?)?,
                decimal(field(row, 5)?)?,
            ))
        })
        .collect()
}

#[async_trait]
impl ExchangeConnector for BitgetConnector {
    fn id(&self) -> &str {
        "bitget"
    }

    async fn list_markets(&self) -> Result<HashSet<String>, MarketError> {
        Ok(self.markets().await?.keys().cloned().collect())
    }

    /// # Summary
    /// 获取 `since` 之后的一页 K 线。
    ///
    /// # Logic
    /// 1. 按起点选择 `candles` 或 `history-candles`。
    /// 2. 历史窗口为空且尚未到达当前时间时（交易对上线之前），窗口整体后移再请求。
    /// 3. 拿到数据或切换到近期端点后返回。
    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: Interval,
        since_ms: i64,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketError> {
        let native = self
            .markets()
            .await?
            .get(symbol)
            .cloned()
            .ok_or_else(|| MarketError::UnknownSymbol(symbol.to_string()))?;
        let now_ms = RealTimeProvider.now_ms();

        let mut since = since_ms;
        loop {
            let request = candle_request(&native, interval, since, now_ms, limit);
            let resp: Envelope<Vec<Vec<Value>>> =
                self.rest.get(request.path, &request.query).await?;
            let page = finish_page(parse_rows(&resp.into_data()?)?, since, request.limit);

            if !page.is_empty() || !request.is_history() || request.window_end_ms >= now_ms {
                return Ok(page);
            }
            debug!(%symbol, since, "Empty history window, moving forward");
            since = request.window_end_ms;
        }
    }
}
