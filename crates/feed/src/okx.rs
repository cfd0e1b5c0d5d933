use crate::rest::{RestClient, decimal, field, finish_page, integer, unified_symbol, window_end_ms};
use async_trait::async_trait;
use ohlc_core::common::Interval;
use ohlc_core::config::HttpConfig;
use ohlc_core::market::entity::Candle;
use ohlc_core::market::error::MarketError;
use ohlc_core::market::port::ExchangeConnector;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tokio::sync::OnceCell;

const BASE_URL: &str = "https://www.okx.com";
const MAX_LIMIT: usize = 100;

/// # Summary
/// OKX 现货行情实现。
///
/// # Invariants
/// - 历史 K 线接口倒序返回，且以 `before`/`after` 开区间分页。
/// - 6 小时及以上周期使用 UTC 对齐的 bar（`6Hutc`、`1Dutc`、`1Wutc`）。
pub struct OkxConnector {
    rest: RestClient,
    markets: OnceCell<HashMap<String, String>>,
}

#[derive(Deserialize, Debug)]
struct Envelope<T> {
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

impl<T> Envelope<T> {
    fn into_data(self) -> Result<Vec<T>, MarketError> {
        if self.code != "0" {
            return Err(MarketError::Exchange(format!(
                "okx code {}: {}",
                self.code, self.msg
            )));
        }
        Ok(self.data)
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Instrument {
    inst_id: String,
    base_ccy: String,
    quote_ccy: String,
}

impl OkxConnector {
    pub fn new(http: &HttpConfig) -> Result<Self, MarketError> {
        Ok(Self {
            rest: RestClient::new(BASE_URL, http)?,
            markets: OnceCell::new(),
        })
    }

    async fn markets(&self) -> Result<&HashMap<String, String>, MarketError> {
        self.markets
            .get_or_try_init(|| async {
                let resp: Envelope<Instrument> = self
                    .rest
                    .get(
                        "/api/v5/public/instruments",
                        &[("instType", "SPOT".to_string())],
                    )
                    .await?;
                let index: HashMap<String, String> = resp
                    .into_data()?
                    .into_iter()
                    .map(|i| (unified_symbol(&i.base_ccy, &i.quote_ccy), i.inst_id))
                    .collect();
                Ok::<_, MarketError>(index)
            })
            .await
    }
}

fn bar_param(interval: Interval) -> &'static str {
    match interval {
        Interval::Minute1 => "1m",
        Interval::Minute15 => "15m",
        Interval::Hour1 => "1H",
        Interval::Hour6 => "6Hutc",
        Interval::Day1 => "1Dutc",
        Interval::Week1 => "1Wutc",
    }
}

/// 行格式：`[ts, o, h, l, c, vol, volCcy, volCcyQuote, confirm]`。
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
impl ExchangeConnector for OkxConnector {
    fn id(&self) -> &str {
        "okx"
    }

    async fn list_markets(&self) -> Result<HashSet<String>, MarketError> {
        Ok(self.markets().await?.keys().cloned().collect())
    }

    /// # Summary
    /// 通过 `/api/v5/market/history-candles` 获取 `[since, since + limit * 周期)` 内的 K 线。
    ///
    /// # Logic
    /// 1. `before = since - 1` 取更新的记录，`after = 窗口末端` 取更旧的记录。
    /// 2. 单页上限 100。
    /// 3. 结果倒序，整理为升序。
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
        let limit = limit.clamp(1, MAX_LIMIT);

        let resp: Envelope<Vec<Value>> = self
            .rest
            .get(
                "/api/v5/market/history-candles",
                &[
                    ("instId", native),
                    ("bar", bar_param(interval).to_string()),
                    ("before", (since_ms - 1).to_string()),
                    ("after", window_end_ms(since_ms, interval, limit).to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        Ok(finish_page(parse_rows(&resp.into_data()?)?, since_ms, limit))
    }
}
