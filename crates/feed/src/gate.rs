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

const BASE_URL: &str = "https://api.gateio.ws";
const MAX_LIMIT: usize = 1000;

/// # Summary
/// Gate.io v4 现货行情实现。
///
/// # Invariants
/// - `from`/`to` 为秒级闭区间，区间内点数不能超过 1000。
/// - 不提供 6 小时线。
pub struct GateConnector {
    rest: RestClient,
    markets: OnceCell<HashMap<String, String>>,
}

#[derive(Deserialize, Debug)]
struct CurrencyPair {
    id: String,
    base: String,
    quote: String,
}

impl GateConnector {
    pub fn new(http: &HttpConfig) -> Result<Self, MarketError> {
        Ok(Self {
            rest: RestClient::new(BASE_URL, http)?,
            markets: OnceCell::new(),
        })
    }

    async fn markets(&self) -> Result<&HashMap<String, String>, MarketError> {
        self.markets
            .get_or_try_init(|| async {
                let pairs: Vec<CurrencyPair> =
                    self.rest.get("/api/v4/spot/currency_pairs", &[]).await?;
                let index: HashMap<String, String> = pairs
                    .into_iter()
                    .map(|p| (unified_symbol(&p.base, &p.quote), p.id))
                    .collect();
                Ok::<_, MarketError>(index)
            })
            .await
    }
}

fn interval_param(interval: Interval) -> Result<&'static str, MarketError> {
    match interval {
        Interval::Minute1 => Ok("1m"),
        Interval::Minute15 => Ok("15m"),
        Interval::Hour1 => Ok("1h"),
        Interval::Day1 => Ok("1d"),
        Interval::Week1 => Ok("7d"),
        Interval::Hour6 => Err(MarketError::UnsupportedInterval {
            exchange: "gate".to_string(),
            interval,
        }),
    }
}

/// 行格式：`[t(秒), quote_volume, close, high, low, open, base_volume, closed]`。
fn parse_rows(rows: &[Vec<Value>]) -> Result<Vec<Candle>, MarketError> {
    rows.iter()
        .map(|row| -> Result<Candle, MarketError> {
            Ok(Candle::new(
                integer(field(row, 0)?)?.saturating_mul(1000),
                decimal(field(row, 5)?)?,
                decimal(field(row, 3)?)?,
                decimal(field(row, 4)?)?,
                decimal(field(row, 2)?)?,
                decimal(field(row, 6)?)?,
            ))
        })
        .collect()
}

#[async_trait]
impl ExchangeConnector for GateConnector {
    fn id(&self) -> &str {
        "gate"
    }

    async fn list_markets(&self) -> Result<HashSet<String>, MarketError> {
        Ok(self.markets().await?.keys().cloned().collect())
    }

    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: Interval,
        since_ms: i64,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketError> {
        let param = interval_param(interval)?;
        let native = self
            .markets()
            .await?
            .get(symbol)
            .cloned()
            .ok_or_else(|| MarketError::UnknownSymbol(symbol.to_string()))?;
        let limit = limit.clamp(1, MAX_LIMIT);

        // 向上取整到秒，避免重复拿到上一页最后一根
        let from = since_ms.saturating_add(999).div_euclid(1000);
        let to = window_end_ms(since_ms, interval, limit).div_euclid(1000) - 1;

        let rows: Vec<Vec<Value>> = self
            .rest
            .get(
                "/api/v4/spot/candlesticks",
                &[
                    ("currency_pair", native),
                    ("interval", param.to_string()),
                    ("from", from.to_string()),
                    ("to", to.to_string()),
                ],
            )
            .await?;

        Ok(finish_page(parse_rows(&rows)?, since_ms, limit))
    }
}
