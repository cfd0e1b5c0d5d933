use crate::binance::{ExchangeInfo, parse_klines};
use crate::rest::{RestClient, finish_page, window_end_ms};
use async_trait::async_trait;
use ohlc_core::common::Interval;
use ohlc_core::config::HttpConfig;
use ohlc_core::market::entity::Candle;
use ohlc_core::market::error::MarketError;
use ohlc_core::market::port::ExchangeConnector;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tokio::sync::OnceCell;

const BASE_URL: &str = "https://api.mexc.com";
const MAX_LIMIT: usize = 1000;

/// MEXC 现货行情实现，接口形态与 Binance v3 一致。
pub struct MexcConnector {
    rest: RestClient,
    markets: OnceCell<HashMap<String, String>>,
}

impl MexcConnector {
    pub fn new(http: &HttpConfig) -> Result<Self, MarketError> {
        Ok(Self {
            rest: RestClient::new(BASE_URL, http)?,
            markets: OnceCell::new(),
        })
    }

    async fn markets(&self) -> Result<&HashMap<String, String>, MarketError> {
        self.markets
            .get_or_try_init(|| async {
                let info: ExchangeInfo = self.rest.get("/api/v3/exchangeInfo", &[]).await?;
                Ok::<_, MarketError>(info.index())
            })
            .await
    }
}

/// MEXC 的周期写法：小时用分钟表示，周线大写。不提供 6 小时线。
fn interval_param(interval: Interval) -> Result<&'static str, MarketError> {
    match interval {
        Interval::Minute1 => Ok("1m"),
        Interval::Minute15 => Ok("15m"),
        Interval::Hour1 => Ok("60m"),
        Interval::Day1 => Ok("1d"),
        Interval::Week1 => Ok("1W"),
        Interval::Hour6 => Err(MarketError::UnsupportedInterval {
            exchange: "mexc".to_string(),
            interval,
        }),
    }
}

#[async_trait]
impl ExchangeConnector for MexcConnector {
    fn id(&self) -> &str {
        "mexc"
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

        // 只给 startTime 时 MEXC 返回最近的数据，需要同时给出 endTime
        let rows: Vec<Vec<Value>> = self
            .rest
            .get(
                "/api/v3/klines",
                &[
                    ("symbol", native),
                    ("interval", param.to_string()),
                    ("startTime", since_ms.to_string()),
                    ("endTime", window_end_ms(since_ms, interval, limit).to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        Ok(finish_page(parse_klines(&rows)?, since_ms, limit))
    }
}
