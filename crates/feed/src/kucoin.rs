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

const BASE_URL: &str = "https://api.kucoin.com";
const MAX_LIMIT: usize = 1500;
const SUCCESS_CODE: &str = "200000";

/// # Summary
/// KuCoin 现货行情实现。
///
/// # Invariants
/// - K 线接口以秒为单位、倒序返回，本实现统一转换为毫秒升序。
pub struct KucoinConnector {
    rest: RestClient,
    markets: OnceCell<HashMap<String, String>>,
}

/// KuCoin 通用响应外壳。
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
                "kucoin code {}: {}",
                self.code,
                self.msg.unwrap_or_default()
            )));
        }
        self.data
            .ok_or_else(|| MarketError::Parse("kucoin response without data".into()))
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct SymbolInfo {
    symbol: String,
    base_currency: String,
    quote_currency: String,
}

impl KucoinConnector {
    pub fn new(http: &HttpConfig) -> Result<Self, MarketError> {
        Ok(Self {
            rest: RestClient::new(BASE_URL, http)?,
            markets: OnceCell::new(),
        })
    }

    async fn markets(&self) -> Result<&HashMap<String, String>, MarketError> {
        self.markets
            .get_or_try_init(|| async {
                let resp: Envelope<Vec<SymbolInfo>> = self.rest.get("/api/v1/symbols", &[]).await?;
                Ok::<_, MarketError>(index(resp.into_data()?))
            })
            .await
    }
}

fn index(symbols: Vec<SymbolInfo>) -> HashMap<String, String> {
    symbols
        .into_iter()
        .map(|s| (unified_symbol(&s.base_currency, &s.quote_currency), s.symbol))
        .collect()
}

fn interval_param(interval: Interval) -> &'static str {
    match interval {
        Interval::Minute1 => "1min",
        Interval::Minute15 => "15min",
        Interval::Hour1 => "1hour",
        Interval::Hour6 => "6hour",
        Interval::Day1 => "1day",
        Interval::Week1 => "1week",
    }
}

/// 行格式：`[time(秒), open, close, high, low, volume, turnover]`，注意 close 在 high 之前。
fn parse_rows(rows: &[Vec<Value>]) -> Result<Vec<Candle>, MarketError> {
    rows.iter()
        .map(|row| -> Result<Candle, MarketError> {
            Ok(Candle::new(
                integer(field(row, 0)?)?.saturating_mul(1000),
                decimal(field(row, 1)?)?,
                decimal(field(row, 3)?)?,
                decimal(field(row, 4)?)?,
                decimal(field(row, 2)?)?,
                decimal(field(row, 5)?)?,
            ))
        })
        .collect()
}

#[async_trait]
impl ExchangeConnector for KucoinConnector {
    fn id(&self) -> &str {
        "kucoin"
    }

    async fn list_markets(&self) -> Result<HashSet<String>, MarketError> {
        Ok(self.markets().await?.keys().cloned().collect())
    }

    /// # Summary
    /// 通过 `/api/v1/market/candles` 按 `[startAt, endAt]` 区间分页。
    ///
    /// # Logic
    /// 1. `startAt` 取 `since` 所在秒，`endAt` 为 `since + limit * 周期`。
    /// 2. 解析后排序为升序，并丢弃早于 `since` 的 K 线。
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
        let end_ms = window_end_ms(since_ms, interval, limit);

        let resp: Envelope<Vec<Vec<Value>>> = self
            .rest
            .get(
                "/api/v1/market/candles",
                &[
                    ("symbol", native),
                    ("type", interval_param(interval).to_string()),
                    ("startAt", since_ms.div_euclid(1000).to_string()),
                    ("endAt", end_ms.div_euclid(1000).to_string()),
                ],
            )
            .await?;

        Ok(finish_page(parse_rows(&resp.into_data()?)?, since_ms, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbols_index() {
        let resp: Envelope<Vec<SymbolInfo>> = serde_json::from_str(
            r#"{"code":"200000","data":[
                {"symbol":"BTC-USDT","name":"BTC-USDT","baseCurrency":"BTC","quoteCurrency":"USDT","enableTrading":true}
            ]}"#,
        )
        .unwrap();
        let index = index(resp.into_data().unwrap());
        assert_eq!(index.get("BTC/USDT").map(String::as_str), Some("BTC-USDT"));
    }

    #[test]
    fn test_parse_rows_reorders_fields_and_scales_time() {
        let resp: Envelope<Vec<Vec<Value>>> = serde_json::from_str(
            r#"{"code":"200000","data":[
                ["1545904980","0.058","0.049","0.058","0.049","0.018","0.000945"],
                ["1545904920","0.060","0.058","0.061","0.057","0.020","0.001"]
            ]}"#,
        )
        .unwrap();
        let candles = finish_page(parse_rows(&resp.into_data().unwrap()).unwrap(), 0, 10);
        assert_eq!(candles[0].time_ms, 1_545_904_920_000);
        assert_eq!(candles[1].time_ms, 1_545_904_980_000);
        assert_eq!(candles[1].open, 0.058);
        assert_eq!(candles[1].close, 0.049);
        assert_eq!(candles[1].high, 0.058);
        assert_eq!(candles[1].low, 0.049);
    }

    #[test]
    fn test_error_code_is_reported() {
        let resp: Envelope<Vec<Vec<Value>>> =
            serde_json::from_str(r#"{"code":"400100","msg":"Unsupported trading pair."}"#).unwrap();
        let err = resp.into_data().unwrap_err();
        assert!(err.to_string().contains("400100"));
    }
}
