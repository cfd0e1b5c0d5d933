use crate::rest::{RestClient, decimal, field, finish_page, integer, unified_symbol};
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

const BASE_URL: &str = "https://api.binance.com";
const MAX_LIMIT: usize = 1000;

/// # Summary
/// Binance 现货行情实现。
///
/// # Invariants
/// - 交易对列表只在首次使用时加载一次，后续调用复用缓存。
pub struct BinanceConnector {
    rest: RestClient,
    // 统一交易对 -> 原生代码 (BTC/USDT -> BTCUSDT)
    markets: OnceCell<HashMap<String, String>>,
}

impl BinanceConnector {
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

/// `/api/v3/exchangeInfo` 响应，MEXC 使用同一结构。
#[derive(Deserialize, Debug)]
pub(crate) struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct SymbolInfo {
    symbol: String,
    base_asset: String,
    quote_asset: String,
}

impl ExchangeInfo {
    pub(crate) fn index(self) -> HashMap<String, String> {
        self.symbols
            .into_iter()
            .map(|s| (unified_symbol(&s.base_asset, &s.quote_asset), s.symbol))
            .collect()
    }
}

/// # Summary
/// 解析 `[openTime, open, high, low, close, volume, ...]` 形式的 K 线行。
///
/// # Logic
/// 1. 开盘时间为毫秒整数，价格字段为字符串。
/// 2. MEXC 的 `/api/v3/klines` 复用此解析。
pub(crate) fn parse_klines(rows: &[Vec<Value>]) -> Result<Vec<Candle>, MarketError> {
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
impl ExchangeConnector for BinanceConnector {
    fn id(&self) -> &str {
        "binance"
    }

    async fn list_markets(&self) -> Result<HashSet<String>, MarketError> {
        Ok(self.markets().await?.keys().cloned().collect())
    }

    /// # Summary
    /// 通过 `/api/v3/klines` 以 `startTime` 分页。
    ///
    /// # Logic
    /// 1. 将统一交易对转换为原生代码。
    /// 2. `limit` 收紧到 1000。
    /// 3. 请求并解析数组行。
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

        let rows: Vec<Vec<Value>> = self
            .rest
            .get(
                "/api/v3/klines",
                &[
                    ("symbol", native),
                    ("interval", interval.to_string()),
                    ("startTime", since_ms.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        Ok(finish_page(parse_klines(&rows)?, since_ms, limit))
    }
}
