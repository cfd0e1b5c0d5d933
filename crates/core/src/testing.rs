//! 测试替身：内存交易所与内存注册表。

use crate::common::Interval;
use crate::market::entity::Candle;
use crate::market::error::MarketError;
use crate::market::port::{ExchangeConnector, ExchangeRegistry};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

/// 一次 `fetch_candles` 调用的参数记录。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCall {
    pub symbol: String,
    pub interval: Interval,
    pub since_ms: i64,
    pub limit: usize,
}

/// # Summary
/// 内存交易所。
///
/// # Logic
/// - 若预置了脚本页 (`push_page` / `push_error`)，按顺序返回，脚本耗尽后返回空页。
/// - 否则从 `history` 中返回 `time_ms >= since` 的前 `limit` 根 K 线。
pub struct FakeExchange {
    id: String,
    markets: HashSet<String>,
    listing_error: Option<String>,
    history: Vec<Candle>,
    script: Mutex<VecDeque<Result<Vec<Candle>, MarketError>>>,
    listing_calls: Mutex<usize>,
    fetch_calls: Mutex<Vec<FetchCall>>,
}

impl FakeExchange {
    pub fn new(id: &str, markets: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            markets: markets.iter().map(|m| m.to_string()).collect(),
            listing_error: None,
            history: Vec::new(),
            script: Mutex::new(VecDeque::new()),
            listing_calls: Mutex::new(0),
            fetch_calls: Mutex::new(Vec::new()),
        }
    }

    /// 列表接口总是失败的交易所。
    pub fn failing(id: &str, message: &str) -> Self {
        let mut exchange = Self::new(id, &[]);
        exchange.listing_error = Some(message.to_string());
        exchange
    }

    pub fn with_history(mut self, mut candles: Vec<Candle>) -> Self {
        candles.sort_by_key(|c| c.time_ms);
        self.history = candles;
        self
    }

    pub fn push_page(&self, page: Vec<Candle>) {
        lock(&self.script).push_back(Ok(page));
    }

    pub fn push_error(&self, error: MarketError) {
        lock(&self.script).push_back(Err(error));
    }

    pub fn listing_calls(&self) -> usize {
        *lock(&self.listing_calls)
    }

    pub fn fetch_calls(&self) -> Vec<FetchCall> {
        lock(&self.fetch_calls).clone()
    }
}

#[async_trait]
impl ExchangeConnector for FakeExchange {
    fn id(&self) -> &str {
        &self.id
    }

    async fn list_markets(&self) -> Result<HashSet<String>, MarketError> {
        *lock(&self.listing_calls) += 1;
        match &self.listing_error {
            Some(message) => Err(MarketError::Network(message.clone())),
            None => Ok(self.markets.clone()),
        }
    }

    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: Interval,
        since_ms: i64,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketError> {
        lock(&self.fetch_calls).push(FetchCall {
            symbol: symbol.to_string(),
            interval,
            since_ms,
            limit,
        });

        if let Some(scripted) = lock(&self.script).pop_front() {
            return scripted;
        }
        Ok(self
            .history
            .iter()
            .filter(|c| c.time_ms >= since_ms)
            .take(limit)
            .cloned()
            .collect())
    }
}

/// # Summary
/// 内存注册表，记录每次 `connect` 的交易所标识。
///
/// # Invariants
/// - 未注册的标识返回 `MarketError::UnsupportedExchange`。
#[derive(Default)]
pub struct FakeRegistry {
    exchanges: HashMap<String, Arc<FakeExchange>>,
    connects: Mutex<Vec<String>>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, exchange: Arc<FakeExchange>) -> Self {
        self.exchanges.insert(exchange.id.clone(), exchange);
        self
    }

    pub fn connects(&self) -> Vec<String> {
        lock(&self.connects).clone()
    }
}

impl ExchangeRegistry for FakeRegistry {
    fn connect(&self, exchange_id: &str) -> Result<Arc<dyn ExchangeConnector>, MarketError> {
        lock(&self.connects).push(exchange_id.to_string());
        self.exchanges
            .get(exchange_id)
            .map(|e| e.clone() as Arc<dyn ExchangeConnector>)
            .ok_or_else(|| MarketError::UnsupportedExchange(exchange_id.to_string()))
    }
}

/// 按固定步长生成一段连续 K 线，收盘价等于序号。
pub fn candle_run(start_ms: i64, step_ms: i64, count: usize) -> Vec<Candle> {
    (0..count)
        .scan(start_ms, |ts, i| {
            let candle = Candle::new(*ts, 1.0, 2.0, 0.5, close_of(i), 10.0);
            *ts += step_ms;
            Some(candle)
        })
        .collect()
}

fn close_of(i: usize) -> f64 {
    u32::try_from(i).map(f64::from).unwrap_or(f64::MAX)
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
