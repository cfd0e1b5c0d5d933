use crate::common::Interval;
use crate::market::entity::Candle;
use crate::market::error::MarketError;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

/// # Summary
/// 交易所行情能力接口（原始数据源）。
///
/// # Invariants
/// - 交易对使用统一格式 `BASE/QUOTE`（例如 `BTC/USDT`）。
/// - `fetch_candles` 返回的 K 线按开盘时间升序排列。
#[async_trait]
pub trait ExchangeConnector: Send + Sync {
    /// 交易所标识（例如 `binance`）。
    fn id(&self) -> &str;

    /// # Summary
    /// 获取交易所上架的全部交易对。
    ///
    /// # Logic
    /// 1. 请求交易所的交易对列表接口。
    /// 2. 将原生交易对代码转换为统一格式。
    ///
    /// # Returns
    /// 成功返回统一格式交易对集合。
    async fn list_markets(&self) -> Result<HashSet<String>, MarketError>;

    /// # Summary
    /// 从 `since_ms` 起获取至多 `limit` 根 K 线。
    ///
    /// # Logic
    /// 1. 将统一交易对与采样周期映射为交易所原生参数。
    /// 2. 发起一次分页请求并解析响应。
    /// 3. 按开盘时间升序返回。
    ///
    /// # Arguments
    /// * `symbol`: 统一格式交易对。
    /// * `interval`: 采样周期。
    /// * `since_ms`: 分页起点（包含）。
    /// * `limit`: 单页数量上限，实现可以按交易所上限收紧。
    ///
    /// # Returns
    /// 成功返回 K 线列表；没有更多数据时返回空列表。
    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: Interval,
        since_ms: i64,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketError>;
}

/// # Summary
/// 交易所连接工厂，根据标识实例化连接。
///
/// # Invariants
/// - 未知标识必须返回 `MarketError::UnsupportedExchange`，不能 panic。
pub trait ExchangeRegistry: Send + Sync {
    fn connect(&self, exchange_id: &str) -> Result<Arc<dyn ExchangeConnector>, MarketError>;
}
