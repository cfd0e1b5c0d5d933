use ohlc_core::common::TimeframeSpec;
use ohlc_core::common::time::TimeProvider;
use ohlc_core::config::FetchProfile;
use ohlc_core::market::error::FetchError;
use ohlc_core::market::port::ExchangeRegistry;
use ohlc_core::store::port::SeriesStore;
use ohlc_market::{CandleAggregator, ExchangeLocator};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// 在当前模式的周期表中查找标签。
pub fn resolve_timeframe<'a>(
    profile: &'a FetchProfile,
    label: &str,
) -> Result<&'a TimeframeSpec, FetchError> {
    profile
        .timeframe(label)
        .ok_or_else(|| FetchError::InvalidTimeframe {
            label: label.to_string(),
            valid: profile.labels(),
        })
}

/// # Summary
/// 一次抓取运行：定位交易所、分页抓取、写文件。
///
/// # Invariants
/// - 全流程顺序执行，不持有跨运行的状态。
pub struct Fetcher {
    locator: ExchangeLocator,
    clock: Arc<dyn TimeProvider>,
}

impl Fetcher {
    pub fn new(registry: Arc<dyn ExchangeRegistry>, clock: Arc<dyn TimeProvider>) -> Self {
        Self {
            locator: ExchangeLocator::new(registry),
            clock,
        }
    }

    /// # Summary
    /// 批量模式：抓取全部周期并写入 `{symbol}_all.json`。
    ///
    /// # Logic
    /// 1. 定位交易所，未找到时终止。
    /// 2. 逐个周期抓取，单个周期失败不影响其他周期。
    /// 3. 所有周期都没有数据时返回 `EmptyResult`。
    /// 4. 写文件并返回绝对路径。
    pub async fn run_batch(
        &self,
        store: &dyn SeriesStore,
        profile: &FetchProfile,
        symbol: &str,
    ) -> Result<PathBuf, FetchError> {
        let located = self.locator.locate(symbol, &profile.exchanges).await?;
        let aggregator = CandleAggregator::new(self.clock.clone(), profile.page_limit);

        let series = aggregator
            .fetch_all(&located, symbol, &profile.timeframes)
            .await;
        if series.is_empty() {
            return Err(FetchError::EmptyResult(symbol.to_string()));
        }
        info!(%symbol, timeframes = series.len(), "Fetched all timeframes");

        Ok(store.save_all(symbol, &series).await?)
    }

    /// # Summary
    /// 单周期模式：抓取一个周期并写入 `{symbol}_{label}.json`。
    ///
    /// # Logic
    /// 1. 定位交易所。
    /// 2. 抓取过程中的任何错误都直接返回。
    /// 3. 没有数据时返回 `EmptyResult`。
    pub async fn run_single(
        &self,
        store: &dyn SeriesStore,
        profile: &FetchProfile,
        symbol: &str,
        spec: &TimeframeSpec,
    ) -> Result<PathBuf, FetchError> {
        let located = self.locator.locate(symbol, &profile.exchanges).await?;
        let aggregator = CandleAggregator::new(self.clock.clone(), profile.page_limit);

        let points = aggregator.fetch_one(&located, symbol, spec).await?;
        if points.is_empty() {
            return Err(FetchError::EmptyResult(symbol.to_string()));
        }
        info!(%symbol, timeframe = %spec.label, points = points.len(), "Fetched timeframe");

        Ok(store.save_timeframe(symbol, &spec.label, &points).await?)
    }
}
