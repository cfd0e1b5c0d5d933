use crate::locator::Located;
use ohlc_core::common::time::TimeProvider;
use ohlc_core::common::{Interval, TimeframeSpec};
use ohlc_core::market::entity::{Candle, SeriesMap, SeriesPoint};
use ohlc_core::market::error::{FetchError, MarketError};
use ohlc_core::market::port::ExchangeConnector;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 一次分页抓取的结果：已拿到的 K 线，以及使抓取提前结束的错误（如有）。
#[derive(Debug, Default)]
pub struct Pagination {
    pub candles: Vec<Candle>,
    pub failure: Option<MarketError>,
}

/// # Summary
/// 从 `start_ms` 开始分页抓取，直到窗口耗尽或交易所不再返回数据。
///
/// # Logic
/// 1. `cursor < now_ms` 时请求一页。
/// 2. 空页结束分页。
/// 3. 游标推进到最后一根 K 线开盘时间 + 1；游标未前进时记录警告并结束。
/// 4. 请求失败时保留已抓取部分，错误随结果一起返回。
///
/// # Invariants
/// - 游标严格递增，循环必然终止。
pub async fn paginate(
    connector: &dyn ExchangeConnector,
    symbol: &str,
    interval: Interval,
    start_ms: i64,
    now_ms: i64,
    page_limit: usize,
) -> Pagination {
    let mut result = Pagination::default();
    let mut cursor = start_ms;

    while cursor < now_ms {
        let page = match connector
            .fetch_candles(symbol, interval, cursor, page_limit)
            .await
        {
            Ok(page) => page,
            Err(e) => {
                error!(exchange = connector.id(), %symbol, %interval, cursor, error = %e, "Candle request failed");
                result.failure = Some(e);
                break;
            }
        };

        let Some(next) = page.last().map(|c| c.time_ms.saturating_add(1)) else {
            debug!(exchange = connector.id(), %symbol, cursor, "Empty page, pagination finished");
            break;
        };
        debug!(
            exchange = connector.id(),
            %symbol,
            cursor,
            count = page.len(),
            "Fetched page"
        );
        result.candles.extend(page);

        if next <= cursor {
            warn!(
                exchange = connector.id(),
                %symbol,
                cursor,
                next,
                "Page did not advance the cursor, stopping"
            );
            break;
        }
        cursor = next;
    }

    result
}

/// 将 K 线投影为 `(开盘时间, 收盘价)`。
pub fn reduce(candles: &[Candle]) -> Vec<SeriesPoint> {
    candles.iter().map(SeriesPoint::from).collect()
}

/// # Summary
/// K 线聚合器：按周期表逐个抓取并归约为图表序列。
///
/// # Invariants
/// - 每次运行只采样一次当前时间，所有周期共享同一个 `now`。
/// - 周期之间顺序执行，同一时刻只有一个请求在途。
pub struct CandleAggregator {
    clock: Arc<dyn TimeProvider>,
    page_limit: usize,
}

impl CandleAggregator {
    pub fn new(clock: Arc<dyn TimeProvider>, page_limit: usize) -> Self {
        Self { clock, page_limit }
    }

    /// # Summary
    /// 批量模式：抓取全部周期。
    ///
    /// # Logic
    /// 1. 采样 `now`，依次计算每个周期的起点并分页抓取。
    /// 2. 某周期失败只记录日志，已抓到的部分照常保留。
    /// 3. 没有任何数据的周期不写入结果。
    pub async fn fetch_all(
        &self,
        located: &Located,
        symbol: &str,
        timeframes: &[TimeframeSpec],
    ) -> SeriesMap {
        let now_ms = self.clock.now_ms();
        let mut series = SeriesMap::new();

        for spec in timeframes {
            info!(exchange = %located.exchange_id, %symbol, timeframe = %spec.label, "Fetching timeframe");
            let page = self.run(located, symbol, spec, now_ms).await;
            if let Some(e) = &page.failure {
                warn!(
                    timeframe = %spec.label,
                    kept = page.candles.len(),
                    error = %e,
                    "Timeframe truncated by fetch error"
                );
            }
            if page.candles.is_empty() {
                info!(timeframe = %spec.label, "No data for timeframe");
                continue;
            }
            series.insert(spec.label.clone(), reduce(&page.candles));
        }

        series
    }

    /// # Summary
    /// 单周期模式：只抓取一个周期，任何抓取错误都终止本次运行。
    ///
    /// # Returns
    /// 抓取失败返回 `FetchError::FetchFailure`；成功时序列可能为空。
    pub async fn fetch_one(
        &self,
        located: &Located,
        symbol: &str,
        spec: &TimeframeSpec,
    ) -> Result<Vec<SeriesPoint>, FetchError> {
        let now_ms = self.clock.now_ms();
        info!(exchange = %located.exchange_id, %symbol, timeframe = %spec.label, "Fetching timeframe");

        let page = self.run(located, symbol, spec, now_ms).await;
        match page.failure {
            Some(source) => Err(FetchError::FetchFailure {
                label: spec.label.clone(),
                source,
            }),
            None => Ok(reduce(&page.candles)),
        }
    }

    async fn run(
        &self,
        located: &Located,
        symbol: &str,
        spec: &TimeframeSpec,
        now_ms: i64,
    ) -> Pagination {
        paginate(
            located.connector.as_ref(),
            symbol,
            spec.interval,
            spec.start_time_ms(now_ms),
            now_ms,
            self.page_limit,
        )
        .await
    }
}
