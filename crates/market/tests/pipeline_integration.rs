use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ohlc_core::common::time::{FakeClockProvider, TimeProvider};
use ohlc_core::common::{ALL_EPOCH_MS, ALL_LABEL, Interval, batch_timeframes, single_timeframes};
use ohlc_core::config::FetchProfile;
use ohlc_core::market::entity::Candle;
use ohlc_core::market::error::{FetchError, MarketError};
use ohlc_core::market::port::ExchangeConnector;
use ohlc_core::testing::{FakeExchange, FakeRegistry, candle_run};
use ohlc_market::{CandleAggregator, ExchangeLocator, Located, paginate};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

const NOW: i64 = 1_700_000_000_000;
const HOUR: i64 = 3_600_000;

fn candidates(profile: &FetchProfile) -> Vec<String> {
    profile.exchanges.clone()
}

#[tokio::test]
async fn test_symbol_missing_everywhere_only_lists() -> anyhow::Result<()> {
    let profile = FetchProfile::batch();
    let mut registry = FakeRegistry::new();
    let mut exchanges = Vec::new();
    for id in &profile.exchanges {
        let exchange = Arc::new(FakeExchange::new(id, &["BTC/USDT"]));
        exchanges.push(exchange.clone());
        registry = registry.register(exchange);
    }
    let locator = ExchangeLocator::new(Arc::new(registry));

    let err = locator
        .locate("NOPE/USDT", &candidates(&profile))
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Symbol NOPE/USDT is not available on any of the checked exchanges"
    );
    for exchange in &exchanges {
        assert_eq!(exchange.listing_calls(), 1);
        assert!(exchange.fetch_calls().is_empty());
    }
    Ok(())
}

#[tokio::test]
async fn test_symbol_on_third_candidate() -> anyhow::Result<()> {
    let profile = FetchProfile::single();
    let kucoin = Arc::new(FakeExchange::new("kucoin", &["BTC/USDT"]));
    let bitget = Arc::new(FakeExchange::failing("bitget", "503 Service Unavailable"));
    let mexc = Arc::new(FakeExchange::new("mexc", &["WIF/USDT"]));
    let registry = Arc::new(
        FakeRegistry::new()
            .register(kucoin.clone())
            .register(bitget.clone())
            .register(mexc.clone()),
    );

    let located = ExchangeLocator::new(registry.clone())
        .locate("WIF/USDT", &candidates(&profile))
        .await?;

    assert_eq!(located.exchange_id, "mexc");
    assert_eq!(located.connector.id(), "mexc");
    assert_eq!(registry.connects(), vec!["kucoin", "bitget", "mexc"]);
    assert_eq!(kucoin.listing_calls(), 1);
    assert_eq!(bitget.listing_calls(), 1);
    assert_eq!(mexc.listing_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_batch_fetch_keeps_declaration_order_and_skips_empty() -> anyhow::Result<()> {
    // 只有最近一小时有数据：1h、1d、1w 等窗口都能覆盖到
    let history = candle_run(NOW - HOUR, 60_000, 60);
    let exchange = Arc::new(FakeExchange::new("binance", &["BTC/USDT"]).with_history(history));
    let registry = Arc::new(FakeRegistry::new().register(exchange.clone()));
    let located = ExchangeLocator::new(registry)
        .locate("BTC/USDT", &["binance".to_string()])
        .await?;

    let clock = Arc::new(FakeClockProvider::from_millis(NOW));
    let aggregator = CandleAggregator::new(clock, 1500);
    let series = aggregator
        .fetch_all(&located, "BTC/USDT", &batch_timeframes())
        .await;

    let labels: Vec<&str> = series.labels().collect();
    assert_eq!(labels, vec!["1h", "1d", "1w", "1M", "1y", "all"]);
    let hour = series.get("1h").unwrap_or_default();
    assert_eq!(hour.len(), 60);
    assert!(hour.windows(2).all(|w| w[0].timestamp_ms < w[1].timestamp_ms));

    // 每个周期的首个请求都从各自窗口起点开始
    let firsts: Vec<(Interval, i64)> = exchange
        .fetch_calls()
        .iter()
        .map(|c| (c.interval, c.since_ms))
        .collect();
    assert!(firsts.contains(&(Interval::Minute1, NOW - HOUR)));
    assert!(firsts.contains(&(Interval::Minute15, NOW - 24 * HOUR)));
    assert!(firsts.contains(&(Interval::Week1, ALL_EPOCH_MS)));
    Ok(())
}

#[tokio::test]
async fn test_batch_fetch_omits_timeframes_without_candles() -> anyhow::Result<()> {
    let exchange = Arc::new(FakeExchange::new("okx", &["BTC/USDT"]));
    let registry = Arc::new(FakeRegistry::new().register(exchange));
    let located = ExchangeLocator::new(registry)
        .locate("BTC/USDT", &["okx".to_string()])
        .await?;

    let aggregator = CandleAggregator::new(Arc::new(FakeClockProvider::from_millis(NOW)), 100);
    let series = aggregator
        .fetch_all(&located, "BTC/USDT", &batch_timeframes())
        .await;

    assert!(series.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_single_fetch_escalates_failure() -> anyhow::Result<()> {
    let exchange = Arc::new(FakeExchange::new("mexc", &["BTC/USDT"]));
    exchange.push_page(candle_run(NOW - 10 * HOUR, HOUR, 3));
    exchange.push_error(MarketError::UnsupportedInterval {
        exchange: "mexc".to_string(),
        interval: Interval::Hour6,
    });
    let registry = Arc::new(FakeRegistry::new().register(exchange));
    let located = ExchangeLocator::new(registry)
        .locate("BTC/USDT", &["mexc".to_string()])
        .await?;

    let profile = FetchProfile::single();
    let spec = profile
        .timeframe("1M")
        .ok_or_else(|| anyhow::anyhow!("1M missing"))?;
    let aggregator = CandleAggregator::new(Arc::new(FakeClockProvider::from_millis(NOW)), 1500);
    let err = aggregator
        .fetch_one(&located, "BTC/USDT", spec)
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::FetchFailure { ref label, .. } if label == "1M"));
    assert_eq!(
        err.to_string(),
        "Error fetching data for 1M: Interval 6h is not offered by mexc"
    );
    Ok(())
}

#[tokio::test]
async fn test_all_label_ignores_clock() -> anyhow::Result<()> {
    let all = single_timeframes()
        .into_iter()
        .find(|t| t.label == "all")
        .ok_or_else(|| anyhow::anyhow!("all missing"))?;

    for now in [NOW, NOW + 365 * 24 * HOUR] {
        let exchange = Arc::new(FakeExchange::new("kucoin", &["BTC/USDT"]));
        let located = Located {
            exchange_id: "kucoin".to_string(),
            connector: exchange.clone(),
        };
        let aggregator = CandleAggregator::new(Arc::new(FakeClockProvider::from_millis(now)), 1500);
        let points = aggregator.fetch_one(&located, "BTC/USDT", &all).await?;

        assert!(points.is_empty());
        assert_eq!(exchange.fetch_calls()[0].since_ms, ALL_EPOCH_MS);
    }
    Ok(())
}

/// 每页只返回一根 K 线，时间随请求的起点推进，用于验证游标单调性。
struct SteppingExchange {
    step: i64,
    seen: std::sync::Mutex<Vec<i64>>,
}

#[async_trait]
impl ExchangeConnector for SteppingExchange {
    fn id(&self) -> &str {
        "stepping"
    }

    async fn list_markets(&self) -> Result<HashSet<String>, MarketError> {
        Ok(HashSet::new())
    }

    async fn fetch_candles(
        &self,
        _: &str,
        _: Interval,
        since_ms: i64,
        _: usize,
    ) -> Result<Vec<Candle>, MarketError> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(since_ms);
        }
        Ok(vec![Candle::new(
            since_ms + self.step,
            1.0,
            1.0,
            1.0,
            1.0,
            1.0,
        )])
    }
}

#[tokio::test]
async fn test_cursor_strictly_increases() -> anyhow::Result<()> {
    let exchange = SteppingExchange {
        step: 7,
        seen: std::sync::Mutex::new(Vec::new()),
    };

    let result = paginate(&exchange, "X/Y", Interval::Minute1, 0, 100, 10).await;

    let seen = exchange
        .seen
        .lock()
        .map_err(|_| anyhow::anyhow!("poisoned"))?
        .clone();
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
    assert!(seen.iter().all(|&since| since < 100));
    assert_eq!(result.candles.len(), seen.len());
    Ok(())
}

/// 每次读取都前进一小时的时钟，并记录读取次数。
struct TickingClock {
    next_ms: AtomicI64,
    reads: AtomicUsize,
}

impl TimeProvider for TickingClock {
    fn now(&self) -> DateTime<Utc> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let ms = self.next_ms.fetch_add(HOUR, Ordering::SeqCst);
        DateTime::from_timestamp_millis(ms).unwrap_or_default()
    }
}

#[tokio::test]
async fn test_clock_is_sampled_once_for_all_timeframes() -> anyhow::Result<()> {
    let exchange = Arc::new(FakeExchange::new("binance", &["BTC/USDT"]));
    let located = Located {
        exchange_id: "binance".to_string(),
        connector: exchange.clone(),
    };
    let clock = Arc::new(TickingClock {
        next_ms: AtomicI64::new(NOW),
        reads: AtomicUsize::new(0),
    });
    let timeframes = batch_timeframes();

    let series = CandleAggregator::new(clock.clone(), 1500)
        .fetch_all(&located, "BTC/USDT", &timeframes)
        .await;

    assert!(series.is_empty());
    assert_eq!(clock.reads.load(Ordering::SeqCst), 1);

    // 历史为空，每个周期恰好请求一次
    let calls = exchange.fetch_calls();
    assert_eq!(calls.len(), timeframes.len());
    for (call, spec) in calls.iter().zip(&timeframes) {
        assert_eq!(call.interval, spec.interval);
        let expected = if spec.label == ALL_LABEL {
            ALL_EPOCH_MS
        } else {
            NOW - spec.window_ms
        };
        assert_eq!(call.since_ms, expected, "timeframe {}", spec.label);
    }
    Ok(())
}
