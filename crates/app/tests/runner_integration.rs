use ohlc_app::runner::{Fetcher, resolve_timeframe};
use ohlc_core::common::time::FakeClockProvider;
use ohlc_core::config::FetchProfile;
use ohlc_core::market::error::{FetchError, MarketError};
use ohlc_core::store::port::SeriesStore;
use ohlc_core::testing::{FakeExchange, FakeRegistry, candle_run};
use ohlc_store::JsonSeriesStore;
use std::sync::Arc;
use tempfile::tempdir;

const NOW: i64 = 1_700_000_000_000;
const MINUTE: i64 = 60_000;

fn fetcher(registry: FakeRegistry) -> Fetcher {
    Fetcher::new(
        Arc::new(registry),
        Arc::new(FakeClockProvider::from_millis(NOW)),
    )
}

#[tokio::test]
async fn test_batch_writes_all_timeframes() -> anyhow::Result<()> {
    let tmp_dir = tempdir()?;
    let store = JsonSeriesStore::new(tmp_dir.path().join("ohlc_data"))?;

    let kucoin = Arc::new(
        FakeExchange::new("kucoin", &["BTC/USDT"]).with_history(candle_run(NOW - 30 * MINUTE, MINUTE, 30)),
    );
    let registry = FakeRegistry::new()
        .register(Arc::new(FakeExchange::new("binance", &["ETH/USDT"])))
        .register(kucoin.clone());

    let path = fetcher(registry)
        .run_batch(&store, &FetchProfile::batch(), "BTC/USDT")
        .await?;

    assert!(path.ends_with("BTC_USDT_all.json"));
    assert!(path.is_absolute());
    let saved = store.load_all("BTC/USDT").await?;
    assert_eq!(
        saved.labels().collect::<Vec<_>>(),
        vec!["1h", "1d", "1w", "1M", "1y", "all"]
    );
    assert_eq!(saved.get("1h").map(<[_]>::len), Some(30));
    Ok(())
}

#[tokio::test]
async fn test_batch_without_any_data_is_empty_result() -> anyhow::Result<()> {
    let tmp_dir = tempdir()?;
    let store = JsonSeriesStore::new(tmp_dir.path())?;
    let registry = FakeRegistry::new().register(Arc::new(FakeExchange::new("okx", &["BTC/USDT"])));
    let mut profile = FetchProfile::batch();
    profile.exchanges = vec!["okx".to_string()];

    let err = fetcher(registry)
        .run_batch(&store, &profile, "BTC/USDT")
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "No data fetched for BTC/USDT");
    assert!(!store.all_path("BTC/USDT").exists());
    Ok(())
}

#[tokio::test]
async fn test_batch_soft_fails_single_timeframe() -> anyhow::Result<()> {
    let tmp_dir = tempdir()?;
    let store = JsonSeriesStore::new(tmp_dir.path())?;
    let exchange = Arc::new(FakeExchange::new("binance", &["BTC/USDT"]));
    // 1h 周期失败，其余周期读取空的历史
    exchange.push_error(MarketError::Network("reset by peer".to_string()));
    exchange.push_page(candle_run(NOW - 2 * MINUTE, MINUTE, 2));
    let registry = FakeRegistry::new().register(exchange);

    let path = fetcher(registry)
        .run_batch(&store, &FetchProfile::batch(), "BTC/USDT")
        .await?;

    let saved = store.load_all("BTC/USDT").await?;
    assert!(path.exists());
    assert!(saved.get("1h").is_none());
    assert_eq!(saved.get("1d").map(<[_]>::len), Some(2));
    Ok(())
}

#[tokio::test]
async fn test_single_writes_bare_array() -> anyhow::Result<()> {
    let tmp_dir = tempdir()?;
    let store = JsonSeriesStore::new(tmp_dir.path())?;
    let registry = FakeRegistry::new()
        .register(Arc::new(FakeExchange::failing("kucoin", "dns error")))
        .register(Arc::new(
            FakeExchange::new("bitget", &["SOL/USDT"]).with_history(candle_run(NOW - 5 * MINUTE, MINUTE, 5)),
        ));
    let profile = FetchProfile::single();
    let spec = resolve_timeframe(&profile, "1d")?;

    let path = fetcher(registry)
        .run_single(&store, &profile, "SOL/USDT", spec)
        .await?;

    assert!(path.ends_with("SOL_USDT_1d.json"));
    let raw = std::fs::read_to_string(&path)?;
    assert!(raw.starts_with("[["));
    assert_eq!(store.load_timeframe("SOL/USDT", "1d").await?.len(), 5);
    Ok(())
}

#[tokio::test]
async fn test_single_fetch_error_is_terminal() -> anyhow::Result<()> {
    let tmp_dir = tempdir()?;
    let store = JsonSeriesStore::new(tmp_dir.path())?;
    let mexc = Arc::new(FakeExchange::new("mexc", &["BTC/USDT"]));
    mexc.push_page(candle_run(NOW - 3 * MINUTE, MINUTE, 3));
    mexc.push_error(MarketError::Exchange("HTTP 429: too many requests".to_string()));
    let registry = FakeRegistry::new().register(mexc);
    let profile = FetchProfile::single();
    let spec = resolve_timeframe(&profile, "1w")?;

    let err = fetcher(registry)
        .run_single(&store, &profile, "BTC/USDT", spec)
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::FetchFailure { .. }));
    assert!(err.to_string().starts_with("Error fetching data for 1w: "));
    assert!(!store.timeframe_path("BTC/USDT", "1w").exists());
    Ok(())
}

#[tokio::test]
async fn test_single_unknown_symbol() -> anyhow::Result<()> {
    let tmp_dir = tempdir()?;
    let store = JsonSeriesStore::new(tmp_dir.path())?;
    let registry = FakeRegistry::new()
        .register(Arc::new(FakeExchange::new("kucoin", &["BTC/USDT"])))
        .register(Arc::new(FakeExchange::new("bitget", &["BTC/USDT"])))
        .register(Arc::new(FakeExchange::new("mexc", &["BTC/USDT"])));
    let profile = FetchProfile::single();
    let spec = resolve_timeframe(&profile, "all")?;

    let err = fetcher(registry)
        .run_single(&store, &profile, "NOPE/USDT", spec)
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::SymbolNotFound(_)));
    Ok(())
}
