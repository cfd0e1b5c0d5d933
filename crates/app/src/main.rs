use clap::Parser;
use ohlc_app::cli::{Args, Mode, positional_count, usage_message};
use ohlc_app::report::SingleReport;
use ohlc_app::runner::{Fetcher, resolve_timeframe};
use ohlc_app::settings;
use ohlc_core::common::time::RealTimeProvider;
use ohlc_core::config::FetchProfile;
use ohlc_core::market::error::FetchError;
use ohlc_feed::registry::HttpExchangeRegistry;
use ohlc_store::JsonSeriesStore;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// # Summary
/// 程序入口，负责装配具体实现并按模式运行。
///
/// # Logic
/// 1. 解析参数，参数个数不对时以 1 退出；看起来是单周期调用时同样输出 JSON 错误行。
/// 2. 初始化日志（只写 stderr，stdout 留给结果）。
/// 3. 加载配置，选出当前模式的配置。
/// 4. 装配交易所注册表、时钟与抓取器，执行批量或单周期模式。
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let raw: Vec<OsString> = std::env::args_os().collect();
    let args = match Args::try_parse_from(&raw) {
        Ok(args) => args,
        Err(e) => {
            if e.print().is_err() {
                eprintln!("{e}");
            }
            if !e.use_stderr() {
                return ExitCode::SUCCESS;
            }
            let lossy: Vec<String> = raw.iter().map(|a| a.to_string_lossy().into_owned()).collect();
            if positional_count(&lossy) >= 2 {
                report_error(usage_message(&e));
            }
            return ExitCode::FAILURE;
        }
    };

    init_tracing(args.verbose);
    info!(symbol = %args.symbol, mode = ?args.mode(), "ohlc-fetcher starting");

    let config = match settings::load(args.config.as_deref(), settings::environment()) {
        Ok(config) => config,
        Err(e) => return fail(&args.mode(), &e),
    };
    let registry = Arc::new(HttpExchangeRegistry::new(config.http.clone()));
    let fetcher = Fetcher::new(registry, Arc::new(RealTimeProvider));
    let profile = args.profile(config);

    match args.mode() {
        Mode::Batch => run_batch(&fetcher, &profile, &args.symbol).await,
        Mode::Single { timeframe } => run_single(&fetcher, &profile, &args.symbol, &timeframe).await,
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_batch(fetcher: &Fetcher, profile: &FetchProfile, symbol: &str) -> ExitCode {
    let store = match JsonSeriesStore::new(&profile.output_dir) {
        Ok(store) => store,
        Err(e) => return fail(&Mode::Batch, &e.into()),
    };
    println!(
        "Data will be saved to directory: {}",
        store.base_path().display()
    );

    match fetcher.run_batch(&store, profile, symbol).await {
        Ok(path) => {
            println!("Path:{}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => fail(&Mode::Batch, &e),
    }
}

async fn run_single(
    fetcher: &Fetcher,
    profile: &FetchProfile,
    symbol: &str,
    label: &str,
) -> ExitCode {
    let result = single(fetcher, profile, symbol, label).await;
    if let Err(e) = &result {
        error!(error = %e, "Single timeframe fetch failed");
    }

    match SingleReport::from_result(&result).to_line() {
        Ok(line) => println!("{line}"),
        Err(e) => {
            error!(error = %e, "Failed to render result line");
            return ExitCode::FAILURE;
        }
    }

    if result.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn single(
    fetcher: &Fetcher,
    profile: &FetchProfile,
    symbol: &str,
    label: &str,
) -> Result<PathBuf, FetchError> {
    let spec = resolve_timeframe(profile, label)?;
    let store = JsonSeriesStore::new(&profile.output_dir)?;
    fetcher.run_single(&store, profile, symbol, spec).await
}

/// 记录终态错误；单周期模式额外在 stdout 输出 JSON 错误行。
fn fail(mode: &Mode, e: &FetchError) -> ExitCode {
    error!(error = %e, "Fetch aborted");
    if let Mode::Single { .. } = mode {
        report_error(e.to_string());
    }
    ExitCode::FAILURE
}

fn report_error(message: String) {
    match SingleReport::Error(message).to_line() {
        Ok(line) => println!("{line}"),
        Err(render) => error!(error = %render, "Failed to render result line"),
    }
}
