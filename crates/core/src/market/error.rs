use crate::common::Interval;
use crate::store::error::StoreError;
use thiserror::Error;

/// # Summary
/// 交易所访问错误，处理网络、解析及交易所拒绝等问题。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
#[derive(Error, Debug)]
pub enum MarketError {
    // 网络层错误，包含底层 HTTP 客户端错误信息
    #[error("Network error: {0}")]
    Network(String),
    // 响应体解析失败
    #[error("Parse error: {0}")]
    Parse(String),
    // 交易所返回业务错误码
    #[error("Exchange error: {0}")]
    Exchange(String),
    // 未知的交易所标识
    #[error("Unsupported exchange: {0}")]
    UnsupportedExchange(String),
    // 交易所不提供该采样周期
    #[error("Interval {interval} is not offered by {exchange}")]
    UnsupportedInterval { exchange: String, interval: Interval },
    // 交易所未上架该交易对
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),
}

/// # Summary
/// 抓取流程的终态错误。
///
/// # Invariants
/// - `SymbolNotFound`、`InvalidTimeframe`、`EmptyResult` 均为终态，不可重试。
/// - `FetchFailure` 在批量模式下只截断当前周期，在单周期模式下终止运行。
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Symbol {0} is not available on any of the checked exchanges")]
    SymbolNotFound(String),
    #[error("Error fetching data for {label}: {source}")]
    FetchFailure { label: String, source: MarketError },
    #[error("Invalid timeframe: {label}. Valid options are: {}", .valid.join(", "))]
    InvalidTimeframe { label: String, valid: Vec<String> },
    #[error("No data fetched for {0}")]
    EmptyResult(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Configuration error: {0}")]
    Config(String),
}
