use ohlc_core::market::error::FetchError;
use ohlc_core::store::error::StoreError;
use ohlc_store::to_spaced_string;
use serde::Serialize;
use std::path::Path;

/// 单周期模式在 stdout 上输出的唯一一行。
#[derive(Debug, Serialize)]
pub enum SingleReport {
    #[serde(rename = "file_path")]
    FilePath(String),
    #[serde(rename = "error")]
    Error(String),
}

impl SingleReport {
    pub fn from_result(result: &Result<impl AsRef<Path>, FetchError>) -> Self {
        match result {
            Ok(path) => Self::FilePath(path.as_ref().display().to_string()),
            Err(e) => Self::Error(e.to_string()),
        }
    }

    /// 形如 `{"file_path": "/tmp/output_data/BTC_USDT_1d.json"}`。
    pub fn to_line(&self) -> Result<String, StoreError> {
        to_spaced_string(self)
    }
}
