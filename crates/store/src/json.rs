use crate::format::to_spaced_string;
use async_trait::async_trait;
use ohlc_core::market::entity::{SeriesMap, SeriesPoint};
use ohlc_core::store::error::StoreError;
use ohlc_core::store::port::SeriesStore;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// SeriesStore 的 JSON 文件实现。
///
/// # Summary
/// 每次运行的结果写入输出目录下的单个 JSON 文件。
///
/// # Invariants
/// * 输出目录在构造时创建（幂等），并解析为绝对路径。
/// * 文件名中的 `/` 替换为 `_`，例如 `BTC/USDT` → `BTC_USDT_all.json`。
pub struct JsonSeriesStore {
    base_path: PathBuf,
}

impl JsonSeriesStore {
    /// 创建指向 `output_dir` 的存储实例。
    ///
    /// # Logic
    /// 1. 确保目录存在。
    /// 2. 将目录解析为绝对路径，之后返回的文件路径都基于它。
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = output_dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;
        let base_path = std::fs::canonicalize(dir).map_err(|e| io_error(dir, e))?;
        debug!(path = %base_path.display(), "Output directory ready");
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// `BTC/USDT` → `BTC_USDT`。
    pub fn file_stem(symbol: &str) -> String {
        symbol.replace('/', "_")
    }

    pub fn all_path(&self, symbol: &str) -> PathBuf {
        self.base_path
            .join(format!("{}_all.json", Self::file_stem(symbol)))
    }

    pub fn timeframe_path(&self, symbol: &str, label: &str) -> PathBuf {
        self.base_path
            .join(format!("{}_{}.json", Self::file_stem(symbol), label))
    }

    async fn write(&self, path: PathBuf, body: String) -> Result<PathBuf, StoreError> {
        info!(path = %path.display(), "Saving data to file");
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| io_error(&path, e))?;
        Ok(path)
    }

    async fn read<T: DeserializeOwned>(&self, path: &Path) -> Result<T, StoreError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| io_error(path, e))?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Deserialize(e.to_string()))
    }
}

fn io_error(path: &Path, e: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

#[async_trait]
impl SeriesStore for JsonSeriesStore {
    async fn save_all(&self, symbol: &str, series: &SeriesMap) -> Result<PathBuf, StoreError> {
        let body = to_spaced_string(series)?;
        self.write(self.all_path(symbol), body).await
    }

    async fn save_timeframe(
        &self,
        symbol: &str,
        label: &str,
        points: &[SeriesPoint],
    ) -> Result<PathBuf, StoreError> {
        let body = to_spaced_string(points)?;
        self.write(self.timeframe_path(symbol, label), body).await
    }

    async fn load_all(&self, symbol: &str) -> Result<SeriesMap, StoreError> {
        self.read(&self.all_path(symbol)).await
    }

    async fn load_timeframe(
        &self,
        symbol: &str,
        label: &str,
    ) -> Result<Vec<SeriesPoint>, StoreError> {
        self.read(&self.timeframe_path(symbol, label)).await
    }
}
