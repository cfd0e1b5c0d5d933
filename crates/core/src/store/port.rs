use super::error::StoreError;
use crate::market::entity::{SeriesMap, SeriesPoint};
use async_trait::async_trait;
use std::path::PathBuf;

/// # Summary
/// 序列结果的持久化接口。
///
/// # Invariants
/// - 文件名由交易对推导，`/` 统一替换为 `_`。
/// - 同一路径重复写入时后写者覆盖。
/// - 返回的路径为绝对路径。
#[async_trait]
pub trait SeriesStore: Send + Sync {
    /// # Summary
    /// 写入全部周期的结果（`{symbol}_all.json`）。
    ///
    /// # Returns
    /// 成功返回写入文件的绝对路径。
    async fn save_all(&self, symbol: &str, series: &SeriesMap) -> Result<PathBuf, StoreError>;

    /// # Summary
    /// 写入单个周期的结果（`{symbol}_{label}.json`），内容为裸数组。
    async fn save_timeframe(
        &self,
        symbol: &str,
        label: &str,
        points: &[SeriesPoint],
    ) -> Result<PathBuf, StoreError>;

    /// 读取 `save_all` 写入的结果。
    async fn load_all(&self, symbol: &str) -> Result<SeriesMap, StoreError>;

    /// 读取 `save_timeframe` 写入的结果。
    async fn load_timeframe(&self, symbol: &str, label: &str)
    -> Result<Vec<SeriesPoint>, StoreError>;
}
