use ohlc_core::market::error::FetchError;
use ohlc_core::market::port::{ExchangeConnector, ExchangeRegistry};
use std::sync::Arc;
use tracing::{error, info, warn};

/// 已确认上架目标交易对的交易所连接。
#[derive(Clone)]
pub struct Located {
    pub exchange_id: String,
    pub connector: Arc<dyn ExchangeConnector>,
}

impl std::fmt::Debug for Located {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Located")
            .field("exchange_id", &self.exchange_id)
            .finish_non_exhaustive()
    }
}

/// # Summary
/// 交易所定位器：在候选列表中找到第一个上架目标交易对的交易所。
///
/// # Invariants
/// - 按候选列表的声明顺序探测，不排序、不打乱。
/// - 单个候选的任何错误只记录日志并视为“未上架”，不会中断扫描。
pub struct ExchangeLocator {
    registry: Arc<dyn ExchangeRegistry>,
}

impl ExchangeLocator {
    pub fn new(registry: Arc<dyn ExchangeRegistry>) -> Self {
        Self { registry }
    }

    /// # Summary
    /// 定位交易对所在的交易所。
    ///
    /// # Logic
    /// 1. 依次实例化候选交易所连接并获取交易对列表。
    /// 2. 命中即返回，不再探测后续候选。
    /// 3. 实例化或列表请求失败时记录日志并继续。
    ///
    /// # Arguments
    /// * `symbol`: 统一格式交易对，例如 `BTC/USDT`。
    /// * `candidates`: 有序的交易所标识列表。
    ///
    /// # Returns
    /// 全部候选都未命中时返回 `FetchError::SymbolNotFound`。
    pub async fn locate(&self, symbol: &str, candidates: &[String]) -> Result<Located, FetchError> {
        for exchange_id in candidates {
            info!(exchange = %exchange_id, %symbol, "Checking exchange");

            let connector = match self.registry.connect(exchange_id) {
                Ok(connector) => connector,
                Err(e) => {
                    error!(exchange = %exchange_id, error = %e, "Failed to initialize exchange");
                    continue;
                }
            };

            match connector.list_markets().await {
                Ok(markets) if markets.contains(symbol) => {
                    info!(exchange = %exchange_id, %symbol, "Symbol found");
                    return Ok(Located {
                        exchange_id: exchange_id.clone(),
                        connector,
                    });
                }
                Ok(_) => {
                    info!(exchange = %exchange_id, %symbol, "Symbol not listed");
                }
                Err(e) => {
                    warn!(exchange = %exchange_id, error = %e, "Failed to load markets");
                }
            }
        }

        Err(FetchError::SymbolNotFound(symbol.to_string()))
    }
}
