use crate::binance::BinanceConnector;
use crate::bitget::BitgetConnector;
use crate::gate::GateConnector;
use crate::kucoin::KucoinConnector;
use crate::mexc::MexcConnector;
use crate::okx::OkxConnector;
use ohlc_core::config::HttpConfig;
use ohlc_core::market::error::MarketError;
use ohlc_core::market::port::{ExchangeConnector, ExchangeRegistry};
use std::sync::Arc;
use tracing::debug;

/// 已实现的交易所标识。
pub const SUPPORTED_EXCHANGES: [&str; 6] = ["binance", "kucoin", "bitget", "okx", "gate", "mexc"];

/// # Summary
/// 基于公共 REST 接口的交易所注册表。
///
/// # Invariants
/// - 每次 `connect` 都创建新的连接实例，交易对缓存不跨实例共享。
pub struct HttpExchangeRegistry {
    http: HttpConfig,
}

impl HttpExchangeRegistry {
    pub fn new(http: HttpConfig) -> Self {
        Self { http }
    }
}

impl ExchangeRegistry for HttpExchangeRegistry {
    fn connect(&self, exchange_id: &str) -> Result<Arc<dyn ExchangeConnector>, MarketError> {
        debug!(exchange = exchange_id, "Instantiating exchange connector");
        let connector: Arc<dyn ExchangeConnector> = match exchange_id {
            "binance" => Arc::new(BinanceConnector::new(&self.http)?),
            "kucoin" => Arc::new(KucoinConnector::new(&self.http)?),
            "bitget" => Arc::new(BitgetConnector::new(&self.http)?),
            "okx" => Arc::new(OkxConnector::new(&self.http)?),
            "gate" => Arc::new(GateConnector::new(&self.http)?),
            "mexc" => Arc::new(MexcConnector::new(&self.http)?),
            other => return Err(MarketError::UnsupportedExchange(other.to_string())),
        };
        Ok(connector)
    }
}
