use config::{Config, Environment, File};
use ohlc_core::config::{AppConfig, ConfigOverrides};
use ohlc_core::market::error::FetchError;
use std::path::Path;
use tracing::debug;

/// 环境变量前缀，例如 `OHLC__SINGLE__OUTPUT_DIR`。
pub const ENV_PREFIX: &str = "OHLC";

/// 进程环境变量来源，交易所列表以逗号分隔。
pub fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("batch.exchanges")
        .with_list_parse_key("single.exchanges")
}

/// # Summary
/// 加载应用配置。
///
/// # Logic
/// 1. 以内置默认值为底。
/// 2. 叠加 `--config` 指定的文件（指定了就必须存在）。
/// 3. 叠加环境变量。
///
/// # Returns
/// 任一来源格式错误时返回 `FetchError::Config`。
pub fn load(file: Option<&Path>, env: Environment) -> Result<AppConfig, FetchError> {
    let mut builder = Config::builder();
    if let Some(path) = file {
        debug!(path = %path.display(), "Loading configuration file");
        builder = builder.add_source(File::from(path).required(true));
    }

    let overrides: ConfigOverrides = builder
        .add_source(env)
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|e| FetchError::Config(e.to_string()))?;

    Ok(AppConfig::default().with_overrides(overrides))
}
