use clap::Parser;
use ohlc_core::config::{AppConfig, FetchProfile};
use std::path::PathBuf;

/// Fetch OHLC candles for a symbol and save a (timestamp, close) series as JSON.
#[derive(Parser, Debug, Clone)]
#[command(name = "ohlc-fetcher")]
#[command(about = "Fetch OHLC chart series from the first exchange that lists a symbol")]
pub struct Args {
    /// Unified trading pair, e.g. BTC/USDT
    pub symbol: String,

    /// Single timeframe label (1d, 1w, 1M, 1y, all); omit to fetch every timeframe
    pub timeframe: Option<String>,

    /// Output directory, overrides the configured one
    #[arg(long = "output_dir", value_name = "DIR")]
    pub output_dir: Option<String>,

    /// Optional TOML configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// 运行模式由位置参数个数决定。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Batch,
    Single { timeframe: String },
}

impl Args {
    pub fn mode(&self) -> Mode {
        match &self.timeframe {
            Some(timeframe) => Mode::Single {
                timeframe: timeframe.clone(),
            },
            None => Mode::Batch,
        }
    }

    /// 选出当前模式的配置，并叠加 `--output_dir`。
    pub fn profile(&self, config: AppConfig) -> FetchProfile {
        let mut profile = match self.mode() {
            Mode::Batch => config.batch,
            Mode::Single { .. } => config.single,
        };
        if let Some(dir) = &self.output_dir {
            profile.output_dir = dir.clone();
        }
        profile
    }
}

/// 取值型选项，非 `--flag=value` 写法时会吃掉下一个参数。
const VALUE_FLAGS: [&str; 2] = ["--output_dir", "--config"];

/// # Summary
/// 参数解析失败时，估算命令行里的位置参数个数。
///
/// # Logic
/// 1. 跳过程序名与 `-` 开头的选项，以及取值型选项后面的值。
/// 2. `--` 之后的参数一律按位置参数计。
pub fn positional_count(raw: &[String]) -> usize {
    let mut count = 0;
    let mut tokens = raw.iter().skip(1);
    while let Some(token) = tokens.next() {
        if token == "--" {
            return count + tokens.count();
        }
        if VALUE_FLAGS.contains(&token.as_str()) {
            tokens.next();
        } else if !token.starts_with('-') {
            count += 1;
        }
    }
    count
}

/// clap 错误的首行，去掉 `error: ` 前缀。
pub fn usage_message(e: &clap::Error) -> String {
    let rendered = e.to_string();
    let first = rendered.lines().next().unwrap_or_default().trim();
    first.strip_prefix("error: ").unwrap_or(first).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_positional_is_batch() {
        let args = Args::try_parse_from(["ohlc-fetcher", "BTC/USDT"]).unwrap();
        assert_eq!(args.mode(), Mode::Batch);
        let profile = args.profile(AppConfig::default());
        assert_eq!(profile.output_dir, "ohlc_data");
        assert_eq!(profile.exchanges.len(), 6);
    }

    #[test]
    fn test_two_positionals_is_single() {
        let args = Args::try_parse_from([
            "ohlc-fetcher",
            "ETH/USDT",
            "1w",
            "--output_dir",
            "/srv/charts",
        ])
        .unwrap();
        assert_eq!(
            args.mode(),
            Mode::Single {
                timeframe: "1w".to_string()
            }
        );
        let profile = args.profile(AppConfig::default());
        assert_eq!(profile.output_dir, "/srv/charts");
        assert_eq!(profile.exchanges, ["kucoin", "bitget", "mexc"]);
    }

    #[test]
    fn test_argument_count_is_checked() {
        assert!(Args::try_parse_from(["ohlc-fetcher"]).is_err());
        assert!(Args::try_parse_from(["ohlc-fetcher", "A/B", "1d", "extra"]).is_err());
    }

    fn raw(args: &[&str]) -> Vec<String> {
        args.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn test_positional_count_skips_option_values() {
        assert_eq!(positional_count(&raw(&["ohlc-fetcher"])), 0);
        assert_eq!(
            positional_count(&raw(&["ohlc-fetcher", "--output_dir", "/tmp", "BTC/USDT"])),
            1
        );
        assert_eq!(
            positional_count(&raw(&["ohlc-fetcher", "BTC/USDT", "1d", "--output_dir"])),
            2
        );
        assert_eq!(
            positional_count(&raw(&["ohlc-fetcher", "--config=a.toml", "-v", "A/B", "1w"])),
            2
        );
        assert_eq!(positional_count(&raw(&["ohlc-fetcher", "A/B", "--", "-1d"])), 2);
    }

    #[test]
    fn test_usage_message_is_first_line() {
        let e = Args::try_parse_from(["ohlc-fetcher", "BTC/USDT", "1d", "--output_dir"]).unwrap_err();
        let message = usage_message(&e);
        assert!(!message.is_empty());
        assert!(!message.starts_with("error:"));
        assert!(!message.contains('\n'));
        assert!(message.contains("--output_dir"));
    }
}
