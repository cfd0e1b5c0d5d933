pub mod aggregator;
pub mod locator;

pub use aggregator::{CandleAggregator, Pagination, paginate, reduce};
pub use locator::{ExchangeLocator, Located};
