pub mod format;
pub mod json;

pub use format::{SpacedFormatter, to_spaced_string};
pub use json::JsonSeriesStore;
