pub mod common;
pub mod config;
pub mod market;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
