pub mod binance;
pub mod bitget;
pub mod gate;
pub mod kucoin;
pub mod mexc;
pub mod okx;
pub mod registry;
pub mod rest;
