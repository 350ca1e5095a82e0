pub mod binance;
pub mod coinbase;
pub mod kucoin;
