use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct CoinbaseTicker {
    pub price: String,
    #[serde(default)]
    pub volume: Option<String>,
    #[serde(default)]
    pub high: Option<String>,
    #[serde(default)]
    pub low: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CoinbaseBook {
    pub bids: Vec<Vec<Value>>,
    pub asks: Vec<Vec<Value>>,
    #[serde(default)]
    pub time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CoinbaseAccount {
    pub currency: String,
    #[serde(default)]
    pub balance: Option<String>,
    pub available: String,
    pub hold: String,
}

#[derive(Debug, Deserialize)]
pub struct CoinbaseOrder {
    pub id: String,
    #[serde(default)]
    pub product_id: Option<String>,
    pub side: String,
    pub status: String,
    #[serde(default)]
    pub done_reason: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub funds: Option<String>,
    #[serde(default)]
    pub specified_funds: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub filled_size: Option<String>,
    #[serde(default)]
    pub executed_value: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// `/fills` entry; `liquidity` is `M` (maker) or `T` (taker)
#[derive(Debug, Deserialize)]
pub struct CoinbaseFill {
    pub trade_id: u64,
    pub product_id: String,
    pub order_id: String,
    pub price: String,
    pub size: String,
    pub fee: String,
    pub side: String,
    #[serde(default)]
    pub liquidity: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CoinbaseTime {
    pub epoch: f64,
}
