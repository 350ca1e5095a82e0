use serde::Deserialize;
use serde_json::Value;

/// `{code, data, msg}` wrapper around every REST response
#[derive(Debug, Deserialize)]
pub struct KucoinEnvelope {
    pub code: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub msg: Option<String>,
}

/// `/api/v1/market/stats`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KucoinStats {
    pub symbol: Option<String>,
    pub time: Option<i64>,
    pub last: Option<String>,
    pub vol: Option<String>,
    pub change_price: Option<String>,
    pub change_rate: Option<String>,
    pub high: Option<String>,
    pub low: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct KucoinOrderBook {
    pub time: Option<i64>,
    #[serde(default)]
    pub bids: Vec<Vec<Value>>,
    #[serde(default)]
    pub asks: Vec<Vec<Value>>,
}

/// One entry per currency and account type (main, trade, margin)
#[derive(Debug, Deserialize)]
pub struct KucoinAccount {
    pub currency: String,
    #[serde(rename = "type")]
    pub account_type: Option<String>,
    pub available: String,
    pub holds: String,
}

/// Order placement only acknowledges the id
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KucoinOrderAck {
    pub order_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KucoinOrder {
    pub id: String,
    pub symbol: Option<String>,
    pub side: String,
    #[serde(default)]
    pub status: Option<String>,
    pub price: Option<String>,
    pub size: Option<String>,
    pub deal_size: Option<String>,
    pub deal_funds: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub cancel_exist: Option<bool>,
    pub created_at: Option<i64>,
}

/// Paginated `data` of the order and fill listings
#[derive(Debug, Deserialize)]
pub struct KucoinPage<T> {
    pub items: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KucoinCancelAll {
    #[serde(default)]
    pub cancelled_order_ids: Vec<String>,
}

/// `/api/v1/fills` entry; `liquidity` is `maker` or `taker`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KucoinFill {
    pub symbol: String,
    pub trade_id: String,
    pub order_id: String,
    pub side: String,
    pub liquidity: Option<String>,
    pub price: String,
    pub size: String,
    pub fee: String,
    pub fee_currency: Option<String>,
    pub created_at: i64,
}
