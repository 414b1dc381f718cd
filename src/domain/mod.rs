use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ContractType {
    #[serde(rename = "call_options")]
    Call,
    #[serde(rename = "put_options")]
    Put,
}

impl ContractType {
    /// Parses the exchange's `contract_type` field. Anything that is not an
    /// option contract yields `None`.
    pub fn from_exchange(raw: &str) -> Option<Self> {
        if raw.contains("call_options") {
            Some(ContractType::Call)
        } else if raw.contains("put_options") {
            Some(ContractType::Put)
        } else {
            None
        }
    }
}

impl std::fmt::Display for ContractType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContractType::Call => write!(f, "call"),
            ContractType::Put => write!(f, "put"),
        }
    }
}

/// A single option contract as reported by the tickers feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Instrument {
    pub symbol: String,
    pub strike_price: f64,
    pub contract_type: ContractType,
    pub product_id: u64,
    pub mark_price: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderKind {
    Market,
    /// Market order fired when the mark price crosses `stop_price`.
    StopLoss,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderRequest {
    pub product_id: u64,
    pub side: Side,
    pub size: u32,
    pub kind: OrderKind,
    pub stop_price: Option<String>,
    pub reduce_only: bool,
}

impl OrderRequest {
    pub fn market(product_id: u64, side: Side, size: u32) -> Self {
        Self {
            product_id,
            side,
            size,
            kind: OrderKind::Market,
            stop_price: None,
            reduce_only: false,
        }
    }

    pub fn stop_loss(product_id: u64, side: Side, size: u32, stop_price: String) -> Self {
        Self {
            product_id,
            side,
            size,
            kind: OrderKind::StopLoss,
            stop_price: Some(stop_price),
            reduce_only: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResult {
    pub success: bool,
    pub order_id: Option<String>,
    /// Exchange payload as received, kept for diagnostics.
    pub raw: serde_json::Value,
}

impl OrderResult {
    /// Order id of an accepted order.
    pub fn accepted_id(&self) -> Option<&str> {
        if self.success {
            self.order_id.as_deref()
        } else {
            None
        }
    }
}

/// One executed straddle. Written once, never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionRecord {
    pub session_id: String,
    pub call: Instrument,
    pub put: Instrument,
    pub call_order_id: String,
    pub put_order_id: String,
    pub call_stop_order_id: Option<String>,
    pub put_stop_order_id: Option<String>,
    pub premium_collected: f64,
    pub expiry_date: String,
    /// Set when a stop-loss leg is missing and the position needs a manual check.
    pub needs_reconciliation: bool,
    pub created_at: DateTime<Utc>,
}

impl PositionRecord {
    pub fn strike(&self) -> f64 {
        self.call.strike_price
    }

    pub fn fully_protected(&self) -> bool {
        self.call_stop_order_id.is_some() && self.put_stop_order_id.is_some()
    }
}
