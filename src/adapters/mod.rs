pub mod delta;
pub mod error;
pub mod market_data;
pub mod notifier;

use async_trait::async_trait;

use crate::adapters::delta::DeltaClient;
use crate::adapters::error::Result;
use crate::domain::{Instrument, OrderRequest, OrderResult};

/// Exchange operations the straddle engine needs.
#[async_trait]
pub trait Exchange: Send + Sync {
    async fn spot_price(&self, index_symbol: &str) -> Result<f64>;
    async fn options_chain(&self, underlying: &str, expiry_date: &str) -> Result<Vec<Instrument>>;
    async fn place_order(&self, order: &OrderRequest) -> Result<OrderResult>;
}

#[async_trait]
impl Exchange for DeltaClient {
    async fn spot_price(&self, index_symbol: &str) -> Result<f64> {
        self.get_spot_price(index_symbol).await
    }

    async fn options_chain(&self, underlying: &str, expiry_date: &str) -> Result<Vec<Instrument>> {
        self.get_options_chain(underlying, expiry_date).await
    }

    async fn place_order(&self, order: &OrderRequest) -> Result<OrderResult> {
        self.post_order(order).await
    }
}
