use chrono::{DateTime, Local};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::adapters::delta::{de_opt_f64, ApiResponse, DeltaClient};
use crate::adapters::error::{ExchangeError, Result};
use crate::domain::{ContractType, Instrument};

#[derive(Debug, Deserialize)]
struct IndexEntry {
    symbol: String,
}

#[derive(Debug, Deserialize)]
struct SpotTicker {
    #[serde(default, deserialize_with = "de_opt_f64")]
    mark_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OptionTicker {
    symbol: String,
    #[serde(default, deserialize_with = "de_opt_f64")]
    strike_price: Option<f64>,
    #[serde(default)]
    contract_type: String,
    product_id: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    mark_price: Option<f64>,
}

impl OptionTicker {
    fn into_instrument(self) -> Option<Instrument> {
        Some(Instrument {
            contract_type: ContractType::from_exchange(&self.contract_type)?,
            strike_price: self.strike_price?,
            product_id: self.product_id?,
            mark_price: self.mark_price?,
            symbol: self.symbol,
        })
    }
}

/// Expiry date in the `DD-MM-YYYY` form the tickers endpoint filters on.
/// Uses the local calendar date, not the UTC one.
pub fn expiry_date_for(now: DateTime<Local>) -> String {
    now.format("%d-%m-%Y").to_string()
}

pub fn today_expiry_date() -> String {
    expiry_date_for(Local::now())
}

impl DeltaClient {
    /// Mark price of the spot index, looked up through the index listing.
    pub async fn get_spot_price(&self, index_symbol: &str) -> Result<f64> {
        let indices: ApiResponse<Vec<IndexEntry>> = self.get("/v2/indices", &[], "indices").await?;
        if !indices.success {
            return Err(ExchangeError::PriceUnavailable(
                "index listing reported failure".to_string(),
            ));
        }

        let listed = indices
            .result
            .unwrap_or_default()
            .iter()
            .any(|index| index.symbol == index_symbol);
        if !listed {
            return Err(ExchangeError::PriceUnavailable(format!(
                "{} not found in index listing",
                index_symbol
            )));
        }

        let path = format!("/v2/tickers/{}", index_symbol);
        let ticker: ApiResponse<SpotTicker> = self.get(&path, &[], "ticker").await?;
        match (ticker.success, ticker.result.and_then(|t| t.mark_price)) {
            (true, Some(price)) => {
                debug!(index_symbol, price, "Spot price resolved");
                Ok(price)
            }
            _ => Err(ExchangeError::PriceUnavailable(format!(
                "ticker for {} has no mark price",
                index_symbol
            ))),
        }
    }

    /// Calls and puts on `underlying` expiring on `expiry_date`. A chain the
    /// exchange reports as unsuccessful or empty comes back as an empty vector.
    pub async fn get_options_chain(&self, underlying: &str, expiry_date: &str) -> Result<Vec<Instrument>> {
        let params = [
            ("contract_types", "call_options,put_options"),
            ("underlying_asset_symbols", underlying),
            ("expiry_date", expiry_date),
        ];
        let resp: ApiResponse<Vec<OptionTicker>> = self.get("/v2/tickers", &params, "tickers").await?;
        if !resp.success {
            warn!(underlying, expiry_date, "Tickers query reported failure, treating chain as empty");
            return Ok(Vec::new());
        }

        let raw = resp.result.unwrap_or_default();
        let total = raw.len();
        let chain: Vec<Instrument> = raw
            .into_iter()
            .filter_map(|ticker| {
                let symbol = ticker.symbol.clone();
                let instrument = ticker.into_instrument();
                if instrument.is_none() {
                    debug!(symbol = %symbol, "Skipping ticker without strike, product id or mark price");
                }
                instrument
            })
            .collect();

        if chain.len() < total {
            warn!("Dropped {} of {} tickers with incomplete data", total - chain.len(), total);
        }
        info!(underlying, expiry_date, "Options chain has {} instruments", chain.len());
        Ok(chain)
    }
}
