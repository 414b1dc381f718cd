use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::adapters::error::ExchangeError;
use crate::adapters::market_data::today_expiry_date;
use crate::adapters::notifier::Notifier;
use crate::adapters::Exchange;
use crate::config::StrategyConfig;
use crate::domain::{ContractType, Instrument, OrderRequest, PositionRecord, Side};
use crate::engine::ledger::{position_key, PositionLedger};
use crate::engine::report::{self, format_usd, join_legs};
use crate::strategy::atm::select_atm;
use crate::strategy::{format_price, stop_trigger_price};

/// Why an execution stopped without opening a straddle.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Decline {
    NoOptions { expiry_date: String },
    AtmNotFound { missing: Vec<ContractType> },
    /// The exchange did not accept a sell. `open_order_id` is a call sell that
    /// had already gone through.
    SellRejected {
        leg: ContractType,
        open_order_id: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StraddleOutcome {
    Executed { key: String, record: PositionRecord },
    Declined(Decline),
    Failed {
        error: String,
        open_order_id: Option<String>,
    },
}

impl StraddleOutcome {
    /// Report shown to the user once the execution is over.
    pub fn summary(&self) -> String {
        match self {
            StraddleOutcome::Executed { record, .. } => report::executed_summary(record),
            StraddleOutcome::Declined(Decline::NoOptions { expiry_date }) => {
                format!("❌ No options found for today's expiry ({})", expiry_date)
            }
            StraddleOutcome::Declined(Decline::AtmNotFound { .. }) => {
                "❌ Could not find ATM call and put options".to_string()
            }
            StraddleOutcome::Declined(Decline::SellRejected { leg, open_order_id }) => {
                let text = format!("❌ Failed to execute short straddle orders ({} sell rejected)", leg);
                with_open_leg(text, open_order_id.as_deref())
            }
            StraddleOutcome::Failed { error, open_order_id } => {
                let text = format!("❌ Error executing short straddle: {}", error);
                with_open_leg(text, open_order_id.as_deref())
            }
        }
    }

    pub fn is_executed(&self) -> bool {
        matches!(self, StraddleOutcome::Executed { .. })
    }
}

fn with_open_leg(text: String, open_order_id: Option<&str>) -> String {
    match open_order_id {
        Some(id) => format!("{}\n{}", text, report::open_leg_warning(id)),
        None => text,
    }
}

/// Fatal error raised mid-sequence, carrying any call sell already filled.
struct Abort {
    error: ExchangeError,
    open_order_id: Option<String>,
}

impl From<ExchangeError> for Abort {
    fn from(error: ExchangeError) -> Self {
        Self {
            error,
            open_order_id: None,
        }
    }
}

/// Runs the short straddle: sell the ATM call and put on today's expiry and
/// protect each leg with a reduce-only stop.
pub struct StraddleExecutor {
    exchange: Arc<dyn Exchange>,
    notifier: Arc<dyn Notifier>,
    ledger: PositionLedger,
    config: StrategyConfig,
}

impl StraddleExecutor {
    pub fn new(
        exchange: Arc<dyn Exchange>,
        notifier: Arc<dyn Notifier>,
        ledger: PositionLedger,
        config: StrategyConfig,
    ) -> Self {
        Self {
            exchange,
            notifier,
            ledger,
            config,
        }
    }

    #[cfg(test)]
    pub fn ledger(&self) -> &PositionLedger {
        &self.ledger
    }

    pub async fn execute(&self, session_id: &str) -> StraddleOutcome {
        self.execute_on(session_id, &today_expiry_date()).await
    }

    /// Same as `execute` with an explicit `DD-MM-YYYY` expiry.
    pub async fn execute_on(&self, session_id: &str, expiry_date: &str) -> StraddleOutcome {
        info!(session_id, expiry_date, "Executing short straddle");

        let outcome = match self.run(session_id, expiry_date).await {
            Ok(outcome) => outcome,
            Err(abort) => {
                error!(
                    session_id,
                    transport = abort.error.is_transport(),
                    open_order_id = ?abort.open_order_id,
                    "Error executing short straddle: {}",
                    abort.error
                );
                StraddleOutcome::Failed {
                    error: abort.error.to_string(),
                    open_order_id: abort.open_order_id,
                }
            }
        };

        match &outcome {
            StraddleOutcome::Executed { key, record } => info!(
                session_id,
                key = %key,
                premium = record.premium_collected,
                protected = record.fully_protected(),
                "Short straddle executed"
            ),
            StraddleOutcome::Declined(decline) => {
                warn!(session_id, ?decline, "Short straddle declined")
            }
            StraddleOutcome::Failed { .. } => {}
        }

        self.notify(session_id, &outcome.summary()).await;
        outcome
    }

    async fn run(&self, session_id: &str, expiry_date: &str) -> Result<StraddleOutcome, Abort> {
        let spot = self.exchange.spot_price(&self.config.spot_index_symbol).await?;
        self.notify(
            session_id,
            &format!("📊 Current BTC Spot Price: {}", format_usd(spot, 2)),
        )
        .await;

        let chain = self
            .exchange
            .options_chain(&self.config.underlying, expiry_date)
            .await?;
        if chain.is_empty() {
            return Ok(StraddleOutcome::Declined(Decline::NoOptions {
                expiry_date: expiry_date.to_string(),
            }));
        }
        self.notify(
            session_id,
            &format!("🔗 {} options listed for {}", chain.len(), expiry_date),
        )
        .await;

        let selection = select_atm(spot, &chain);
        let missing = selection.missing();
        let Some((call, put)) = selection.legs() else {
            warn!(session_id, spot, "No ATM pair, missing: {}", join_legs(&missing));
            return Ok(StraddleOutcome::Declined(Decline::AtmNotFound { missing }));
        };
        self.notify(
            session_id,
            &format!(
                "🎯 ATM Strike Selected: {}\n📞 Call Option: {}\n📞 Put Option: {}",
                format_usd(call.strike_price, 0),
                call.symbol,
                put.symbol
            ),
        )
        .await;

        self.notify(session_id, "🔄 Executing Short Straddle...").await;
        let size = self.config.order_size;

        let call_sell = self
            .exchange
            .place_order(&OrderRequest::market(call.product_id, Side::Sell, size))
            .await?;
        let Some(call_order_id) = call_sell.accepted_id().map(String::from) else {
            warn!(session_id, raw = %call_sell.raw, "Call sell rejected");
            return Ok(StraddleOutcome::Declined(Decline::SellRejected {
                leg: ContractType::Call,
                open_order_id: None,
            }));
        };

        let put_sell = self
            .exchange
            .place_order(&OrderRequest::market(put.product_id, Side::Sell, size))
            .await
            .map_err(|error| Abort {
                error,
                open_order_id: Some(call_order_id.clone()),
            })?;
        let Some(put_order_id) = put_sell.accepted_id().map(String::from) else {
            error!(
                session_id,
                call_order_id = %call_order_id,
                raw = %put_sell.raw,
                "Put sell rejected after call sell filled"
            );
            return Ok(StraddleOutcome::Declined(Decline::SellRejected {
                leg: ContractType::Put,
                open_order_id: Some(call_order_id),
            }));
        };
        self.notify(
            session_id,
            &format!("✅ Sold call (order {}) and put (order {})", call_order_id, put_order_id),
        )
        .await;

        let multiplier = self.config.stop_loss_multiplier;
        let call_stop_price = format_price(stop_trigger_price(call.mark_price, multiplier));
        let put_stop_price = format_price(stop_trigger_price(put.mark_price, multiplier));
        self.notify(
            session_id,
            &format!(
                "🛡️ Placing Stop Loss Orders...\n📞 Call stop: {}\n📞 Put stop: {}",
                call_stop_price, put_stop_price
            ),
        )
        .await;

        // Stop failures leave the sells in place; the record flags the gap.
        let call_stop_order_id = self.place_stop(session_id, &call, call_stop_price).await;
        let put_stop_order_id = self.place_stop(session_id, &put, put_stop_price).await;

        let mut unprotected = Vec::new();
        if call_stop_order_id.is_none() {
            unprotected.push(ContractType::Call);
        }
        if put_stop_order_id.is_none() {
            unprotected.push(ContractType::Put);
        }
        if unprotected.is_empty() {
            self.notify(session_id, "🛡️ Stop loss orders placed on both legs").await;
        } else {
            error!(
                session_id,
                call_order_id = %call_order_id,
                put_order_id = %put_order_id,
                "Stop loss missing for {}, position needs reconciliation",
                join_legs(&unprotected)
            );
            self.notify(
                session_id,
                &format!("⚠️ Stop loss could not be placed for: {}", join_legs(&unprotected)),
            )
            .await;
        }

        let created_at = Utc::now();
        let record = PositionRecord {
            session_id: session_id.to_string(),
            premium_collected: (call.mark_price + put.mark_price) * f64::from(size),
            call,
            put,
            call_order_id,
            put_order_id,
            call_stop_order_id,
            put_stop_order_id,
            expiry_date: expiry_date.to_string(),
            needs_reconciliation: !unprotected.is_empty(),
            created_at,
        };
        let key = self
            .ledger
            .record(position_key(session_id, created_at), record.clone())
            .await;
        self.notify(session_id, &format!("📒 Position recorded as {}", key)).await;

        Ok(StraddleOutcome::Executed { key, record })
    }

    /// Reduce-only stop buy for one short leg. Returns the order id, or `None`
    /// if the exchange did not take it.
    async fn place_stop(&self, session_id: &str, leg: &Instrument, stop_price: String) -> Option<String> {
        let order = OrderRequest::stop_loss(leg.product_id, Side::Buy, self.config.order_size, stop_price);
        match self.exchange.place_order(&order).await {
            Ok(result) => match result.accepted_id() {
                Some(id) => Some(id.to_string()),
                None => {
                    error!(session_id, symbol = %leg.symbol, raw = %result.raw, "Stop loss rejected");
                    None
                }
            },
            Err(e) => {
                error!(session_id, symbol = %leg.symbol, "Stop loss placement failed: {}", e);
                None
            }
        }
    }

    async fn notify(&self, session_id: &str, text: &str) {
        if let Err(e) = self.notifier.send(session_id, text).await {
            warn!(session_id, "Failed to deliver status update: {:?}", e);
        }
    }
}
