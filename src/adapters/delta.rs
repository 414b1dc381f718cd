use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, Method};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use tracing::{debug, error};

use crate::adapters::error::{ExchangeError, Result};
use crate::config::ExchangeConfig;
use crate::domain::{OrderKind, OrderRequest, OrderResult, Side};

const USER_AGENT: &str = "straddle-bot-client";

type HmacSha256 = Hmac<Sha256>;

/// Authenticated REST client for Delta Exchange.
#[derive(Clone)]
pub struct DeltaClient {
    client: Client,
    config: Arc<ExchangeConfig>,
}

/// Hex-encoded HMAC-SHA256 of `message` under `secret`.
pub fn sign_message(secret: &str, message: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ExchangeError::Signing(e.to_string()))?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Query string exactly as it is both signed and sent: empty when there are no
/// params, otherwise `?` followed by the urlencoded pairs in the given order.
pub fn canonical_query(params: &[(&str, &str)]) -> String {
    if params.is_empty() {
        return String::new();
    }
    let encoded = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter())
        .finish();
    format!("?{}", encoded)
}

pub fn signing_payload(method: &str, timestamp: &str, path: &str, query: &str, body: &str) -> String {
    format!("{}{}{}{}{}", method, timestamp, path, query, body)
}

impl DeltaClient {
    pub fn new(config: ExchangeConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(5)
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    pub fn sign(&self, message: &str) -> Result<String> {
        sign_message(self.config.api_secret.expose_secret(), message)
    }

    /// Sends one signed request and returns the decoded JSON body. Never retries.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        body: Option<String>,
    ) -> Result<serde_json::Value> {
        let timestamp = Utc::now().timestamp().to_string();
        let query = canonical_query(params);
        let body = body.unwrap_or_default();

        let payload = signing_payload(method.as_str(), &timestamp, path, &query, &body);
        let signature = self.sign(&payload)?;

        let url = format!("{}{}{}", self.config.base_url.trim_end_matches('/'), path, query);
        debug!(%method, path, query = %query, "Delta request");

        let mut builder = self
            .client
            .request(method.clone(), &url)
            .header("api-key", self.config.api_key.expose_secret())
            .header("timestamp", &timestamp)
            .header("signature", &signature)
            .header("User-Agent", USER_AGENT)
            .header("Content-Type", "application/json");
        if !body.is_empty() {
            builder = builder.body(body);
        }

        let resp = builder.send().await.map_err(|e| {
            error!(%method, path, "Delta request failed: {}", e);
            ExchangeError::Transport(e)
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!(%method, path, status = status.as_u16(), "Delta request rejected: {}", body);
            return Err(ExchangeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ExchangeError::parse("json", e))
    }

    /// Signed GET decoded into the endpoint's response type.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
        context: &'static str,
    ) -> Result<T> {
        let value = self.send(Method::GET, path, params, None).await?;
        serde_json::from_value(value).map_err(|e| ExchangeError::parse(context, e))
    }

    pub async fn post_order(&self, order: &OrderRequest) -> Result<OrderResult> {
        let body = serde_json::to_string(&OrderBody::from(order))
            .map_err(|e| ExchangeError::parse("order request", e))?;
        let raw = self.send(Method::POST, "/v2/orders", &[], Some(body)).await?;

        let resp: OrderResponse = serde_json::from_value(raw.clone())
            .map_err(|e| ExchangeError::parse("order", e))?;
        let order_id = if resp.success {
            resp.result.and_then(|r| r.id).and_then(order_id_to_string)
        } else {
            None
        };

        Ok(OrderResult {
            success: resp.success && order_id.is_some(),
            order_id,
            raw,
        })
    }
}

// --- Wire types ---

#[derive(Debug, Serialize)]
struct OrderBody<'a> {
    product_id: u64,
    size: u32,
    side: Side,
    order_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_order_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_price: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reduce_only: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_trigger_method: Option<&'static str>,
}

impl<'a> From<&'a OrderRequest> for OrderBody<'a> {
    fn from(order: &'a OrderRequest) -> Self {
        let is_stop = order.kind == OrderKind::StopLoss;
        Self {
            product_id: order.product_id,
            size: order.size,
            side: order.side,
            order_type: "market_order",
            stop_order_type: is_stop.then_some("stop_loss_order"),
            stop_price: order.stop_price.as_deref().filter(|_| is_stop),
            reduce_only: order.reduce_only.then_some("true"),
            stop_trigger_method: is_stop.then_some("mark_price"),
        }
    }
}

/// Envelope shared by every Delta REST response.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse<T> {
    #[serde(default)]
    pub success: bool,
    pub result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    #[serde(default)]
    success: bool,
    result: Option<PlacedOrder>,
}

#[derive(Debug, Deserialize)]
struct PlacedOrder {
    id: Option<serde_json::Value>,
}

fn order_id_to_string(id: serde_json::Value) -> Option<String> {
    match id {
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::String(s) if !s.is_empty() => Some(s),
        _ => None,
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Numeric {
    Number(f64),
    Text(String),
}

/// Delta reports prices as strings on some endpoints and numbers on others.
pub(crate) fn de_opt_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Numeric>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Numeric::Number(n)) => Ok(Some(n)),
        Some(Numeric::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Numeric::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
