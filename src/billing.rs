// ABOUTME: Billing collaborator consulted for per-message price and told about status changes
// ABOUTME: HTTP implementation over reqwest plus a fixed-price implementation for unbilled deployments

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("billing request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("billing service answered {0}")]
    Status(StatusCode),

    #[error("billing service refused the update: {0}")]
    Rejected(String),

    #[error("billing service did not answer within {0:?}")]
    Timeout(Duration),
}

/// Run one billing call, giving up after `timeout`
pub async fn within<T, F>(timeout: Duration, call: F) -> Result<T, BillingError>
where
    F: Future<Output = Result<T, BillingError>>,
{
    tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| BillingError::Timeout(timeout))?
}

/// Body of a status notification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub message_id: String,
    pub status: String,
    pub phone_number: String,
    pub message_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct BalanceAck {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub new_balance: Option<f64>,
}

/// External accounting service.
///
/// Called off the listener task; failures are logged and never change the
/// outcome of a send.
pub trait BillingGateway: Send + Sync + 'static {
    /// Price of one logical message
    fn price_per_message(&self) -> impl Future<Output = Result<f64, BillingError>> + Send;

    fn report_status(
        &self,
        report: StatusReport,
    ) -> impl Future<Output = Result<BalanceAck, BillingError>> + Send;
}

/// Fixed price, reports go nowhere
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBilling {
    pub price: f64,
}

impl NoopBilling {
    pub fn new(price: f64) -> Self {
        Self { price }
    }
}

impl BillingGateway for NoopBilling {
    async fn price_per_message(&self) -> Result<f64, BillingError> {
        Ok(self.price)
    }

    async fn report_status(&self, report: StatusReport) -> Result<BalanceAck, BillingError> {
        debug!(message_id = %report.message_id, status = %report.status, "billing disabled");
        Ok(BalanceAck::default())
    }
}

#[derive(Deserialize)]
struct PricingTier {
    #[serde(rename = "pricePerSMS")]
    price_per_sms: f64,
}

#[derive(Deserialize)]
struct BalanceResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    new_balance: Option<f64>,
}

/// Billing service reached over HTTP with an internal bearer key
#[derive(Debug, Clone)]
pub struct HttpBillingGateway {
    client: Client,
    base_url: String,
    internal_key: String,
}

impl HttpBillingGateway {
    pub fn new(
        base_url: &str,
        internal_key: &str,
        timeout: Duration,
    ) -> Result<Self, BillingError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            internal_key: internal_key.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl BillingGateway for HttpBillingGateway {
    async fn price_per_message(&self) -> Result<f64, BillingError> {
        let response = self
            .client
            .get(self.url("/api/user/pricing-tier"))
            .bearer_auth(&self.internal_key)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(BillingError::Status(response.status()));
        }
        let tier: PricingTier = response.json().await?;
        Ok(tier.price_per_sms)
    }

    async fn report_status(&self, report: StatusReport) -> Result<BalanceAck, BillingError> {
        let response = self
            .client
            .post(self.url("/api/update-balance"))
            .bearer_auth(&self.internal_key)
            .json(&report)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(BillingError::Status(response.status()));
        }

        let body: BalanceResponse = response.json().await?;
        if !body.success {
            return Err(BillingError::Rejected(
                body.message.unwrap_or_else(|| "no reason given".to_string()),
            ));
        }
        Ok(BalanceAck {
            message: body.message,
            new_balance: body.new_balance,
        })
    }
}
