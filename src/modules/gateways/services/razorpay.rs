use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;

use super::gateway_trait::{PaymentGateway, WebhookEvent};
use crate::config::GatewayConfig;
use crate::core::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Razorpay payment gateway client
///
/// Orders API: https://razorpay.com/docs/api/orders/
/// Callback signature: HMAC-SHA256 over "{order_id}|{payment_id}" keyed
/// with the API key secret, hex-encoded.
pub struct RazorpayClient {
    client: Client,
    key_id: String,
    key_secret: String,
    base_url: String,
}

impl RazorpayClient {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn expected_signature_input(order_id: &str, payment_id: &str) -> String {
        format!("{}|{}", order_id, payment_id)
    }
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    async fn create_order(
        &self,
        amount_minor_units: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<String> {
        let url = format!("{}/v1/orders", self.base_url);

        let order_request = json!({
            "amount": amount_minor_units,
            "currency": currency,
            "receipt": receipt,
            "payment_capture": 1,
            "notes": {
                "invoice_id": receipt,
            }
        });

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .header("Content-Type", "application/json")
            .json(&order_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    AppError::gateway(format!(
                        "Razorpay gateway unavailable: {} ({})",
                        if e.is_timeout() {
                            "timeout"
                        } else {
                            "connection failed"
                        },
                        e
                    ))
                } else {
                    AppError::gateway(format!("Razorpay API request failed: {}", e))
                }
            })?;

        let status_code = response.status();
        let response_body = response
            .text()
            .await
            .map_err(|e| AppError::gateway(format!("Failed to read Razorpay response: {}", e)))?;

        if !status_code.is_success() {
            return Err(AppError::gateway(format!(
                "Razorpay API error - HTTP {} ({})",
                status_code.as_u16(),
                response_body
            )));
        }

        let order: RazorpayOrderResponse = serde_json::from_str(&response_body)
            .map_err(|e| AppError::gateway(format!("Failed to parse Razorpay response: {}", e)))?;

        Ok(order.id)
    }

    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> Result<()> {
        let mut mac = HmacSha256::new_from_slice(self.key_secret.as_bytes())
            .map_err(|_| AppError::internal("Invalid gateway secret length"))?;
        mac.update(Self::expected_signature_input(order_id, payment_id).as_bytes());

        let provided = hex::decode(signature).map_err(|_| AppError::SignatureVerification)?;

        // verify_slice runs in constant time
        mac.verify_slice(&provided)
            .map_err(|_| AppError::SignatureVerification)
    }

    fn parse_webhook(&self, body: &str) -> Result<WebhookEvent> {
        let webhook: RazorpayWebhook = serde_json::from_str(body)?;

        if webhook.event != "payment.captured" {
            return Ok(WebhookEvent::Ignored {
                event: webhook.event,
            });
        }

        let entity = webhook
            .payload
            .and_then(|p| p.payment)
            .map(|p| p.entity)
            .ok_or_else(|| {
                AppError::validation("payment.captured webhook missing payment entity")
            })?;

        Ok(WebhookEvent::PaymentCaptured {
            gateway_order_id: entity.order_id,
            gateway_payment_id: entity.id,
        })
    }

    fn name(&self) -> &str {
        "razorpay"
    }
}

// Razorpay wire structures

#[derive(Debug, Deserialize)]
struct RazorpayOrderResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RazorpayWebhook {
    event: String,
    payload: Option<RazorpayWebhookPayload>,
}

#[derive(Debug, Deserialize)]
struct RazorpayWebhookPayload {
    payment: Option<RazorpayPaymentWrapper>,
}

#[derive(Debug, Deserialize)]
struct RazorpayPaymentWrapper {
    entity: RazorpayPaymentEntity,
}

#[derive(Debug, Deserialize)]
struct RazorpayPaymentEntity {
    id: String,
    order_id: String,
}
