use async_trait::async_trait;

use crate::core::Result;

/// Payment gateway abstraction.
///
/// Only minor-unit integers cross this boundary; the decimal invoice
/// amount stays canonical on our side.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a gateway order for the given minor-unit amount with
    /// immediate capture. Returns the gateway order id.
    async fn create_order(
        &self,
        amount_minor_units: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<String>;

    /// Verify the redirect-callback signature for an order/payment pair.
    /// Security-critical; failure is `AppError::SignatureVerification`.
    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> Result<()>;

    /// Parse an inbound webhook body into an event this service acts on.
    fn parse_webhook(&self, body: &str) -> Result<WebhookEvent>;

    /// Gateway name, for logs
    fn name(&self) -> &str;
}

/// Webhook events this service distinguishes. Everything that is not a
/// capture is ignored (acknowledged but not acted on).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    PaymentCaptured {
        gateway_order_id: String,
        gateway_payment_id: String,
    },
    Ignored {
        event: String,
    },
}
