use std::sync::Arc;

use actix_web::{post, web, HttpResponse};
use tracing::info;

use crate::core::{AppError, Result};
use crate::modules::billing::services::{BillingService, WebhookDisposition};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/webhooks").service(razorpay_webhook));
}

/// Ingest gateway webhook notifications.
/// POST /api/webhooks/razorpay
///
/// Responds 200 for anything recognized or ignorable (unknown event
/// types, unknown gateway orders, duplicate deliveries) so the gateway
/// stops redelivering, and 400 only for bodies that cannot be parsed.
/// Non-POST requests get 405 from the router.
#[post("/razorpay")]
async fn razorpay_webhook(
    service: web::Data<Arc<BillingService>>,
    body: web::Bytes,
) -> Result<HttpResponse> {
    let body = std::str::from_utf8(&body)
        .map_err(|_| AppError::validation("Webhook body is not valid UTF-8"))?;

    let disposition = service.ingest_webhook(body).await?;
    info!(disposition = ?disposition, "Webhook acknowledged");

    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": disposition })))
}
