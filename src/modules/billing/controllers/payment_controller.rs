use std::str::FromStr;
use std::sync::Arc;

use actix_web::{get, post, web, HttpResponse};
use serde::Deserialize;

use crate::core::{Actor, AppError, Result};
use crate::modules::billing::models::InvoiceType;
use crate::modules::billing::services::BillingService;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/payments")
            .service(verify_payment)
            .service(initiate_payment),
    )
    .service(
        web::scope("/invoices")
            .service(list_invoices)
            .service(get_invoice)
            .service(refund_invoice),
    );
}

/// Start an online payment for an appointment or pharmacy order.
/// POST /api/payments/{order_type}/{order_id}
///
/// Reuses the live unpaid invoice when one exists, opens a gateway order
/// for it, and returns both so the client can launch the gateway checkout.
#[post("/{order_type}/{order_id}")]
async fn initiate_payment(
    service: web::Data<Arc<BillingService>>,
    actor: Actor,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse> {
    let (order_type, order_id) = path.into_inner();
    let invoice_type =
        InvoiceType::from_str(&order_type).map_err(AppError::Validation)?;

    let initiation = service
        .initiate_payment(&actor, invoice_type, &order_id)
        .await?;

    Ok(HttpResponse::Ok().json(initiation))
}

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub gateway_signature: String,
}

/// Synchronous settlement: the browser posts the gateway's callback
/// parameters here after checkout.
/// POST /api/payments/verify
#[post("/verify")]
async fn verify_payment(
    service: web::Data<Arc<BillingService>>,
    _actor: Actor,
    request: web::Json<VerifyPaymentRequest>,
) -> Result<HttpResponse> {
    let invoice = service
        .verify_payment(
            &request.gateway_order_id,
            &request.gateway_payment_id,
            &request.gateway_signature,
        )
        .await?;

    Ok(HttpResponse::Ok().json(invoice))
}

/// GET /api/invoices
#[get("")]
async fn list_invoices(
    service: web::Data<Arc<BillingService>>,
    actor: Actor,
) -> Result<HttpResponse> {
    let invoices = service.list_invoices(&actor).await?;
    Ok(HttpResponse::Ok().json(invoices))
}

/// GET /api/invoices/{id}
#[get("/{id}")]
async fn get_invoice(
    service: web::Data<Arc<BillingService>>,
    actor: Actor,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let invoice = service.get_invoice(&actor, &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(invoice))
}

/// Administrative refund of a paid invoice.
/// POST /api/invoices/{id}/refund
#[post("/{id}/refund")]
async fn refund_invoice(
    service: web::Data<Arc<BillingService>>,
    actor: Actor,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let invoice = service.mark_refunded(&actor, &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(invoice))
}
