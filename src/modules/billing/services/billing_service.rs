// Invoice ledger and payment settlement.
//
// Settlement is idempotent and runs under a row lock on the invoice, so
// the synchronous verify callback and the asynchronous webhook can both
// deliver the same "paid" event in either order; whichever arrives first
// wins and the other is a no-op.

use std::sync::Arc;

use serde::Serialize;
use sqlx::MySqlPool;
use tracing::{info, warn};

use crate::core::{Actor, AppError, Clock, Result};
use crate::modules::appointments::models::PaymentStatus;
use crate::modules::appointments::repositories::AppointmentRepository;
use crate::modules::billing::models::{Invoice, InvoiceType};
use crate::modules::billing::repositories::InvoiceRepository;
use crate::modules::gateways::{PaymentGateway, WebhookEvent};
use crate::modules::pharmacy::PharmacyOrderRepository;
use crate::modules::profiles::ProfileRepository;

/// Outcome of a settlement attempt keyed by gateway order id.
#[derive(Debug)]
pub enum SettlementOutcome {
    /// This call transitioned the invoice to paid and ran the cascade
    Settled(Invoice),
    /// Another delivery already settled the invoice; no-op
    AlreadyPaid(Invoice),
    /// No invoice carries this gateway order id; logged and tolerated,
    /// the webhook may predate this deployment or race invoice creation
    UnknownOrder,
}

/// What the webhook endpoint should acknowledge.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WebhookDisposition {
    Settled,
    Duplicate,
    Ignored,
    UnknownOrder,
}

#[derive(Debug, Serialize)]
pub struct PaymentInitiation {
    pub invoice: Invoice,
    pub gateway_order_id: String,
}

pub struct BillingService {
    pool: MySqlPool,
    invoices: InvoiceRepository,
    appointments: AppointmentRepository,
    pharmacy_orders: PharmacyOrderRepository,
    profiles: ProfileRepository,
    gateway: Arc<dyn PaymentGateway>,
    clock: Arc<dyn Clock>,
}

impl BillingService {
    pub fn new(
        pool: MySqlPool,
        invoices: InvoiceRepository,
        appointments: AppointmentRepository,
        pharmacy_orders: PharmacyOrderRepository,
        profiles: ProfileRepository,
        gateway: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            pool,
            invoices,
            appointments,
            pharmacy_orders,
            profiles,
            gateway,
            clock,
        }
    }

    /// Find the live unpaid invoice for the source order, or create one
    /// with the amount snapshotted from the order's current price.
    pub async fn get_or_create_invoice(
        &self,
        actor: &Actor,
        invoice_type: InvoiceType,
        order_id: &str,
    ) -> Result<Invoice> {
        match invoice_type {
            InvoiceType::Appointment => {
                let appointment = self
                    .appointments
                    .find_by_id(order_id)
                    .await?
                    .ok_or_else(|| AppError::not_found(format!("Appointment '{}'", order_id)))?;
                self.ensure_owned_by(actor, &appointment.patient_id)?;

                if let Some(invoice) =
                    self.invoices.find_unpaid_for_appointment(order_id).await?
                {
                    return Ok(invoice);
                }

                let doctor = self
                    .profiles
                    .find_doctor(&appointment.doctor_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::not_found(format!("Doctor '{}'", appointment.doctor_id))
                    })?;

                let invoice = Invoice::for_appointment(
                    &appointment,
                    doctor.consultation_fee,
                    self.clock.now(),
                );
                self.invoices.create(&invoice).await?;
                Ok(invoice)
            }
            InvoiceType::Pharmacy => {
                let order = self
                    .pharmacy_orders
                    .find_by_id(order_id)
                    .await?
                    .ok_or_else(|| AppError::not_found(format!("Pharmacy order '{}'", order_id)))?;
                self.ensure_owned_by(actor, &order.patient_id)?;

                if let Some(invoice) =
                    self.invoices.find_unpaid_for_pharmacy_order(order_id).await?
                {
                    return Ok(invoice);
                }

                let invoice = Invoice::for_pharmacy_order(&order, self.clock.now());
                self.invoices.create(&invoice).await?;
                Ok(invoice)
            }
        }
    }

    /// Create (or reuse) the invoice and open a gateway order for it.
    ///
    /// The gateway order id is persisted before control returns; gateway
    /// failures surface without mutating anything beyond the invoice the
    /// ledger already committed, so the user can simply retry.
    pub async fn initiate_payment(
        &self,
        actor: &Actor,
        invoice_type: InvoiceType,
        order_id: &str,
    ) -> Result<PaymentInitiation> {
        let mut invoice = self
            .get_or_create_invoice(actor, invoice_type, order_id)
            .await?;

        let gateway_order_id = self
            .gateway
            .create_order(invoice.amount_in_paise()?, "INR", &invoice.id)
            .await?;

        self.invoices
            .set_gateway_order(&invoice.id, &gateway_order_id)
            .await?;
        invoice.gateway_order_id = Some(gateway_order_id.clone());

        info!(
            invoice_id = %invoice.id,
            gateway = self.gateway.name(),
            gateway_order_id = %gateway_order_id,
            "Payment initiated"
        );

        Ok(PaymentInitiation {
            invoice,
            gateway_order_id,
        })
    }

    /// Synchronous settlement path: browser redirect back from the
    /// gateway. Verifies the signature, then settles.
    pub async fn verify_payment(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        gateway_signature: &str,
    ) -> Result<Invoice> {
        self.gateway
            .verify_signature(gateway_order_id, gateway_payment_id, gateway_signature)?;

        match self
            .settle(gateway_order_id, gateway_payment_id, Some(gateway_signature))
            .await?
        {
            SettlementOutcome::Settled(invoice) | SettlementOutcome::AlreadyPaid(invoice) => {
                Ok(invoice)
            }
            SettlementOutcome::UnknownOrder => Err(AppError::not_found(format!(
                "Invoice for gateway order '{}'",
                gateway_order_id
            ))),
        }
    }

    /// Asynchronous settlement path: gateway webhook body.
    pub async fn ingest_webhook(&self, body: &str) -> Result<WebhookDisposition> {
        match self.gateway.parse_webhook(body)? {
            WebhookEvent::PaymentCaptured {
                gateway_order_id,
                gateway_payment_id,
            } => match self
                .settle(&gateway_order_id, &gateway_payment_id, None)
                .await?
            {
                SettlementOutcome::Settled(_) => Ok(WebhookDisposition::Settled),
                SettlementOutcome::AlreadyPaid(_) => Ok(WebhookDisposition::Duplicate),
                SettlementOutcome::UnknownOrder => {
                    warn!(
                        gateway_order_id = %gateway_order_id,
                        "Webhook references unknown gateway order; ignoring"
                    );
                    Ok(WebhookDisposition::UnknownOrder)
                }
            },
            WebhookEvent::Ignored { event } => {
                info!(event = %event, "Ignoring webhook event type");
                Ok(WebhookDisposition::Ignored)
            }
        }
    }

    /// Settle the invoice carrying this gateway order id and cascade the
    /// paid fact to its source order. Row-locked and idempotent.
    pub async fn settle(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        gateway_signature: Option<&str>,
    ) -> Result<SettlementOutcome> {
        let mut tx = self.pool.begin().await?;

        let Some(mut invoice) = self
            .invoices
            .find_by_gateway_order_for_update(&mut tx, gateway_order_id)
            .await?
        else {
            tx.rollback().await?;
            return Ok(SettlementOutcome::UnknownOrder);
        };

        if !invoice.settle(gateway_payment_id, gateway_signature, self.clock.now()) {
            tx.commit().await?;
            return Ok(SettlementOutcome::AlreadyPaid(invoice));
        }

        self.invoices.update_with_tx(&mut tx, &invoice).await?;
        self.cascade(&mut tx, &invoice, PaymentStatus::Paid).await?;

        tx.commit().await?;

        info!(
            invoice_id = %invoice.id,
            gateway_order_id = %gateway_order_id,
            gateway_payment_id = %gateway_payment_id,
            "Invoice settled"
        );

        Ok(SettlementOutcome::Settled(invoice))
    }

    /// Administrative refund: paid invoice to refunded, cascaded to the
    /// source appointment's payment status.
    pub async fn mark_refunded(&self, actor: &Actor, invoice_id: &str) -> Result<Invoice> {
        if !actor.is_admin() {
            return Err(AppError::forbidden("Only administrators can refund invoices"));
        }

        let mut tx = self.pool.begin().await?;

        let mut invoice = self
            .invoices
            .find_for_update(&mut tx, invoice_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Invoice '{}'", invoice_id)))?;

        invoice.mark_refunded()?;

        self.invoices.update_with_tx(&mut tx, &invoice).await?;
        if invoice.invoice_type == InvoiceType::Appointment {
            self.cascade(&mut tx, &invoice, PaymentStatus::Refunded)
                .await?;
        }

        tx.commit().await?;

        info!(invoice_id = %invoice.id, "Invoice refunded");
        Ok(invoice)
    }

    pub async fn get_invoice(&self, actor: &Actor, id: &str) -> Result<Invoice> {
        let invoice = self
            .invoices
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Invoice '{}'", id)))?;

        self.ensure_owned_by(actor, &invoice.patient_id)?;
        Ok(invoice)
    }

    pub async fn list_invoices(&self, actor: &Actor) -> Result<Vec<Invoice>> {
        let patient_id = actor
            .patient_id()
            .ok_or_else(|| AppError::forbidden("Only patients have an invoice list"))?;
        self.invoices.list_for_patient(patient_id).await
    }

    /// Exactly one cascade, chosen by invoice type.
    async fn cascade(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::MySql>,
        invoice: &Invoice,
        payment_status: PaymentStatus,
    ) -> Result<()> {
        match invoice.invoice_type {
            InvoiceType::Appointment => {
                if let Some(appointment_id) = &invoice.appointment_id {
                    self.appointments
                        .set_payment_status_with_tx(tx, appointment_id, payment_status)
                        .await?;
                }
            }
            InvoiceType::Pharmacy => {
                if let Some(order_id) = &invoice.pharmacy_order_id {
                    self.pharmacy_orders.mark_paid_with_tx(tx, order_id).await?;
                }
            }
        }
        Ok(())
    }

    /// Admins may read anything; patients only their own records.
    fn ensure_owned_by(&self, actor: &Actor, patient_id: &str) -> Result<()> {
        match actor {
            Actor::Admin => Ok(()),
            Actor::Patient { profile_id } if profile_id == patient_id => Ok(()),
            _ => Err(AppError::forbidden("Record belongs to another patient")),
        }
    }
}
