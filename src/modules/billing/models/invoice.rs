// Invoice model.
//
// An invoice is one billable charge tied to exactly one appointment or
// pharmacy order. The amount is snapshotted at creation from the source
// order and never recomputed; fee or price changes after issuance do not
// reprice existing invoices. Invoices are never deleted.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::core::{AppError, Result, TransitionError};
use crate::modules::appointments::models::Appointment;
use crate::modules::pharmacy::models::PharmacyOrder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR(20)", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InvoiceType {
    Appointment,
    Pharmacy,
}

impl std::fmt::Display for InvoiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvoiceType::Appointment => write!(f, "appointment"),
            InvoiceType::Pharmacy => write!(f, "pharmacy"),
        }
    }
}

impl std::str::FromStr for InvoiceType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "appointment" => Ok(InvoiceType::Appointment),
            "pharmacy" => Ok(InvoiceType::Pharmacy),
            _ => Err(format!("Invalid order type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR(20)", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Unpaid,
    Paid,
    Refunded,
    Failed,
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvoiceStatus::Unpaid => write!(f, "unpaid"),
            InvoiceStatus::Paid => write!(f, "paid"),
            InvoiceStatus::Refunded => write!(f, "refunded"),
            InvoiceStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub id: String,
    pub patient_id: String,
    pub invoice_type: InvoiceType,
    pub appointment_id: Option<String>,
    pub pharmacy_order_id: Option<String>,
    /// Currency-exact; two fractional digits, INR
    pub amount: Decimal,
    pub status: InvoiceStatus,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub gateway_signature: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Unpaid invoice for an appointment, amount snapshotted from the
    /// doctor's current consultation fee.
    pub fn for_appointment(
        appointment: &Appointment,
        consultation_fee: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        Self::new(
            appointment.patient_id.clone(),
            InvoiceType::Appointment,
            Some(appointment.id.clone()),
            None,
            consultation_fee,
            now,
        )
    }

    /// Unpaid invoice for a pharmacy order, amount snapshotted from the
    /// order total.
    pub fn for_pharmacy_order(order: &PharmacyOrder, now: DateTime<Utc>) -> Self {
        Self::new(
            order.patient_id.clone(),
            InvoiceType::Pharmacy,
            None,
            Some(order.id.clone()),
            order.total_amount,
            now,
        )
    }

    /// Already-paid invoice for the cash/offline path; bypasses the
    /// gateway entirely, so no gateway identifiers are ever set.
    pub fn paid_offline(
        appointment: &Appointment,
        consultation_fee: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        let mut invoice = Self::for_appointment(appointment, consultation_fee, now);
        invoice.status = InvoiceStatus::Paid;
        invoice.paid_at = Some(now);
        invoice
    }

    fn new(
        patient_id: String,
        invoice_type: InvoiceType,
        appointment_id: Option<String>,
        pharmacy_order_id: Option<String>,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            patient_id,
            invoice_type,
            appointment_id,
            pharmacy_order_id,
            amount: amount.round_dp(2),
            status: InvoiceStatus::Unpaid,
            gateway_order_id: None,
            gateway_payment_id: None,
            gateway_signature: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Minor-unit (paise) amount, computed only at the gateway boundary.
    /// The decimal amount stays canonical in storage.
    pub fn amount_in_paise(&self) -> Result<i64> {
        (self.amount * Decimal::ONE_HUNDRED)
            .round()
            .to_i64()
            .ok_or_else(|| AppError::internal("Invoice amount out of range for minor units"))
    }

    /// Mark paid and record the gateway correlation ids.
    ///
    /// Idempotent: returns `false` without mutating anything (paid_at
    /// included) when the invoice is already paid, so the synchronous
    /// callback and the webhook can both deliver the same settlement in
    /// either order.
    pub fn settle(
        &mut self,
        gateway_payment_id: &str,
        gateway_signature: Option<&str>,
        now: DateTime<Utc>,
    ) -> bool {
        if self.status == InvoiceStatus::Paid {
            return false;
        }

        self.status = InvoiceStatus::Paid;
        self.gateway_payment_id = Some(gateway_payment_id.to_string());
        if let Some(signature) = gateway_signature {
            self.gateway_signature = Some(signature.to_string());
        }
        self.paid_at = Some(now);
        true
    }

    /// Paid to refunded; any other starting state is refused.
    pub fn mark_refunded(&mut self) -> std::result::Result<(), TransitionError> {
        if self.status != InvoiceStatus::Paid {
            return Err(TransitionError::NotPaid);
        }
        self.status = InvoiceStatus::Refunded;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn sample_appointment() -> Appointment {
        let now = Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap();
        Appointment::new(
            "patient-1".to_string(),
            "doctor-1".to_string(),
            None,
            Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap(),
            "Checkup".to_string(),
            now,
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 2, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_invoice_snapshots_fee() {
        let invoice = Invoice::for_appointment(&sample_appointment(), dec!(500.00), now());
        assert_eq!(invoice.amount, dec!(500.00));
        assert_eq!(invoice.status, InvoiceStatus::Unpaid);
        assert_eq!(invoice.invoice_type, InvoiceType::Appointment);
        assert!(invoice.appointment_id.is_some());
        assert!(invoice.pharmacy_order_id.is_none());
    }

    #[test]
    fn test_amount_in_paise_is_exact() {
        let invoice = Invoice::for_appointment(&sample_appointment(), dec!(500.00), now());
        assert_eq!(invoice.amount_in_paise().unwrap(), 50000);

        let invoice = Invoice::for_appointment(&sample_appointment(), dec!(499.99), now());
        assert_eq!(invoice.amount_in_paise().unwrap(), 49999);

        let invoice = Invoice::for_appointment(&sample_appointment(), dec!(0.01), now());
        assert_eq!(invoice.amount_in_paise().unwrap(), 1);
    }

    #[test]
    fn test_settle_is_idempotent() {
        let mut invoice = Invoice::for_appointment(&sample_appointment(), dec!(500.00), now());

        assert!(invoice.settle("pay_1", Some("sig_1"), now()));
        assert_eq!(invoice.status, InvoiceStatus::Paid);
        let first_paid_at = invoice.paid_at;

        let later = Utc.with_ymd_and_hms(2025, 5, 2, 12, 5, 0).unwrap();
        assert!(!invoice.settle("pay_1", Some("sig_1"), later));
        assert_eq!(invoice.paid_at, first_paid_at);
        assert_eq!(invoice.gateway_payment_id.as_deref(), Some("pay_1"));
    }

    #[test]
    fn test_offline_invoice_has_no_gateway_ids() {
        let invoice = Invoice::paid_offline(&sample_appointment(), dec!(500.00), now());
        assert_eq!(invoice.status, InvoiceStatus::Paid);
        assert!(invoice.paid_at.is_some());
        assert!(invoice.gateway_order_id.is_none());
        assert!(invoice.gateway_payment_id.is_none());
    }

    #[test]
    fn test_refund_requires_paid() {
        let mut invoice = Invoice::for_appointment(&sample_appointment(), dec!(500.00), now());
        assert_eq!(invoice.mark_refunded(), Err(TransitionError::NotPaid));

        invoice.settle("pay_1", None, now());
        assert!(invoice.mark_refunded().is_ok());
        assert_eq!(invoice.status, InvoiceStatus::Refunded);
    }
}
