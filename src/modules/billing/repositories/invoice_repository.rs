// MySQL persistence for invoices.
//
// Settlement reads the invoice FOR UPDATE so the synchronous callback and
// the webhook cannot both observe status=unpaid.

use sqlx::{MySql, MySqlPool, Transaction};

use crate::core::{AppError, Result};
use crate::modules::billing::models::Invoice;

const SELECT_COLUMNS: &str = "id, patient_id, invoice_type, appointment_id, pharmacy_order_id, \
     amount, status, gateway_order_id, gateway_payment_id, gateway_signature, \
     paid_at, created_at, updated_at";

#[derive(Clone)]
pub struct InvoiceRepository {
    pool: MySqlPool,
}

impl InvoiceRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, invoice: &Invoice) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        self.create_with_tx(&mut tx, invoice).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Insert within an existing transaction, for the offline-payment path
    /// where the appointment update and the paid invoice commit together.
    pub async fn create_with_tx(
        &self,
        tx: &mut Transaction<'_, MySql>,
        invoice: &Invoice,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, patient_id, invoice_type, appointment_id, pharmacy_order_id,
                amount, status, gateway_order_id, gateway_payment_id,
                gateway_signature, paid_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.patient_id)
        .bind(invoice.invoice_type)
        .bind(&invoice.appointment_id)
        .bind(&invoice.pharmacy_order_id)
        .bind(invoice.amount)
        .bind(invoice.status)
        .bind(&invoice.gateway_order_id)
        .bind(&invoice.gateway_payment_id)
        .bind(&invoice.gateway_signature)
        .bind(invoice.paid_at)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {} FROM invoices WHERE id = ?",
            SELECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invoice)
    }

    /// The live unpaid invoice for an appointment, if one exists.
    /// Find-or-create keys off this to avoid duplicate billable invoices.
    pub async fn find_unpaid_for_appointment(
        &self,
        appointment_id: &str,
    ) -> Result<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            SELECT {}
            FROM invoices
            WHERE appointment_id = ? AND status = 'unpaid'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
            SELECT_COLUMNS
        ))
        .bind(appointment_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invoice)
    }

    pub async fn find_unpaid_for_pharmacy_order(&self, order_id: &str) -> Result<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            SELECT {}
            FROM invoices
            WHERE pharmacy_order_id = ? AND status = 'unpaid'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
            SELECT_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invoice)
    }

    /// Locked lookup by gateway order id; both settlement paths enter here.
    pub async fn find_by_gateway_order_for_update(
        &self,
        tx: &mut Transaction<'_, MySql>,
        gateway_order_id: &str,
    ) -> Result<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {} FROM invoices WHERE gateway_order_id = ? FOR UPDATE",
            SELECT_COLUMNS
        ))
        .bind(gateway_order_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(invoice)
    }

    pub async fn find_for_update(
        &self,
        tx: &mut Transaction<'_, MySql>,
        id: &str,
    ) -> Result<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {} FROM invoices WHERE id = ? FOR UPDATE",
            SELECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(invoice)
    }

    /// Record the gateway order id before control returns to the caller.
    pub async fn set_gateway_order(&self, id: &str, gateway_order_id: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE invoices SET gateway_order_id = ?, updated_at = NOW() WHERE id = ?",
        )
        .bind(gateway_order_id)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Invoice '{}'", id)));
        }

        Ok(())
    }

    pub async fn update_with_tx(
        &self,
        tx: &mut Transaction<'_, MySql>,
        invoice: &Invoice,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE invoices
            SET status = ?, gateway_payment_id = ?, gateway_signature = ?,
                paid_at = ?, updated_at = NOW()
            WHERE id = ?
            "#,
        )
        .bind(invoice.status)
        .bind(&invoice.gateway_payment_id)
        .bind(&invoice.gateway_signature)
        .bind(invoice.paid_at)
        .bind(&invoice.id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    pub async fn list_for_patient(&self, patient_id: &str) -> Result<Vec<Invoice>> {
        let invoices = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            SELECT {}
            FROM invoices
            WHERE patient_id = ?
            ORDER BY created_at DESC
            LIMIT 200
            "#,
            SELECT_COLUMNS
        ))
        .bind(patient_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(invoices)
    }
}
