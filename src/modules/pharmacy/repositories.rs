use sqlx::{MySql, MySqlPool, Transaction};

use crate::core::{AppError, Result};
use crate::modules::pharmacy::models::PharmacyOrder;

#[derive(Clone)]
pub struct PharmacyOrderRepository {
    pool: MySqlPool,
}

impl PharmacyOrderRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<PharmacyOrder>> {
        let order = sqlx::query_as::<_, PharmacyOrder>(
            r#"
            SELECT id, patient_id, total_amount, status, created_at, updated_at
            FROM pharmacy_orders
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Settlement cascade for pharmacy invoices.
    pub async fn mark_paid_with_tx(
        &self,
        tx: &mut Transaction<'_, MySql>,
        id: &str,
    ) -> Result<()> {
        let result =
            sqlx::query("UPDATE pharmacy_orders SET status = 'paid', updated_at = NOW() WHERE id = ?")
                .bind(id)
                .execute(&mut **tx)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Pharmacy order '{}'", id)));
        }

        Ok(())
    }
}
