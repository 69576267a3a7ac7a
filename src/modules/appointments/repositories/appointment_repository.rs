// MySQL persistence for appointments.
//
// State transitions are read-validate-write under SELECT ... FOR UPDATE;
// the service layer owns the transaction, this layer owns the SQL.

use chrono::{DateTime, Utc};
use sqlx::{MySql, MySqlPool, Transaction};

use crate::core::{AppError, Result};
use crate::modules::appointments::models::{Appointment, AppointmentStatus, PaymentStatus};

const SELECT_COLUMNS: &str = "id, patient_id, doctor_id, department_id, scheduled_at, \
     duration_minutes, status, payment_status, reason, notes, slot_bucket, \
     created_at, updated_at";

#[derive(Clone)]
pub struct AppointmentRepository {
    pool: MySqlPool,
}

impl AppointmentRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Insert a freshly booked appointment.
    ///
    /// A duplicate (doctor_id, slot_bucket) key means another booking won
    /// the check-then-insert race; surfaced as the same slot-unavailable
    /// validation error the availability check produces.
    pub async fn create(&self, appointment: &Appointment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO appointments (
                id, patient_id, doctor_id, department_id, scheduled_at,
                duration_minutes, status, payment_status, reason, notes,
                slot_bucket, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&appointment.id)
        .bind(&appointment.patient_id)
        .bind(&appointment.doctor_id)
        .bind(&appointment.department_id)
        .bind(appointment.scheduled_at)
        .bind(appointment.duration_minutes)
        .bind(appointment.status)
        .bind(appointment.payment_status)
        .bind(&appointment.reason)
        .bind(&appointment.notes)
        .bind(appointment.slot_bucket)
        .bind(appointment.created_at)
        .bind(appointment.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::validation("This time slot is not available.");
                }
            }
            AppError::Database(e)
        })?;

        Ok(())
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Appointment>> {
        let appointment = sqlx::query_as::<_, Appointment>(&format!(
            "SELECT {} FROM appointments WHERE id = ?",
            SELECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(appointment)
    }

    /// Fetch with a row lock; must run inside the caller's transaction so
    /// concurrent transitions on the same appointment serialize.
    pub async fn find_for_update(
        &self,
        tx: &mut Transaction<'_, MySql>,
        id: &str,
    ) -> Result<Option<Appointment>> {
        let appointment = sqlx::query_as::<_, Appointment>(&format!(
            "SELECT {} FROM appointments WHERE id = ? FOR UPDATE",
            SELECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(appointment)
    }

    /// Persist the outcome of a state transition.
    pub async fn update_with_tx(
        &self,
        tx: &mut Transaction<'_, MySql>,
        appointment: &Appointment,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE appointments
            SET status = ?, payment_status = ?, notes = ?, slot_bucket = ?,
                updated_at = NOW()
            WHERE id = ?
            "#,
        )
        .bind(appointment.status)
        .bind(appointment.payment_status)
        .bind(&appointment.notes)
        .bind(appointment.slot_bucket)
        .bind(&appointment.id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Settlement cascade: flip payment status without touching the rest.
    pub async fn set_payment_status_with_tx(
        &self,
        tx: &mut Transaction<'_, MySql>,
        id: &str,
        payment_status: PaymentStatus,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE appointments SET payment_status = ?, updated_at = NOW() WHERE id = ?",
        )
        .bind(payment_status)
        .bind(id)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Appointment '{}'", id)));
        }

        Ok(())
    }

    /// Number of pending/confirmed appointments for the doctor whose start
    /// falls inside [window_start, window_end). Mirrors the slot-overlap
    /// predicate in the availability checker.
    pub async fn count_conflicts(
        &self,
        doctor_id: &str,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        exclude_appointment: Option<&str>,
    ) -> Result<i64> {
        // COALESCE keeps one query shape; no appointment has an empty id,
        // so a missing exclusion filters nothing out.
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM appointments
            WHERE doctor_id = ?
              AND scheduled_at >= ?
              AND scheduled_at < ?
              AND status IN ('pending', 'confirmed')
              AND id <> COALESCE(?, '')
            "#,
        )
        .bind(doctor_id)
        .bind(window_start)
        .bind(window_end)
        .bind(exclude_appointment)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    pub async fn list_for_patient(
        &self,
        patient_id: &str,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<Appointment>> {
        self.list_scoped("patient_id", patient_id, status).await
    }

    pub async fn list_for_doctor(
        &self,
        doctor_id: &str,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<Appointment>> {
        self.list_scoped("doctor_id", doctor_id, status).await
    }

    pub async fn list_all(&self, status: Option<AppointmentStatus>) -> Result<Vec<Appointment>> {
        let appointments = sqlx::query_as::<_, Appointment>(&format!(
            r#"
            SELECT {}
            FROM appointments
            WHERE status = COALESCE(?, status)
            ORDER BY scheduled_at DESC
            LIMIT 200
            "#,
            SELECT_COLUMNS
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(appointments)
    }

    async fn list_scoped(
        &self,
        owner_column: &str,
        owner_id: &str,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<Appointment>> {
        let appointments = sqlx::query_as::<_, Appointment>(&format!(
            r#"
            SELECT {}
            FROM appointments
            WHERE {} = ?
              AND status = COALESCE(?, status)
            ORDER BY scheduled_at DESC
            LIMIT 200
            "#,
            SELECT_COLUMNS, owner_column
        ))
        .bind(owner_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(appointments)
    }
}
