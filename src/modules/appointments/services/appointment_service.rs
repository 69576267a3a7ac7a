// Appointment state transitions.
//
// Every transition runs read-validate-write inside one transaction with a
// row lock on the appointment, so doctor, patient, and admin actions on
// the same appointment linearize against the persisted row.

use std::sync::Arc;

use sqlx::MySqlPool;
use tracing::info;

use crate::core::{Actor, AppError, Clock, Result};
use crate::modules::appointments::models::{Appointment, AppointmentStatus};
use crate::modules::appointments::repositories::AppointmentRepository;
use crate::modules::billing::models::Invoice;
use crate::modules::billing::repositories::InvoiceRepository;
use crate::modules::profiles::ProfileRepository;

pub struct AppointmentService {
    pool: MySqlPool,
    appointments: AppointmentRepository,
    invoices: InvoiceRepository,
    profiles: ProfileRepository,
    clock: Arc<dyn Clock>,
}

impl AppointmentService {
    pub fn new(
        pool: MySqlPool,
        appointments: AppointmentRepository,
        invoices: InvoiceRepository,
        profiles: ProfileRepository,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            pool,
            appointments,
            invoices,
            profiles,
            clock,
        }
    }

    pub async fn confirm(&self, actor: &Actor, id: &str) -> Result<Appointment> {
        self.transition(id, "confirmed", |appointment| appointment.confirm(actor))
            .await
    }

    /// Cancellation; the precondition depends on who is asking.
    pub async fn cancel(&self, actor: &Actor, id: &str) -> Result<Appointment> {
        let now = self.clock.now();
        self.transition(id, "cancelled", |appointment| match actor {
            Actor::Patient { .. } => appointment.cancel_by_patient(actor, now),
            Actor::Doctor { .. } => appointment.cancel_by_doctor(actor),
            Actor::Admin => appointment.cancel_by_admin(actor),
        })
        .await
    }

    pub async fn complete(&self, actor: &Actor, id: &str) -> Result<Appointment> {
        self.transition(id, "completed", |appointment| appointment.complete(actor))
            .await
    }

    pub async fn mark_no_show(&self, actor: &Actor, id: &str) -> Result<Appointment> {
        self.transition(id, "no_show", |appointment| appointment.mark_no_show(actor))
            .await
    }

    /// Cash/offline payment: flips the appointment to paid and writes the
    /// matching paid invoice in the same transaction, amount snapshotted
    /// from the doctor's current consultation fee.
    pub async fn mark_paid_offline(&self, actor: &Actor, id: &str) -> Result<Appointment> {
        let now = self.clock.now();

        let mut tx = self.pool.begin().await?;

        let mut appointment = self
            .appointments
            .find_for_update(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Appointment '{}'", id)))?;

        appointment.mark_paid_offline(actor)?;

        let doctor = self
            .profiles
            .find_doctor(&appointment.doctor_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Doctor '{}'", appointment.doctor_id))
            })?;

        let invoice = Invoice::paid_offline(&appointment, doctor.consultation_fee, now);
        self.invoices.create_with_tx(&mut tx, &invoice).await?;
        self.appointments.update_with_tx(&mut tx, &appointment).await?;

        tx.commit().await?;

        info!(
            appointment_id = %appointment.id,
            invoice_id = %invoice.id,
            amount = %invoice.amount,
            "Offline payment recorded"
        );

        Ok(appointment)
    }

    /// Fetch one appointment, scoped to what the actor may see.
    pub async fn get(&self, actor: &Actor, id: &str) -> Result<Appointment> {
        let appointment = self
            .appointments
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Appointment '{}'", id)))?;

        self.ensure_visible(actor, &appointment)?;
        Ok(appointment)
    }

    pub async fn list(
        &self,
        actor: &Actor,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<Appointment>> {
        match actor {
            Actor::Patient { profile_id } => {
                self.appointments.list_for_patient(profile_id, status).await
            }
            Actor::Doctor { profile_id } => {
                self.appointments.list_for_doctor(profile_id, status).await
            }
            Actor::Admin => self.appointments.list_all(status).await,
        }
    }

    async fn transition<F>(&self, id: &str, action: &str, apply: F) -> Result<Appointment>
    where
        F: FnOnce(&mut Appointment) -> std::result::Result<(), crate::core::TransitionError>,
    {
        let mut tx = self.pool.begin().await?;

        let mut appointment = self
            .appointments
            .find_for_update(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Appointment '{}'", id)))?;

        apply(&mut appointment)?;
        self.appointments.update_with_tx(&mut tx, &appointment).await?;

        tx.commit().await?;

        info!(appointment_id = %id, action = action, "Appointment transition applied");
        Ok(appointment)
    }

    fn ensure_visible(&self, actor: &Actor, appointment: &Appointment) -> Result<()> {
        let visible = match actor {
            Actor::Patient { profile_id } => *profile_id == appointment.patient_id,
            Actor::Doctor { profile_id } => *profile_id == appointment.doctor_id,
            Actor::Admin => true,
        };

        if visible {
            Ok(())
        } else {
            Err(AppError::forbidden("Appointment belongs to another user"))
        }
    }
}
