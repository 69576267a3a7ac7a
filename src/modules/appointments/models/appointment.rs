// Appointment model and its state machine.
//
// Status and payment status evolve independently: doctor/patient/admin
// actions drive the status, settlement events drive the payment status.
// Transition preconditions live here so they hold no matter which service
// or test constructs the appointment; services persist the outcome under a
// row lock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::core::{Actor, TransitionError};

/// Fixed slot width; one doctor serves one appointment per 30-minute window.
pub const SLOT_MINUTES: i64 = 30;

/// Bucket index used by the (doctor_id, slot_bucket) uniqueness backstop.
pub fn slot_bucket_for(at: DateTime<Utc>) -> i64 {
    at.timestamp() / (SLOT_MINUTES * 60)
}

/// Appointment lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR(20)", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
    NoShow,
}

impl AppointmentStatus {
    /// Completed, cancelled, and no-show admit no further status transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Cancelled | AppointmentStatus::Completed | AppointmentStatus::NoShow
        )
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::NoShow => write!(f, "no_show"),
        }
    }
}

impl std::str::FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AppointmentStatus::Pending),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            "completed" => Ok(AppointmentStatus::Completed),
            "no_show" => Ok(AppointmentStatus::NoShow),
            _ => Err(format!("Invalid appointment status: {}", s)),
        }
    }
}

/// Payment sub-state, orthogonal to the appointment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR(20)", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    Refunded,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Unpaid => write!(f, "unpaid"),
            PaymentStatus::Paid => write!(f, "paid"),
            PaymentStatus::Refunded => write!(f, "refunded"),
        }
    }
}

/// One scheduled patient-doctor encounter.
///
/// Appointments are never hard-deleted; cancellation is a status
/// transition. The scheduled start time is immutable after creation, the
/// supported path for a different time is cancel-and-rebook.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String,
    /// Denormalized; cleared if the department is removed
    pub department_id: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    pub payment_status: PaymentStatus,
    pub reason: String,
    pub notes: String,
    /// Uniqueness backstop key; None once cancelled so the slot frees up
    pub slot_bucket: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn new(
        patient_id: String,
        doctor_id: String,
        department_id: Option<String>,
        scheduled_at: DateTime<Utc>,
        reason: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            patient_id,
            doctor_id,
            department_id,
            scheduled_at,
            duration_minutes: SLOT_MINUTES as i32,
            status: AppointmentStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            reason,
            notes: String::new(),
            slot_bucket: Some(slot_bucket_for(scheduled_at)),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_at > now
    }

    /// Confirm a pending appointment. Assigned doctor only.
    pub fn confirm(&mut self, actor: &Actor) -> Result<(), TransitionError> {
        self.ensure_assigned_doctor(actor)?;
        if self.status != AppointmentStatus::Pending {
            return Err(TransitionError::NotPending);
        }
        self.status = AppointmentStatus::Confirmed;
        Ok(())
    }

    /// Cancel while still pending and in the future. Owning patient only.
    ///
    /// Once a doctor has confirmed, the patient can no longer cancel; the
    /// asymmetry protects the doctor's schedule commitment.
    pub fn cancel_by_patient(
        &mut self,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        self.ensure_owning_patient(actor)?;
        if self.status != AppointmentStatus::Pending || !self.is_upcoming(now) {
            return Err(TransitionError::NotCancellable);
        }
        self.cancel();
        Ok(())
    }

    /// Cancel a pending or confirmed appointment. Assigned doctor only.
    pub fn cancel_by_doctor(&mut self, actor: &Actor) -> Result<(), TransitionError> {
        self.ensure_assigned_doctor(actor)?;
        if !matches!(
            self.status,
            AppointmentStatus::Pending | AppointmentStatus::Confirmed
        ) {
            return Err(TransitionError::NotCancellable);
        }
        self.cancel();
        Ok(())
    }

    /// Administrative override; any non-terminal state may be cancelled.
    pub fn cancel_by_admin(&mut self, actor: &Actor) -> Result<(), TransitionError> {
        if !actor.is_admin() {
            return Err(TransitionError::WrongActor);
        }
        if self.status.is_terminal() {
            return Err(TransitionError::AlreadyTerminal);
        }
        self.cancel();
        Ok(())
    }

    /// Mark a confirmed appointment completed. Assigned doctor only.
    /// Completion is the precondition for prescription authoring.
    pub fn complete(&mut self, actor: &Actor) -> Result<(), TransitionError> {
        self.ensure_assigned_doctor(actor)?;
        if self.status != AppointmentStatus::Confirmed {
            return Err(TransitionError::NotConfirmed);
        }
        self.status = AppointmentStatus::Completed;
        Ok(())
    }

    /// Record that a confirmed patient did not show up. Assigned doctor only.
    pub fn mark_no_show(&mut self, actor: &Actor) -> Result<(), TransitionError> {
        self.ensure_assigned_doctor(actor)?;
        if self.status != AppointmentStatus::Confirmed {
            return Err(TransitionError::NotConfirmed);
        }
        self.status = AppointmentStatus::NoShow;
        Ok(())
    }

    /// Record a cash/offline payment. Assigned doctor only; valid for any
    /// non-cancelled status while still unpaid. The caller creates the
    /// matching paid invoice in the same transaction.
    pub fn mark_paid_offline(&mut self, actor: &Actor) -> Result<(), TransitionError> {
        self.ensure_assigned_doctor(actor)?;
        if self.status == AppointmentStatus::Cancelled {
            return Err(TransitionError::Cancelled);
        }
        if self.payment_status != PaymentStatus::Unpaid {
            return Err(TransitionError::AlreadyPaid);
        }
        self.payment_status = PaymentStatus::Paid;
        Ok(())
    }

    /// Settlement cascade entry point; payment status only, no actor check.
    pub fn record_payment(&mut self, status: PaymentStatus) {
        self.payment_status = status;
    }

    fn cancel(&mut self) {
        self.status = AppointmentStatus::Cancelled;
        // frees the (doctor_id, slot_bucket) unique key for rebooking
        self.slot_bucket = None;
    }

    fn ensure_assigned_doctor(&self, actor: &Actor) -> Result<(), TransitionError> {
        match actor.doctor_id() {
            Some(id) if id == self.doctor_id => Ok(()),
            _ => Err(TransitionError::WrongActor),
        }
    }

    fn ensure_owning_patient(&self, actor: &Actor) -> Result<(), TransitionError> {
        match actor.patient_id() {
            Some(id) if id == self.patient_id => Ok(()),
            _ => Err(TransitionError::WrongActor),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn appointment() -> Appointment {
        let now = Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap();
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        Appointment::new(
            "patient-1".to_string(),
            "doctor-1".to_string(),
            Some("dept-1".to_string()),
            start,
            "Checkup".to_string(),
            now,
        )
    }

    fn doctor() -> Actor {
        Actor::Doctor {
            profile_id: "doctor-1".to_string(),
        }
    }

    fn patient() -> Actor {
        Actor::Patient {
            profile_id: "patient-1".to_string(),
        }
    }

    #[test]
    fn test_new_appointment_is_pending_and_unpaid() {
        let appt = appointment();
        assert_eq!(appt.status, AppointmentStatus::Pending);
        assert_eq!(appt.payment_status, PaymentStatus::Unpaid);
        assert!(appt.slot_bucket.is_some());
    }

    #[test]
    fn test_only_assigned_doctor_can_confirm() {
        let mut appt = appointment();
        let other = Actor::Doctor {
            profile_id: "doctor-2".to_string(),
        };
        assert_eq!(appt.confirm(&other), Err(TransitionError::WrongActor));
        assert_eq!(appt.confirm(&patient()), Err(TransitionError::WrongActor));
        assert!(appt.confirm(&doctor()).is_ok());
        assert_eq!(appt.status, AppointmentStatus::Confirmed);
    }

    #[test]
    fn test_confirm_requires_pending() {
        let mut appt = appointment();
        appt.confirm(&doctor()).unwrap();
        assert_eq!(appt.confirm(&doctor()), Err(TransitionError::NotPending));
    }

    #[test]
    fn test_patient_cancel_clears_slot_bucket() {
        let mut appt = appointment();
        let now = Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap();
        appt.cancel_by_patient(&patient(), now).unwrap();
        assert_eq!(appt.status, AppointmentStatus::Cancelled);
        assert_eq!(appt.slot_bucket, None);
    }

    #[test]
    fn test_patient_cannot_cancel_past_appointment() {
        let mut appt = appointment();
        let after_start = Utc.with_ymd_and_hms(2025, 6, 1, 10, 1, 0).unwrap();
        assert_eq!(
            appt.cancel_by_patient(&patient(), after_start),
            Err(TransitionError::NotCancellable)
        );
        assert_eq!(appt.status, AppointmentStatus::Pending);
    }

    #[test]
    fn test_admin_cancel_overrides_confirmed() {
        let mut appt = appointment();
        appt.confirm(&doctor()).unwrap();
        assert!(appt.cancel_by_admin(&Actor::Admin).is_ok());
        assert_eq!(appt.status, AppointmentStatus::Cancelled);
    }

    #[test]
    fn test_admin_cannot_cancel_terminal() {
        let mut appt = appointment();
        appt.confirm(&doctor()).unwrap();
        appt.complete(&doctor()).unwrap();
        assert_eq!(
            appt.cancel_by_admin(&Actor::Admin),
            Err(TransitionError::AlreadyTerminal)
        );
    }

    #[test]
    fn test_no_show_requires_confirmed() {
        let mut appt = appointment();
        assert_eq!(
            appt.mark_no_show(&doctor()),
            Err(TransitionError::NotConfirmed)
        );
        appt.confirm(&doctor()).unwrap();
        assert!(appt.mark_no_show(&doctor()).is_ok());
        assert_eq!(appt.status, AppointmentStatus::NoShow);
    }

    #[test]
    fn test_offline_payment_rejected_when_cancelled() {
        let mut appt = appointment();
        appt.cancel_by_doctor(&doctor()).unwrap();
        assert_eq!(
            appt.mark_paid_offline(&doctor()),
            Err(TransitionError::Cancelled)
        );
    }

    #[test]
    fn test_offline_payment_is_once_only() {
        let mut appt = appointment();
        appt.mark_paid_offline(&doctor()).unwrap();
        assert_eq!(appt.payment_status, PaymentStatus::Paid);
        assert_eq!(
            appt.mark_paid_offline(&doctor()),
            Err(TransitionError::AlreadyPaid)
        );
    }

    #[test]
    fn test_slot_bucket_granularity() {
        let a = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2025, 6, 1, 10, 29, 59).unwrap();
        let c = Utc.with_ymd_and_hms(2025, 6, 1, 10, 30, 0).unwrap();
        assert_eq!(slot_bucket_for(a), slot_bucket_for(b));
        assert_ne!(slot_bucket_for(a), slot_bucket_for(c));
    }
}
