// Slot availability checking.
//
// Purely advisory: a positive answer does not reserve anything. The caller
// inserts promptly, and the (doctor_id, slot_bucket) unique key in the
// appointments table backstops the remaining check-then-insert window.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::core::{AppError, Clock, Result};
use crate::modules::appointments::models::SLOT_MINUTES;
use crate::modules::appointments::repositories::AppointmentRepository;

/// True when an existing appointment's slot collides with a candidate
/// start: the existing start falls within one slot width on either side,
/// half-open on the right. With fixed 30-minute slots this catches every
/// overlapping window.
pub fn slots_conflict(existing_start: DateTime<Utc>, candidate_start: DateTime<Utc>) -> bool {
    let width = Duration::minutes(SLOT_MINUTES);
    existing_start < candidate_start + width && existing_start >= candidate_start - width
}

pub struct AvailabilityChecker {
    appointments: AppointmentRepository,
    clock: Arc<dyn Clock>,
}

impl AvailabilityChecker {
    pub fn new(appointments: AppointmentRepository, clock: Arc<dyn Clock>) -> Self {
        Self {
            appointments,
            clock,
        }
    }

    /// Decide whether `candidate_start` is bookable for the doctor.
    ///
    /// `exclude_appointment` removes one appointment from the conflict set,
    /// for re-validating an appointment against itself.
    pub async fn check(
        &self,
        doctor_id: &str,
        candidate_start: DateTime<Utc>,
        exclude_appointment: Option<&str>,
    ) -> Result<()> {
        if candidate_start < self.clock.now() {
            return Err(AppError::validation("Cannot book appointments in the past."));
        }

        let width = Duration::minutes(SLOT_MINUTES);
        let conflicts = self
            .appointments
            .count_conflicts(
                doctor_id,
                candidate_start - width,
                candidate_start + width,
                exclude_appointment,
            )
            .await?;

        if conflicts > 0 {
            return Err(AppError::validation("This time slot is not available."));
        }

        Ok(())
    }
}
