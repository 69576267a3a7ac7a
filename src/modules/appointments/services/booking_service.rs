// Booking orchestration: the entry point patient-facing controllers call.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

use crate::core::{Actor, AppError, Clock, Result};
use crate::modules::appointments::models::Appointment;
use crate::modules::appointments::repositories::AppointmentRepository;
use crate::modules::appointments::services::AvailabilityChecker;
use crate::modules::profiles::ProfileRepository;

#[derive(Debug, Clone, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_id: String,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub reason: String,
}

pub struct BookingService {
    appointments: AppointmentRepository,
    profiles: ProfileRepository,
    availability: AvailabilityChecker,
    clock: Arc<dyn Clock>,
}

impl BookingService {
    pub fn new(
        appointments: AppointmentRepository,
        profiles: ProfileRepository,
        availability: AvailabilityChecker,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            appointments,
            profiles,
            availability,
            clock,
        }
    }

    /// Book a pending, unpaid appointment for the requesting patient.
    ///
    /// The availability check is advisory; the (doctor_id, slot_bucket)
    /// unique key closes the remaining race at insert time, and a
    /// duplicate-key failure surfaces as the same slot-unavailable message.
    pub async fn book_appointment(
        &self,
        actor: &Actor,
        request: BookAppointmentRequest,
    ) -> Result<Appointment> {
        let patient_id = actor
            .patient_id()
            .ok_or_else(|| AppError::forbidden("Only patients can book appointments"))?;

        let patient = self
            .profiles
            .find_patient(patient_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Patient profile '{}'", patient_id)))?;

        if !patient.is_profile_complete() {
            return Err(AppError::validation(
                "Please complete your profile (date of birth, gender, and \
                 emergency contact) before booking an appointment.",
            ));
        }

        let doctor = self
            .profiles
            .find_doctor(&request.doctor_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Doctor '{}'", request.doctor_id)))?;

        self.availability
            .check(&doctor.id, request.scheduled_at, None)
            .await?;

        let appointment = Appointment::new(
            patient.id,
            doctor.id,
            doctor.department_id,
            request.scheduled_at,
            request.reason,
            self.clock.now(),
        );

        self.appointments.create(&appointment).await?;

        info!(
            appointment_id = %appointment.id,
            doctor_id = %appointment.doctor_id,
            scheduled_at = %appointment.scheduled_at,
            "Appointment booked"
        );

        Ok(appointment)
    }
}
