// Minimal patient/doctor reference data.
//
// Identity and the rest of the profile live in the external accounts
// system; this service only reads the fields the booking and billing
// rules depend on.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PatientProfile {
    pub id: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub emergency_contact: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PatientProfile {
    /// Booking requires date of birth, gender, and an emergency contact.
    pub fn is_profile_complete(&self) -> bool {
        self.date_of_birth.is_some()
            && self.gender.as_deref().is_some_and(|g| !g.trim().is_empty())
            && self
                .emergency_contact
                .as_deref()
                .is_some_and(|c| !c.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DoctorProfile {
    pub id: String,
    pub department_id: Option<String>,
    /// Snapshotted onto invoices at creation; later fee changes never
    /// reprice an existing invoice
    pub consultation_fee: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
