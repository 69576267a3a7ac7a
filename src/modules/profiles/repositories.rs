use sqlx::MySqlPool;

use crate::core::Result;
use crate::modules::profiles::models::{DoctorProfile, PatientProfile};

#[derive(Clone)]
pub struct ProfileRepository {
    pool: MySqlPool,
}

impl ProfileRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn find_patient(&self, id: &str) -> Result<Option<PatientProfile>> {
        let profile = sqlx::query_as::<_, PatientProfile>(
            r#"
            SELECT id, date_of_birth, gender, emergency_contact, created_at, updated_at
            FROM patient_profiles
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    pub async fn find_doctor(&self, id: &str) -> Result<Option<DoctorProfile>> {
        let profile = sqlx::query_as::<_, DoctorProfile>(
            r#"
            SELECT id, department_id, consultation_fee, created_at, updated_at
            FROM doctor_profiles
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }
}
