pub mod models;
pub mod repositories;

pub use models::{DoctorProfile, PatientProfile};
pub use repositories::ProfileRepository;
