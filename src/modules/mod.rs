pub mod appointments;
pub mod billing;
pub mod gateways;
pub mod pharmacy;
pub mod profiles;
