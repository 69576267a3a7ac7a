//! Medicore Hospital Scheduling & Billing Core
//!
//! The appointment lifecycle, invoice ledger, and payment-settlement
//! workflow behind a hospital management system. Authentication, catalog
//! CRUD, and page rendering live in external collaborators.

pub mod config;
pub mod core;
pub mod modules;

// Re-export commonly used types
pub use modules::appointments;
pub use modules::billing;
pub use modules::gateways;
