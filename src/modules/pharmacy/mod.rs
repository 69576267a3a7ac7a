pub mod models;
pub mod repositories;

pub use models::PharmacyOrder;
pub use repositories::PharmacyOrderRepository;
