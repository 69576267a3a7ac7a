pub mod appointment_service;
pub mod availability;
pub mod booking_service;

pub use appointment_service::AppointmentService;
pub use availability::AvailabilityChecker;
pub use booking_service::{BookAppointmentRequest, BookingService};
