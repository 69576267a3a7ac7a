pub mod appointment;

pub use appointment::{
    slot_bucket_for, Appointment, AppointmentStatus, PaymentStatus, SLOT_MINUTES,
};
