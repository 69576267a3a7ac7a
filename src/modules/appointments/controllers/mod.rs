pub mod appointment_controller;
