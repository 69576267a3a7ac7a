// Appointment lifecycle scenarios across actors.

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal_macros::dec;

use medicore::core::{Actor, TransitionError};
use medicore::modules::appointments::models::{
    Appointment, AppointmentStatus, PaymentStatus,
};
use medicore::modules::billing::models::{Invoice, InvoiceStatus};

fn booking_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap()
}

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap()
}

fn appointment() -> Appointment {
    Appointment::new(
        "patient-1".to_string(),
        "dr-a".to_string(),
        Some("cardiology".to_string()),
        start_time(),
        "Chest pain follow-up".to_string(),
        booking_time(),
    )
}

fn dr_a() -> Actor {
    Actor::Doctor {
        profile_id: "dr-a".to_string(),
    }
}

fn patient() -> Actor {
    Actor::Patient {
        profile_id: "patient-1".to_string(),
    }
}

#[test]
fn test_patient_cannot_cancel_once_confirmed_but_doctor_can() {
    let mut appt = appointment();
    appt.confirm(&dr_a()).unwrap();

    // Patient is locked out after doctor confirmation
    assert_eq!(
        appt.cancel_by_patient(&patient(), booking_time()),
        Err(TransitionError::NotCancellable)
    );
    assert_eq!(appt.status, AppointmentStatus::Confirmed);

    // The doctor keeps the right to cancel
    assert!(appt.cancel_by_doctor(&dr_a()).is_ok());
    assert_eq!(appt.status, AppointmentStatus::Cancelled);
}

#[test]
fn test_patient_can_cancel_while_pending_and_future() {
    let mut appt = appointment();
    assert!(appt.cancel_by_patient(&patient(), booking_time()).is_ok());
    assert_eq!(appt.status, AppointmentStatus::Cancelled);
}

#[test]
fn test_full_visit_lifecycle_with_offline_payment() {
    // Patient books Dr. A for 2025-06-01T10:00
    let mut appt = appointment();
    assert_eq!(appt.status, AppointmentStatus::Pending);
    assert_eq!(appt.payment_status, PaymentStatus::Unpaid);

    // Doctor confirms
    appt.confirm(&dr_a()).unwrap();
    assert_eq!(appt.status, AppointmentStatus::Confirmed);

    // Doctor completes the visit
    appt.complete(&dr_a()).unwrap();
    assert_eq!(appt.status, AppointmentStatus::Completed);

    // Doctor takes cash at the desk
    appt.mark_paid_offline(&dr_a()).unwrap();
    assert_eq!(appt.payment_status, PaymentStatus::Paid);

    // The service writes the matching paid invoice at Dr. A's fee
    let paid_at = Utc.with_ymd_and_hms(2025, 6, 1, 10, 35, 0).unwrap();
    let invoice = Invoice::paid_offline(&appt, dec!(500.00), paid_at);
    assert_eq!(invoice.status, InvoiceStatus::Paid);
    assert_eq!(invoice.amount, dec!(500.00));
    assert_eq!(invoice.appointment_id.as_deref(), Some(appt.id.as_str()));
    assert!(invoice.gateway_order_id.is_none());
}

#[test]
fn test_mark_paid_offline_twice_is_refused() {
    let mut appt = appointment();
    appt.mark_paid_offline(&dr_a()).unwrap();

    // The second attempt fails before any invoice would be created
    assert_eq!(
        appt.mark_paid_offline(&dr_a()),
        Err(TransitionError::AlreadyPaid)
    );
    assert_eq!(appt.payment_status, PaymentStatus::Paid);
}

#[test]
fn test_complete_requires_confirmation_first() {
    let mut appt = appointment();
    assert_eq!(appt.complete(&dr_a()), Err(TransitionError::NotConfirmed));
}

#[test]
fn test_no_show_branch_is_terminal() {
    let mut appt = appointment();
    appt.confirm(&dr_a()).unwrap();
    appt.mark_no_show(&dr_a()).unwrap();
    assert_eq!(appt.status, AppointmentStatus::NoShow);
    assert!(appt.status.is_terminal());
    assert_eq!(
        appt.cancel_by_admin(&Actor::Admin),
        Err(TransitionError::AlreadyTerminal)
    );
}

#[test]
fn test_payment_status_survives_completion() {
    // status and payment_status evolve independently
    let mut appt = appointment();
    appt.mark_paid_offline(&dr_a()).unwrap();
    appt.confirm(&dr_a()).unwrap();
    appt.complete(&dr_a()).unwrap();
    assert_eq!(appt.status, AppointmentStatus::Completed);
    assert_eq!(appt.payment_status, PaymentStatus::Paid);
}
