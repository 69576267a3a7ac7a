// Invoice settlement: idempotence, minor-unit conversion, and webhook
// event classification.

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use medicore::config::GatewayConfig;
use medicore::modules::appointments::models::Appointment;
use medicore::modules::billing::models::{Invoice, InvoiceStatus};
use medicore::modules::gateways::{PaymentGateway, RazorpayClient, WebhookEvent};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

fn invoice(amount: Decimal) -> Invoice {
    let appt = Appointment::new(
        "patient-1".to_string(),
        "dr-a".to_string(),
        None,
        Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap(),
        String::new(),
        now(),
    );
    Invoice::for_appointment(&appt, amount, now())
}

fn gateway() -> RazorpayClient {
    RazorpayClient::new(&GatewayConfig {
        key_id: "rzp_test_key".to_string(),
        key_secret: "test_secret".to_string(),
        base_url: "https://api.razorpay.com".to_string(),
        timeout_secs: 15,
    })
    .unwrap()
}

#[test]
fn test_settle_twice_pays_exactly_once() {
    let mut invoice = invoice(dec!(750.00));
    assert_eq!(invoice.status, InvoiceStatus::Unpaid);

    assert!(invoice.settle("pay_42", Some("sig"), now()));
    assert_eq!(invoice.status, InvoiceStatus::Paid);
    let paid_at = invoice.paid_at;
    assert!(paid_at.is_some());

    // Second delivery of the same event is a no-op, paid_at untouched
    let later = now() + chrono::Duration::minutes(3);
    assert!(!invoice.settle("pay_42", Some("sig"), later));
    assert_eq!(invoice.paid_at, paid_at);
}

#[test]
fn test_settle_from_webhook_then_callback() {
    // Webhook first (no signature), callback second: callback is a no-op
    // and does not overwrite anything.
    let mut invoice = invoice(dec!(300.00));
    assert!(invoice.settle("pay_1", None, now()));
    assert!(invoice.gateway_signature.is_none());

    assert!(!invoice.settle("pay_1", Some("sig_from_callback"), now()));
    assert!(invoice.gateway_signature.is_none());
}

#[test]
fn test_minor_units_are_exact_for_round_amounts() {
    assert_eq!(invoice(dec!(500.00)).amount_in_paise().unwrap(), 50_000);
    assert_eq!(invoice(dec!(0.50)).amount_in_paise().unwrap(), 50);
    assert_eq!(invoice(dec!(1234.56)).amount_in_paise().unwrap(), 123_456);
}

proptest! {
    // Any two-decimal amount converts to paise without drift.
    #[test]
    fn prop_paise_round_trips(minor in 0i64..1_000_000_000i64) {
        let amount = Decimal::new(minor, 2);
        prop_assert_eq!(invoice(amount).amount_in_paise().unwrap(), minor);
    }
}

#[test]
fn test_webhook_capture_extracts_correlation_ids() {
    let body = serde_json::json!({
        "event": "payment.captured",
        "payload": {
            "payment": {
                "entity": {
                    "id": "pay_MnOp",
                    "order_id": "order_QrSt",
                    "amount": 50000,
                    "currency": "INR",
                    "status": "captured"
                }
            }
        }
    })
    .to_string();

    let event = gateway().parse_webhook(&body).unwrap();
    assert_eq!(
        event,
        WebhookEvent::PaymentCaptured {
            gateway_order_id: "order_QrSt".to_string(),
            gateway_payment_id: "pay_MnOp".to_string(),
        }
    );
}

#[test]
fn test_non_capture_events_are_acknowledged_not_acted_on() {
    for event_type in ["payment.failed", "order.paid", "refund.processed"] {
        let body = format!(r#"{{"event": "{}", "payload": {{}}}}"#, event_type);
        let event = gateway().parse_webhook(&body).unwrap();
        assert_eq!(
            event,
            WebhookEvent::Ignored {
                event: event_type.to_string()
            }
        );
    }
}

#[test]
fn test_unparseable_webhook_is_rejected() {
    assert!(gateway().parse_webhook("{\"event\":").is_err());
    assert!(gateway().parse_webhook("").is_err());
}
