pub mod services;

pub use services::{PaymentGateway, RazorpayClient, WebhookEvent};
