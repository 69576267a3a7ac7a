pub mod gateway_trait;
pub mod razorpay;

pub use gateway_trait::{PaymentGateway, WebhookEvent};
pub use razorpay::RazorpayClient;
