// Minimal pharmacy order surface.
//
// Cart management and fulfilment are external; billing only needs the
// snapshot amount and the paid flag the settlement cascade flips.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PharmacyOrder {
    pub id: String,
    pub patient_id: String,
    pub total_amount: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PharmacyOrder {
    pub fn is_paid(&self) -> bool {
        self.status == "paid"
    }
}
