//! Payment models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a gateway transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Authorized,
    Captured,
    Failed,
    Refunded,
}

string_enum!(TransactionStatus {
    Pending => "pending",
    Authorized => "authorized",
    Captured => "captured",
    Failed => "failed",
    Refunded => "refunded",
});

/// Payment record created alongside its booking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub gateway_order_id: String,
    pub gateway_payment_id: Option<String>,
    pub gateway_signature: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub status: TransactionStatus,
    pub method: Option<String>,
    pub failure_reason: Option<String>,
    pub refund_amount: i64,
    pub refunded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub gateway_order_id: String,
    pub amount: i64,
    pub currency: String,
}

/// Gateway proof that the order was paid
#[derive(Debug, Clone)]
pub struct PaymentConfirmation {
    pub gateway_payment_id: String,
    pub gateway_signature: String,
}

/// Outcome of a gateway refund
#[derive(Debug, Clone)]
pub struct RefundRecord {
    pub amount: i64,
    pub refunded_at: DateTime<Utc>,
}
