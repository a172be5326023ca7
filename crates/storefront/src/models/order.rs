//! Order types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use clothify_core::{CurrencyCode, DiscountPercent, Email, OrderId, OrderStatus, UserId};

use super::CartLine;

/// Buyer contact details collected at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub address: String,
    pub phone: String,
}

impl CustomerInfo {
    /// Trim every field, rejecting blanks.
    ///
    /// # Errors
    ///
    /// Returns a message naming the missing fields.
    pub fn validate(self) -> Result<Self, String> {
        let trimmed = Self {
            name: self.name.trim().to_string(),
            address: self.address.trim().to_string(),
            phone: self.phone.trim().to_string(),
        };

        let missing: Vec<&str> = [
            ("name", &trimmed.name),
            ("address", &trimmed.address),
            ("phone", &trimmed.phone),
        ]
        .into_iter()
        .filter(|(_, v)| v.is_empty())
        .map(|(field, _)| field)
        .collect();

        if missing.is_empty() {
            Ok(trimmed)
        } else {
            Err(format!("Please fill in: {}", missing.join(", ")))
        }
    }
}

/// An order ready to be recorded after a verified payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub user_id: UserId,
    pub user_email: Email,
    pub items: Vec<CartLine>,
    pub subtotal: Decimal,
    pub discount_percent: DiscountPercent,
    pub promo_code: Option<String>,
    pub total: Decimal,
    pub currency: CurrencyCode,
    pub customer: CustomerInfo,
    pub payment_id: String,
    pub gateway_order_id: String,
    pub signature: String,
    pub status: OrderStatus,
}

/// A recorded order.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub user_email: Email,
    pub items: Vec<CartLine>,
    pub subtotal: Decimal,
    pub discount_percent: DiscountPercent,
    pub promo_code: Option<String>,
    pub total: Decimal,
    pub currency: CurrencyCode,
    pub customer: CustomerInfo,
    pub payment_id: String,
    pub gateway_order_id: String,
    #[serde(skip_serializing)]
    pub signature: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}
