//! Order repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;

use clothify_core::{DiscountPercent, Email, OrderId, OrderStatus, UserId};

use super::RepositoryError;
use crate::models::{CartLine, CustomerInfo, NewOrder, Order};

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: i32,
    user_email: String,
    items: Json<Vec<CartLine>>,
    subtotal: Decimal,
    discount_percent: i16,
    promo_code: Option<String>,
    total: Decimal,
    currency: String,
    customer_name: String,
    customer_address: String,
    customer_phone: String,
    payment_id: String,
    gateway_order_id: String,
    signature: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let user_email = Email::parse(&row.user_email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let discount_percent = DiscountPercent::new(i64::from(row.discount_percent))
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
        let currency = row
            .currency
            .parse()
            .map_err(|e: clothify_core::PriceError| RepositoryError::DataCorruption(e.to_string()))?;
        let status = row
            .status
            .parse::<OrderStatus>()
            .map_err(RepositoryError::DataCorruption)?;

        Ok(Self {
            id: OrderId::new(row.id),
            user_id: UserId::new(row.user_id),
            user_email,
            items: row.items.0,
            subtotal: row.subtotal,
            discount_percent,
            promo_code: row.promo_code,
            total: row.total,
            currency,
            customer: CustomerInfo {
                name: row.customer_name,
                address: row.customer_address,
                phone: row.customer_phone,
            },
            payment_id: row.payment_id,
            gateway_order_id: row.gateway_order_id,
            signature: row.signature,
            status,
            created_at: row.created_at,
        })
    }
}

const ORDER_COLUMNS: &str = r"
    id, user_id, user_email, items, subtotal, discount_percent, promo_code, total,
    currency, customer_name, customer_address, customer_phone,
    payment_id, gateway_order_id, signature, status, created_at
";

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record a paid order.
    ///
    /// Keyed on the gateway payment id: recording the same payment twice
    /// returns the existing order instead of inserting a duplicate.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            INSERT INTO orders (
                user_id, user_email, items, subtotal, discount_percent, promo_code, total,
                currency, customer_name, customer_address, customer_phone,
                payment_id, gateway_order_id, signature, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (payment_id) DO UPDATE SET payment_id = EXCLUDED.payment_id
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(order.user_id)
        .bind(order.user_email.as_str())
        .bind(Json(&order.items))
        .bind(order.subtotal)
        .bind(i16::from(order.discount_percent.get()))
        .bind(order.promo_code.as_deref())
        .bind(order.total)
        .bind(order.currency.code())
        .bind(&order.customer.name)
        .bind(&order.customer.address)
        .bind(&order.customer.phone)
        .bind(&order.payment_id)
        .bind(&order.gateway_order_id)
        .bind(&order.signature)
        .bind(order.status.as_str())
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    /// Orders placed by one user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Every order, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}
