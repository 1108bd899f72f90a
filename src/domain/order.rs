use super::gateway::GatewayOrderId;
use super::money::{CurrencyCode, Money};
use crate::error::{GatewayError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type OrderId = u64;
pub type PaymentId = u64;

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    #[default]
    New,
    PartiallyPaid,
    Paid,
    Cancelled,
}

/// An order as seen by the payment adapter.
///
/// The order subsystem owns it; the adapter only reads it and asks the subsystem to
/// credit payments against it.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Order {
    pub id: OrderId,
    /// Full order amount in the order's own currency.
    pub amount: Money,
    /// Sum of settled payments, in the order's currency.
    #[serde(default)]
    pub paid: Decimal,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub state: OrderState,
}

impl Order {
    pub fn currency(&self) -> &CurrencyCode {
        &self.amount.currency
    }

    /// The amount still to be paid, never below zero.
    pub fn outstanding(&self) -> Money {
        let remaining = (self.amount.amount - self.paid).max(Decimal::ZERO);
        Money::new(remaining, self.amount.currency.clone())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Settled,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    /// Correlation hash handed to the payer through the return URL.
    pub hash: String,
    pub amount: Money,
    /// Transaction id assigned by the gateway at registration. Written once.
    #[serde(default)]
    pub gateway_order_id: Option<GatewayOrderId>,
    #[serde(default)]
    pub status: PaymentStatus,
}

/// Catalog data attached to cart rows that are real products.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ProductRef {
    pub id: u64,
    /// Unit-of-measure label from the catalog (e.g. "kg").
    #[serde(default)]
    pub measurement: Option<String>,
}

/// One cart row, snapshotted when the registration request is built.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct CartItem {
    /// Item code reported to the gateway.
    pub id: String,
    pub name: String,
    /// Unit price in the order's currency.
    pub price: Decimal,
    pub count: Decimal,
    /// `None` for rows that are not catalog products (delivery, fees).
    #[serde(default)]
    pub product: Option<ProductRef>,
}

impl CartItem {
    pub fn total(&self) -> Result<Decimal> {
        self.price.checked_mul(self.count).ok_or_else(|| {
            GatewayError::Validation(format!("total of cart item `{}` is out of range", self.id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order(amount: Decimal, paid: Decimal) -> Order {
        Order {
            id: 1,
            amount: Money::new(amount, CurrencyCode::new("RUB").unwrap()),
            paid,
            email: None,
            phone: None,
            state: OrderState::New,
        }
    }

    #[test]
    fn test_outstanding_amount() {
        assert_eq!(order(dec!(100), dec!(30)).outstanding().amount, dec!(70));
        assert_eq!(order(dec!(100), dec!(130)).outstanding().amount, Decimal::ZERO);
    }

    #[test]
    fn test_cart_item_total() {
        let item = CartItem {
            id: "sku-1".to_string(),
            name: "Tea".to_string(),
            price: dec!(2.50),
            count: dec!(3),
            product: None,
        };
        assert_eq!(item.total().unwrap(), dec!(7.50));

        let huge = CartItem {
            price: Decimal::from(1_000_000_000_i64),
            count: Decimal::from_i128_with_scale(100_000_000_000_000_000_000, 0),
            ..item
        };
        assert!(matches!(huge.total(), Err(GatewayError::Validation(_))));
    }

    #[test]
    fn test_order_deserialization_defaults() {
        let json = r#"{"id": 42, "amount": {"amount": 1500.00, "currency": "USD"}}"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.id, 42);
        assert_eq!(order.state, OrderState::New);
        assert_eq!(order.paid, Decimal::ZERO);
        assert!(order.email.is_none());
    }
}
