use crate::domain::order::{CartItem, Order, Payment};
use crate::error::Result;
use crate::infrastructure::in_memory::InMemoryOrderSystem;
use serde::Deserialize;
use std::io::Read;

/// An order with its cart and any payments already created for it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrderSnapshot {
    pub order: Order,
    #[serde(default)]
    pub cart: Vec<CartItem>,
    #[serde(default)]
    pub payments: Vec<Payment>,
}

impl OrderSnapshot {
    /// Loads the snapshot into an in-memory order subsystem, making its order current.
    pub async fn into_order_system(self) -> InMemoryOrderSystem {
        let orders = InMemoryOrderSystem::new();
        orders.insert_order(self.order, self.cart).await;
        for payment in self.payments {
            orders.insert_payment(payment).await;
        }
        orders
    }
}

/// Reads an [`OrderSnapshot`] from any JSON source (file, stdin).
pub struct SnapshotReader<R: Read> {
    source: R,
}

impl<R: Read> SnapshotReader<R> {
    pub fn new(source: R) -> Self {
        Self { source }
    }

    pub fn read(self) -> Result<OrderSnapshot> {
        Ok(serde_json::from_reader(self.source)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::OrderSystem;
    use rust_decimal_macros::dec;

    const SNAPSHOT: &str = r#"{
        "order": {
            "id": 42,
            "amount": {"amount": 1500.00, "currency": "USD"},
            "email": "buyer@example.com"
        },
        "cart": [
            {"id": "tea-1", "name": "Green tea", "price": 500, "count": 3,
             "product": {"id": 1, "measurement": "box"}}
        ],
        "payments": [
            {"id": 3, "order_id": 42, "hash": "abc",
             "amount": {"amount": "1500.00", "currency": "USD"}}
        ]
    }"#;

    #[test]
    fn test_reader_valid_snapshot() {
        let snapshot = SnapshotReader::new(SNAPSHOT.as_bytes()).read().unwrap();
        assert_eq!(snapshot.order.id, 42);
        assert_eq!(snapshot.cart[0].total().unwrap(), dec!(1500));
        assert_eq!(snapshot.payments[0].hash, "abc");
    }

    #[test]
    fn test_reader_malformed_snapshot() {
        let result = SnapshotReader::new(r#"{"order": {"id": "x"}}"#.as_bytes()).read();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_snapshot_into_order_system() {
        let snapshot = SnapshotReader::new(SNAPSHOT.as_bytes()).read().unwrap();
        let orders = snapshot.into_order_system().await;

        assert_eq!(orders.current_order().await.unwrap().id, 42);
        assert_eq!(orders.current_cart().await.unwrap().len(), 1);
        assert_eq!(orders.load_payment(3).await.unwrap().order_id, 42);

        let next = orders
            .create_payment(42, orders.current_order().await.unwrap().outstanding())
            .await
            .unwrap();
        assert_eq!(next.id, 4);
    }
}
