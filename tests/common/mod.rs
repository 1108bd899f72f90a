#![allow(dead_code)]

use bankpay::application::{Collaborators, PaymentGateway};
use bankpay::config::{Credentials, GatewayConfig};
use bankpay::domain::money::{CurrencyCode, Money};
use bankpay::domain::order::{CartItem, Order, OrderState, ProductRef};
use bankpay::infrastructure::in_memory::{
    FixedRateConverter, InMemoryOrderSystem, MemoryEventLog, StubTransport,
};
use bankpay::infrastructure::template::PlaceholderRenderer;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

pub const GATEWAY_ORDER_ID: &str = "70906e55-7114-41d6-8332-4609dc6590f4";

pub fn code(c: &str) -> CurrencyCode {
    CurrencyCode::new(c).unwrap()
}

pub fn order(id: u64, amount: Decimal, currency: &str) -> Order {
    Order {
        id,
        amount: Money::new(amount, code(currency)),
        paid: Decimal::ZERO,
        email: Some("buyer@example.com".to_string()),
        phone: Some("89161234567".to_string()),
        state: OrderState::New,
    }
}

pub fn cart_item(id: &str, price: Decimal, count: Decimal) -> CartItem {
    CartItem {
        id: id.to_string(),
        name: format!("Product {id}"),
        price,
        count,
        product: Some(ProductRef {
            id: 1,
            measurement: None,
        }),
    }
}

pub fn token_config() -> GatewayConfig {
    GatewayConfig {
        credentials: Some(Credentials::Token("test-token".to_string())),
        site_url: "https://shop.test/".to_string(),
        ..GatewayConfig::default()
    }
}

/// A gateway wired to in-memory collaborators, with handles to inspect them.
pub struct Harness {
    pub gateway: PaymentGateway,
    pub orders: InMemoryOrderSystem,
    pub transport: StubTransport,
    pub log: MemoryEventLog,
}

impl Harness {
    pub fn new(config: GatewayConfig) -> Self {
        let orders = InMemoryOrderSystem::new();
        let transport = StubTransport::new();
        let log = MemoryEventLog::new();
        let converter = FixedRateConverter::new().with_rate(code("USD"), code("RUB"), dec!(90));

        let gateway = PaymentGateway::new(
            config,
            Collaborators {
                orders: Arc::new(orders.clone()),
                converter: Arc::new(converter),
                renderer: Arc::new(PlaceholderRenderer),
                transport: Arc::new(transport.clone()),
                logger: Arc::new(log.clone()),
            },
        );

        Self {
            gateway,
            orders,
            transport,
            log,
        }
    }
}
