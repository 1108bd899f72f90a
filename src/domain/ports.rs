use super::event::LogEvent;
use super::gateway::GatewayOrderId;
use super::money::{CurrencyCode, Money};
use super::order::{CartItem, Order, OrderId, Payment, PaymentId};
use crate::error::Result;
use async_trait::async_trait;
use reqwest::Url;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The order subsystem that owns orders, carts and payments.
///
/// Implementations must make `process_payment` idempotent per payment: crediting an
/// already settled payment is a no-op, and a failed credit leaves order and payment
/// untouched.
#[async_trait]
pub trait OrderSystem: Send + Sync {
    /// The order currently being checked out.
    async fn current_order(&self) -> Result<Order>;
    /// Cart rows of the order currently being checked out.
    async fn current_cart(&self) -> Result<Vec<CartItem>>;
    async fn create_payment(&self, order_id: OrderId, amount: Money) -> Result<Payment>;
    /// Records the gateway transaction id on a payment. Write-once.
    async fn attach_gateway_order(
        &self,
        payment_id: PaymentId,
        gateway_order_id: &GatewayOrderId,
    ) -> Result<()>;
    async fn load_payment(&self, payment_id: PaymentId) -> Result<Payment>;
    async fn load_order(&self, order_id: OrderId) -> Result<Order>;
    /// Credits `amount` (in the order's currency) to the payment's order.
    async fn process_payment(&self, payment: &Payment, amount: Decimal) -> Result<()>;
}

pub trait CurrencyConverter: Send + Sync {
    fn convert(&self, amount: Decimal, from: &CurrencyCode, to: &CurrencyCode) -> Result<Decimal>;
}

/// Key/value settings lookup. Missing keys and empty values are equivalent.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template: &str, variables: &BTreeMap<&str, String>) -> Result<String>;
}

pub trait EventLogger: Send + Sync {
    fn record(&self, event: LogEvent);
}

/// Raw HTTP response as seen by the gateway client.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// POSTs `fields` as an url-encoded form.
    async fn post_form(&self, url: &Url, fields: &[(String, String)]) -> Result<HttpResponse>;
}

pub type OrderSystemRef = Arc<dyn OrderSystem>;
pub type CurrencyConverterRef = Arc<dyn CurrencyConverter>;
pub type TemplateRendererRef = Arc<dyn TemplateRenderer>;
pub type EventLoggerRef = Arc<dyn EventLogger>;
pub type HttpTransportRef = Arc<dyn HttpTransport>;
