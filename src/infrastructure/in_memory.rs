use crate::domain::event::{LogEvent, Severity};
use crate::domain::gateway::GatewayOrderId;
use crate::domain::money::{CurrencyCode, Money};
use crate::domain::order::{
    CartItem, Order, OrderId, OrderState, Payment, PaymentId, PaymentStatus,
};
use crate::domain::ports::{
    CurrencyConverter, EventLogger, HttpResponse, HttpTransport, OrderSystem,
};
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use reqwest::Url;
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
struct OrderBook {
    orders: HashMap<OrderId, Order>,
    carts: HashMap<OrderId, Vec<CartItem>>,
    payments: HashMap<PaymentId, Payment>,
    current: Option<OrderId>,
    next_payment_id: PaymentId,
}

/// A thread-safe in-memory order subsystem.
///
/// All mutations happen under one write lock, which gives `process_payment` its
/// all-or-nothing and settle-once guarantees. Ideal for tests and the CLI.
#[derive(Default, Clone)]
pub struct InMemoryOrderSystem {
    book: Arc<RwLock<OrderBook>>,
}

impl InMemoryOrderSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an order with its cart and makes it the current checkout.
    pub async fn insert_order(&self, order: Order, cart: Vec<CartItem>) {
        let mut book = self.book.write().await;
        book.current = Some(order.id);
        book.carts.insert(order.id, cart);
        book.orders.insert(order.id, order);
    }

    pub async fn insert_payment(&self, payment: Payment) {
        let mut book = self.book.write().await;
        book.next_payment_id = book.next_payment_id.max(payment.id);
        book.payments.insert(payment.id, payment);
    }

    pub async fn payments_for(&self, order_id: OrderId) -> Vec<Payment> {
        let book = self.book.read().await;
        let mut payments: Vec<Payment> = book
            .payments
            .values()
            .filter(|p| p.order_id == order_id)
            .cloned()
            .collect();
        payments.sort_by_key(|p| p.id);
        payments
    }
}

#[async_trait]
impl OrderSystem for InMemoryOrderSystem {
    async fn current_order(&self) -> Result<Order> {
        let book = self.book.read().await;
        book.current
            .and_then(|id| book.orders.get(&id))
            .cloned()
            .ok_or_else(|| GatewayError::NotFound("current order".to_string()))
    }

    async fn current_cart(&self) -> Result<Vec<CartItem>> {
        let book = self.book.read().await;
        let id = book
            .current
            .ok_or_else(|| GatewayError::NotFound("current order".to_string()))?;
        Ok(book.carts.get(&id).cloned().unwrap_or_default())
    }

    async fn create_payment(&self, order_id: OrderId, amount: Money) -> Result<Payment> {
        let mut book = self.book.write().await;
        if !book.orders.contains_key(&order_id) {
            return Err(GatewayError::NotFound(format!("order {order_id}")));
        }
        book.next_payment_id += 1;
        let payment = Payment {
            id: book.next_payment_id,
            order_id,
            hash: Uuid::new_v4().simple().to_string(),
            amount,
            gateway_order_id: None,
            status: PaymentStatus::Pending,
        };
        book.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn attach_gateway_order(
        &self,
        payment_id: PaymentId,
        gateway_order_id: &GatewayOrderId,
    ) -> Result<()> {
        let mut book = self.book.write().await;
        let payment = book
            .payments
            .get_mut(&payment_id)
            .ok_or_else(|| GatewayError::NotFound(format!("payment {payment_id}")))?;
        match &payment.gateway_order_id {
            Some(existing) if existing != gateway_order_id => {
                Err(GatewayError::Collaborator(format!(
                    "payment {payment_id} is already registered as {existing}"
                )))
            }
            Some(_) => Ok(()),
            None => {
                payment.gateway_order_id = Some(gateway_order_id.clone());
                Ok(())
            }
        }
    }

    async fn load_payment(&self, payment_id: PaymentId) -> Result<Payment> {
        let book = self.book.read().await;
        book.payments
            .get(&payment_id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("payment {payment_id}")))
    }

    async fn load_order(&self, order_id: OrderId) -> Result<Order> {
        let book = self.book.read().await;
        book.orders
            .get(&order_id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("order {order_id}")))
    }

    async fn process_payment(&self, payment: &Payment, amount: Decimal) -> Result<()> {
        let mut book = self.book.write().await;

        let status = book
            .payments
            .get(&payment.id)
            .map(|p| p.status)
            .ok_or_else(|| GatewayError::NotFound(format!("payment {}", payment.id)))?;
        // Duplicate callbacks land here; the first credit stands.
        if status == PaymentStatus::Settled {
            return Ok(());
        }
        if !book.orders.contains_key(&payment.order_id) {
            return Err(GatewayError::NotFound(format!("order {}", payment.order_id)));
        }

        if let Some(order) = book.orders.get_mut(&payment.order_id) {
            order.paid += amount;
            order.state = if order.paid >= order.amount.amount {
                OrderState::Paid
            } else {
                OrderState::PartiallyPaid
            };
        }
        if let Some(stored) = book.payments.get_mut(&payment.id) {
            stored.status = PaymentStatus::Settled;
        }
        Ok(())
    }
}

/// Converts with fixed rates. The inverse of every registered rate is derived.
#[derive(Debug, Default, Clone)]
pub struct FixedRateConverter {
    rates: HashMap<(CurrencyCode, CurrencyCode), Decimal>,
}

impl FixedRateConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `1 from = rate to`.
    pub fn with_rate(mut self, from: CurrencyCode, to: CurrencyCode, rate: Decimal) -> Self {
        self.rates.insert((from, to), rate);
        self
    }
}

impl CurrencyConverter for FixedRateConverter {
    fn convert(&self, amount: Decimal, from: &CurrencyCode, to: &CurrencyCode) -> Result<Decimal> {
        if from == to {
            return Ok(amount);
        }
        let converted = if let Some(rate) = self.rates.get(&(from.clone(), to.clone())) {
            amount.checked_mul(*rate)
        } else {
            match self.rates.get(&(to.clone(), from.clone())) {
                Some(rate) if !rate.is_zero() => amount.checked_div(*rate),
                _ => return Err(GatewayError::Conversion(format!("no rate for {from} -> {to}"))),
            }
        };
        converted.ok_or_else(|| {
            GatewayError::Conversion(format!("{amount} {from} -> {to} is out of range"))
        })
    }
}

/// Keeps every recorded event in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryEventLog {
    events: Arc<Mutex<Vec<LogEvent>>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LogEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.events()
            .iter()
            .filter(|e| e.severity == severity)
            .count()
    }
}

impl EventLogger for MemoryEventLog {
    fn record(&self, event: LogEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

/// A request captured by [`StubTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub url: Url,
    pub fields: Vec<(String, String)>,
}

impl RecordedRequest {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP transport that replays scripted responses and records requests.
#[derive(Debug, Default, Clone)]
pub struct StubTransport {
    responses: Arc<Mutex<VecDeque<Result<HttpResponse>>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, status: u16, body: impl Into<String>) -> &Self {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Ok(HttpResponse {
                status,
                body: body.into(),
            }));
        self
    }

    pub fn push_json(&self, body: serde_json::Value) -> &Self {
        self.push_response(200, body.to_string())
    }

    pub fn push_failure(&self, message: impl Into<String>) -> &Self {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Err(GatewayError::Transport(message.into())));
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl HttpTransport for StubTransport {
    async fn post_form(&self, url: &Url, fields: &[(String, String)]) -> Result<HttpResponse> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedRequest {
                url: url.clone(),
                fields: fields.to_vec(),
            });
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::Transport("no scripted response".to_string())))
    }
}
