use bankpay::domain::event::{LogEvent, Severity};
use bankpay::domain::money::{CurrencyCode, Money};
use bankpay::domain::order::{Order, OrderState};
use bankpay::domain::ports::{
    CurrencyConverter, CurrencyConverterRef, EventLogger, EventLoggerRef, OrderSystem,
    OrderSystemRef,
};
use bankpay::infrastructure::in_memory::{FixedRateConverter, InMemoryOrderSystem, MemoryEventLog};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

#[tokio::test]
async fn test_ports_as_trait_objects() {
    let usd = CurrencyCode::new("USD").unwrap();
    let rub = CurrencyCode::new("RUB").unwrap();

    let store = InMemoryOrderSystem::new();
    store
        .insert_order(
            Order {
                id: 1,
                amount: Money::new(dec!(10.0), usd.clone()),
                paid: Decimal::ZERO,
                email: None,
                phone: None,
                state: OrderState::New,
            },
            Vec::new(),
        )
        .await;

    let orders: OrderSystemRef = Arc::new(store);
    let converter: CurrencyConverterRef =
        Arc::new(FixedRateConverter::new().with_rate(usd.clone(), rub.clone(), dec!(90)));
    let log = MemoryEventLog::new();
    let logger: EventLoggerRef = Arc::new(log.clone());

    // Verify Send + Sync by spawning tasks
    let orders_handle = tokio::spawn(async move {
        let payment = orders
            .create_payment(1, Money::new(dec!(10.0), usd))
            .await
            .unwrap();
        orders.process_payment(&payment, dec!(10.0)).await.unwrap();
        orders.load_order(1).await.unwrap()
    });

    let converter_handle = tokio::spawn(async move {
        logger.record(LogEvent::info("converting"));
        converter
            .convert(dec!(10.0), &CurrencyCode::new("USD").unwrap(), &rub)
            .unwrap()
    });

    let order = orders_handle.await.unwrap();
    assert_eq!(order.state, OrderState::Paid);

    assert_eq!(converter_handle.await.unwrap(), dec!(900));
    assert_eq!(log.count(Severity::Info), 1);
}
