//! Applies gateway callbacks to payments.

use super::gateway_client::GatewayClient;
use crate::config::GatewayConfig;
use crate::domain::callback::{
    CallbackRequest, ORDER_ID_PARAM, PAYMENT_HASH_PARAM, PAYMENT_ID_PARAM, ReconciliationOutcome,
};
use crate::domain::event::LogEvent;
use crate::domain::gateway::{GatewayOrderId, OrderStatusResponse};
use crate::domain::money::MinorUnits;
use crate::domain::order::PaymentId;
use crate::domain::ports::{CurrencyConverterRef, EventLoggerRef, OrderSystemRef};
use crate::error::{GatewayError, Result};
use reqwest::Url;
use serde_json::json;
use std::sync::Arc;

/// Handles the gateway's asynchronous payment notifications.
///
/// Each callback is independent: the reconciler keeps no state between calls and
/// relies on the order subsystem to ignore duplicate credits.
#[derive(Clone)]
pub struct CallbackReconciler {
    config: Arc<GatewayConfig>,
    client: GatewayClient,
    orders: OrderSystemRef,
    converter: CurrencyConverterRef,
    logger: EventLoggerRef,
}

impl CallbackReconciler {
    pub fn new(
        config: Arc<GatewayConfig>,
        client: GatewayClient,
        orders: OrderSystemRef,
        converter: CurrencyConverterRef,
        logger: EventLoggerRef,
    ) -> Self {
        Self {
            config,
            client,
            orders,
            converter,
            logger,
        }
    }

    pub async fn handle_callback(&self, request: &CallbackRequest) -> ReconciliationOutcome {
        let gateway_order_id = match request
            .text(ORDER_ID_PARAM)
            .ok_or_else(|| GatewayError::Validation(format!("missing {ORDER_ID_PARAM}")))
            .and_then(GatewayOrderId::parse)
        {
            Ok(id) => id,
            Err(e) => return self.reject(e.to_string()),
        };

        let status = match self.client.order_status(&gateway_order_id).await {
            Ok(status) => status,
            Err(e) => {
                if !e.reported_by_client() {
                    self.logger.record(
                        LogEvent::error(format!("order status request failed: {e}"))
                            .with_context(json!({ "orderId": gateway_order_id.as_str() })),
                    );
                }
                return ReconciliationOutcome::QueryFailed;
            }
        };

        if status.has_error() || !self.is_accepted(&status) {
            return ReconciliationOutcome::Pending {
                status: status.status(),
            };
        }

        let (Some(payment_id), Some(payment_hash)) = (
            request.non_empty(PAYMENT_ID_PARAM),
            request.non_empty(PAYMENT_HASH_PARAM),
        ) else {
            return self.reject(format!("missing {PAYMENT_ID_PARAM} or {PAYMENT_HASH_PARAM}"));
        };

        match self
            .apply(&gateway_order_id, payment_id, payment_hash, &status)
            .await
        {
            Ok(redirect) => ReconciliationOutcome::Confirmed {
                payment_hash: payment_hash.to_string(),
                redirect,
            },
            Err(e) => {
                self.logger.record(
                    LogEvent::error(format!("payment process failed: {e}")).with_context(json!({
                        "orderId": gateway_order_id.as_str(),
                        "paymentId": payment_id,
                    })),
                );
                ReconciliationOutcome::ApplyFailed
            }
        }
    }

    fn is_accepted(&self, status: &OrderStatusResponse) -> bool {
        status
            .status()
            .is_some_and(|s| self.config.accepted_statuses.contains(&s))
    }

    async fn apply(
        &self,
        gateway_order_id: &GatewayOrderId,
        payment_id: &str,
        payment_hash: &str,
        status: &OrderStatusResponse,
    ) -> Result<Url> {
        let payment_id: PaymentId = payment_id
            .trim()
            .parse()
            .map_err(|_| GatewayError::Validation(format!("malformed payment id `{payment_id}`")))?;

        let payment = self.orders.load_payment(payment_id).await?;
        if !hashes_match(&payment.hash, payment_hash) {
            return Err(GatewayError::Validation(format!(
                "payment hash does not match payment {payment_id}"
            )));
        }
        if let Some(registered) = &payment.gateway_order_id
            && registered != gateway_order_id
        {
            return Err(GatewayError::Validation(format!(
                "payment {payment_id} is registered as {registered}, not {gateway_order_id}"
            )));
        }

        let order = self.orders.load_order(payment.order_id).await?;
        let settled = MinorUnits::new(status.amount.ok_or(GatewayError::MissingField("amount"))?)?;
        let settled_in = self.config.registration_currency(order.currency());
        let amount = if &settled_in == order.currency() {
            settled.to_major()
        } else {
            self.converter
                .convert(settled.to_major(), &settled_in, order.currency())?
        };

        self.orders.process_payment(&payment, amount).await?;
        self.config.success_url(payment_hash)
    }

    fn reject(&self, reason: String) -> ReconciliationOutcome {
        if self.config.debug {
            self.logger
                .record(LogEvent::warning(format!("callback rejected: {reason}")));
        }
        ReconciliationOutcome::Rejected { reason }
    }
}

/// Compares hashes without short-circuiting on the first differing byte.
fn hashes_match(stored: &str, given: &str) -> bool {
    stored.len() == given.len()
        && stored
            .bytes()
            .zip(given.bytes())
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashes_match() {
        assert!(hashes_match("5f2b8c7e", "5f2b8c7e"));
        assert!(!hashes_match("5f2b8c7e", "5f2b8c7f"));
        assert!(!hashes_match("5f2b8c7e", "5f2b8c7"));
        assert!(!hashes_match("", "a"));
    }
}
