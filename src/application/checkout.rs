use super::gateway_client::GatewayClient;
use super::request_builder::RequestBuilder;
use crate::config::GatewayConfig;
use crate::domain::event::LogEvent;
use crate::domain::gateway::GatewayOrderId;
use crate::domain::ports::{EventLoggerRef, OrderSystemRef};
use crate::error::{GatewayError, Result};
use reqwest::Url;
use serde_json::json;
use std::sync::Arc;

/// Registration entry point: turns the current checkout into a payment page URL.
#[derive(Clone)]
pub struct PaymentLinkService {
    config: Arc<GatewayConfig>,
    orders: OrderSystemRef,
    builder: RequestBuilder,
    client: GatewayClient,
    logger: EventLoggerRef,
}

impl PaymentLinkService {
    pub fn new(
        config: Arc<GatewayConfig>,
        orders: OrderSystemRef,
        builder: RequestBuilder,
        client: GatewayClient,
        logger: EventLoggerRef,
    ) -> Self {
        Self {
            config,
            orders,
            builder,
            client,
            logger,
        }
    }

    /// Warning to show next to the payment method when it cannot work.
    pub fn setup_warning(&self) -> Option<&'static str> {
        self.config.setup_warning()
    }

    /// Returns the payment page for the current order, or `None` when no link could
    /// be obtained. Every failure is logged exactly once; callers should show a
    /// generic error.
    pub async fn payment_link(&self) -> Option<Url> {
        match self.try_payment_link().await {
            Ok(url) => Some(url),
            Err(e) => {
                if !e.reported_by_client() {
                    self.logger
                        .record(LogEvent::error(format!("payment link is not received: {e}")));
                }
                None
            }
        }
    }

    async fn try_payment_link(&self) -> Result<Url> {
        self.config.require_credentials()?;

        let order = self.orders.current_order().await?;
        let payment = self
            .orders
            .create_payment(order.id, order.outstanding())
            .await
            .map_err(|e| {
                GatewayError::Collaborator(format!(
                    "failed to create payment for order {}: {e}",
                    order.id
                ))
            })?;
        let cart = self.orders.current_cart().await?;

        let request = self.builder.build(&order, &payment, &cart)?;
        if request.order_bundle.is_none() && self.config.debug {
            self.logger.record(
                LogEvent::warning("customer contacts not found in order")
                    .with_context(json!({ "order": order })),
            );
        }

        let response = self.client.register(&request).await?;

        if let Some(gateway_order_id) = response.order_id.as_deref() {
            let gateway_order_id = GatewayOrderId::parse(gateway_order_id)?;
            self.orders
                .attach_gateway_order(payment.id, &gateway_order_id)
                .await?;
        }

        let form_url = response.form_url.unwrap_or_default();
        Url::parse(&form_url)
            .map_err(|e| GatewayError::Validation(format!("invalid formUrl `{form_url}`: {e}")))
    }
}
