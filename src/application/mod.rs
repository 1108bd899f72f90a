//! Application layer: the registration and callback flows built on the domain ports.
//!
//! [`PaymentGateway`] wires one [`GatewayConfig`] and one set of collaborators into
//! both entry points so they share endpoints, credentials and currency rules.

pub mod checkout;
pub mod gateway_client;
pub mod reconciler;
pub mod request_builder;

use crate::config::GatewayConfig;
use crate::domain::ports::{
    CurrencyConverterRef, EventLoggerRef, HttpTransportRef, OrderSystemRef, TemplateRendererRef,
};
use checkout::PaymentLinkService;
use gateway_client::GatewayClient;
use reconciler::CallbackReconciler;
use request_builder::RequestBuilder;
use std::sync::Arc;

/// The collaborators the adapter consumes.
#[derive(Clone)]
pub struct Collaborators {
    pub orders: OrderSystemRef,
    pub converter: CurrencyConverterRef,
    pub renderer: TemplateRendererRef,
    pub transport: HttpTransportRef,
    pub logger: EventLoggerRef,
}

#[derive(Clone)]
pub struct PaymentGateway {
    pub links: PaymentLinkService,
    pub callbacks: CallbackReconciler,
}

impl PaymentGateway {
    pub fn new(config: GatewayConfig, deps: Collaborators) -> Self {
        let config = Arc::new(config);
        let client = GatewayClient::new(config.clone(), deps.transport, deps.logger.clone());
        let builder = RequestBuilder::new(config.clone(), deps.converter.clone(), deps.renderer);

        let links = PaymentLinkService::new(
            config.clone(),
            deps.orders.clone(),
            builder,
            client.clone(),
            deps.logger.clone(),
        );
        let callbacks =
            CallbackReconciler::new(config, client, deps.orders, deps.converter, deps.logger);

        Self { links, callbacks }
    }
}
