//! Authenticated request/response exchange with the gateway.

use crate::config::GatewayConfig;
use crate::domain::event::LogEvent;
use crate::domain::gateway::{
    GatewayMethod, GatewayOrderId, GatewayRequest, OrderStatusResponse, RegisterResponse,
    error_code,
};
use crate::domain::ports::{EventLoggerRef, HttpTransportRef};
use crate::error::{GatewayError, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// Form fields whose values never reach the event log.
const SECRET_FIELDS: &[&str] = &["token", "password"];

#[derive(Clone)]
pub struct GatewayClient {
    config: Arc<GatewayConfig>,
    transport: HttpTransportRef,
    logger: EventLoggerRef,
}

impl GatewayClient {
    pub fn new(config: Arc<GatewayConfig>, transport: HttpTransportRef, logger: EventLoggerRef) -> Self {
        Self {
            config,
            transport,
            logger,
        }
    }

    /// Calls `method` with `params` plus the configured credentials.
    ///
    /// Returns the decoded JSON body. Failures are recorded with the event logger
    /// before they are returned; successes only in debug mode.
    pub async fn call(&self, method: GatewayMethod, params: Vec<(String, String)>) -> Result<Value> {
        let credentials = self.config.require_credentials()?;
        let url = self.config.endpoint(method)?;

        let mut fields = params;
        fields.extend(credentials.form_fields());
        let request_context = masked(&fields);

        let response = match self.transport.post_form(&url, &fields).await {
            Ok(response) => response,
            Err(e) => {
                return Err(self.fail(
                    e,
                    json!({ "url": url.as_str(), "request": request_context }),
                ));
            }
        };

        let context = json!({
            "url": url.as_str(),
            "request": request_context,
            "status": response.status,
            "response": response.body.as_str(),
        });

        if response.status != 200 {
            return Err(self.fail(
                GatewayError::HttpStatus {
                    status: response.status,
                    body: response.body,
                },
                context,
            ));
        }

        let body: Value = match serde_json::from_str(&response.body) {
            Ok(body) => body,
            Err(e) => return Err(self.fail(GatewayError::Decode(e), context)),
        };

        if let Some(code) = body.get("errorCode").and_then(error_code) {
            let message = body
                .get("errorMessage")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            return Err(self.fail(GatewayError::Application { code, message }, context));
        }

        if self.config.debug {
            self.logger
                .record(LogEvent::info(format!("{method} succeeded")).with_context(context));
        }

        Ok(body)
    }

    /// Registers an order and returns the payment page details.
    pub async fn register(&self, request: &GatewayRequest) -> Result<RegisterResponse> {
        let method = GatewayMethod::Register;
        let body = self.call(method, request.form_fields()?).await?;
        let response: RegisterResponse = self.decode(method, body)?;

        if response.form_url.as_deref().is_none_or(str::is_empty) {
            return Err(self.fail(
                GatewayError::MissingField("formUrl"),
                json!({ "orderNumber": request.order_number }),
            ));
        }
        Ok(response)
    }

    pub async fn order_status(&self, order_id: &GatewayOrderId) -> Result<OrderStatusResponse> {
        let method = GatewayMethod::OrderStatusExtended;
        let params = vec![("orderId".to_string(), order_id.to_string())];
        let body = self.call(method, params).await?;
        self.decode(method, body)
    }

    fn decode<T: DeserializeOwned>(&self, method: GatewayMethod, body: Value) -> Result<T> {
        let context = json!({ "method": method.path(), "response": body.clone() });
        serde_json::from_value(body).map_err(|e| self.fail(GatewayError::Decode(e), context))
    }

    fn fail(&self, error: GatewayError, context: Value) -> GatewayError {
        self.logger
            .record(LogEvent::error(error.to_string()).with_context(context));
        error
    }
}

fn masked(fields: &[(String, String)]) -> Value {
    let map: Map<String, Value> = fields
        .iter()
        .map(|(key, value)| {
            let value = if SECRET_FIELDS.contains(&key.as_str()) {
                "***".to_string()
            } else {
                value.clone()
            };
            (key.clone(), Value::String(value))
        })
        .collect();
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use crate::domain::event::Severity;
    use crate::infrastructure::in_memory::{MemoryEventLog, StubTransport};

    fn client(config: GatewayConfig) -> (GatewayClient, StubTransport, MemoryEventLog) {
        let transport = StubTransport::new();
        let log = MemoryEventLog::new();
        let client = GatewayClient::new(
            Arc::new(config),
            Arc::new(transport.clone()),
            Arc::new(log.clone()),
        );
        (client, transport, log)
    }

    fn token_config() -> GatewayConfig {
        GatewayConfig {
            credentials: Some(Credentials::Token("tkn".to_string())),
            ..GatewayConfig::default()
        }
    }

    #[tokio::test]
    async fn test_token_auth_and_success() {
        let (client, transport, log) = client(token_config());
        transport.push_json(json!({ "errorCode": "0", "orderStatus": 2 }));

        let body = client
            .call(GatewayMethod::OrderStatusExtended, vec![("orderId".into(), "x".into())])
            .await
            .unwrap();
        assert_eq!(body["orderStatus"], 2);

        let request = &transport.requests()[0];
        assert_eq!(
            request.url.as_str(),
            "https://securepayments.sberbank.ru/payment/rest/getOrderStatusExtended.do"
        );
        assert_eq!(request.field("token"), Some("tkn"));
        assert_eq!(request.field("userName"), None);
        assert_eq!(request.field("password"), None);
        assert!(log.events().is_empty());
    }

    #[tokio::test]
    async fn test_login_auth_and_debug_logging() {
        let config = GatewayConfig {
            credentials: Some(Credentials::Login {
                user_name: "api".to_string(),
                password: "pw".to_string(),
            }),
            debug: true,
            sandbox: true,
            ..GatewayConfig::default()
        };
        let (client, transport, log) = client(config);
        transport.push_json(json!({ "orderId": "1", "formUrl": "https://pay.test/form" }));

        client.call(GatewayMethod::Register, Vec::new()).await.unwrap();

        let request = &transport.requests()[0];
        assert!(request.url.as_str().starts_with("https://3dsec.sberbank.ru/"));
        assert_eq!(request.field("userName"), Some("api"));
        assert_eq!(request.field("password"), Some("pw"));
        assert_eq!(request.field("token"), None);

        let events = log.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].severity, Severity::Info);
        assert_eq!(events[0].context["request"]["password"], "***");
    }

    #[tokio::test]
    async fn test_missing_credentials_is_not_attempted() {
        let (client, transport, log) = client(GatewayConfig::default());
        let result = client.call(GatewayMethod::Register, Vec::new()).await;
        assert!(matches!(result, Err(GatewayError::Configuration(_))));
        assert_eq!(transport.call_count(), 0);
        assert!(log.events().is_empty());
    }

    #[tokio::test]
    async fn test_non_200_is_transport_failure() {
        let (client, transport, log) = client(token_config());
        transport.push_response(502, "{\"errorCode\":0}");

        let result = client.call(GatewayMethod::Register, Vec::new()).await;
        assert!(matches!(result, Err(GatewayError::HttpStatus { status: 502, .. })));
        assert_eq!(log.count(Severity::Error), 1);
    }

    #[tokio::test]
    async fn test_application_error_carries_message() {
        let (client, transport, log) = client(token_config());
        transport.push_json(json!({ "errorCode": 1, "errorMessage": "duplicate order" }));

        let result = client.call(GatewayMethod::Register, Vec::new()).await;
        match result {
            Err(GatewayError::Application { code, message }) => {
                assert_eq!(code, "1");
                assert_eq!(message, "duplicate order");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        let events = log.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].context["request"]["token"], "***");
    }

    #[tokio::test]
    async fn test_unparseable_body_and_connection_failure() {
        let (client, transport, log) = client(token_config());
        transport.push_response(200, "<html>maintenance</html>");
        transport.push_failure("connection refused");

        assert!(matches!(
            client.call(GatewayMethod::Register, Vec::new()).await,
            Err(GatewayError::Decode(_))
        ));
        assert!(matches!(
            client.call(GatewayMethod::Register, Vec::new()).await,
            Err(GatewayError::Transport(_))
        ));
        assert_eq!(log.count(Severity::Error), 2);
    }
}
