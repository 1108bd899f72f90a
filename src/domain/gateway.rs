//! Wire types of the gateway's REST interface.

use super::customer::CustomerDetails;
use super::money::MinorUnits;
use crate::error::{GatewayError, Result};
use reqwest::Url;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

const GATEWAY_ORDER_ID_LEN: usize = 36;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayMethod {
    Register,
    OrderStatusExtended,
}

impl GatewayMethod {
    /// Path appended to the endpoint base URL.
    pub fn path(&self) -> &'static str {
        match self {
            GatewayMethod::Register => "payment/rest/register.do",
            GatewayMethod::OrderStatusExtended => "payment/rest/getOrderStatusExtended.do",
        }
    }
}

impl fmt::Display for GatewayMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// `orderStatus` codes reported by `getOrderStatusExtended.do`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GatewayStatus {
    Registered,
    /// Funds held (pre-authorization).
    Authorized,
    /// Funds captured.
    Confirmed,
    Reversed,
    Refunded,
    AcsPending,
    Declined,
}

impl GatewayStatus {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Registered),
            1 => Some(Self::Authorized),
            2 => Some(Self::Confirmed),
            3 => Some(Self::Reversed),
            4 => Some(Self::Refunded),
            5 => Some(Self::AcsPending),
            6 => Some(Self::Declined),
            _ => None,
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            Self::Registered => 0,
            Self::Authorized => 1,
            Self::Confirmed => 2,
            Self::Reversed => 3,
            Self::Refunded => 4,
            Self::AcsPending => 5,
            Self::Declined => 6,
        }
    }
}

/// The gateway's transaction UUID: 36 characters of lowercase hex digits and hyphens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GatewayOrderId(String);

impl GatewayOrderId {
    pub fn parse(raw: &str) -> Result<Self> {
        let valid = raw.len() == GATEWAY_ORDER_ID_LEN
            && raw
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c) || c == '-');
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(GatewayError::Validation(format!(
                "malformed gateway order id `{raw}`"
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for GatewayOrderId {
    type Error = GatewayError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<GatewayOrderId> for String {
    fn from(id: GatewayOrderId) -> Self {
        id.0
    }
}

impl fmt::Display for GatewayOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemQuantity {
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
    pub measure: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleItem {
    pub position_id: u32,
    pub name: String,
    pub quantity: ItemQuantity,
    pub item_amount: MinorUnits,
    pub item_price: MinorUnits,
    pub item_code: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CartItems {
    pub items: Vec<BundleItem>,
}

/// Customer and cart data attached to a registration for the gateway's receipts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBundle {
    pub order_creation_date: String,
    pub customer_details: CustomerDetails,
    pub cart_items: CartItems,
}

/// Payload of `register.do`, without authentication fields.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayRequest {
    pub order_number: String,
    pub amount: MinorUnits,
    pub currency: u16,
    pub language: String,
    pub json_params: BTreeMap<String, String>,
    pub return_url: Url,
    pub description: String,
    pub order_bundle: Option<OrderBundle>,
}

impl GatewayRequest {
    /// Flattens the request into url-encodable form fields.
    pub fn form_fields(&self) -> Result<Vec<(String, String)>> {
        let json_params = serde_json::to_string(&self.json_params)
            .map_err(|e| GatewayError::Validation(format!("jsonParams: {e}")))?;

        let mut fields = vec![
            ("orderNumber".to_string(), self.order_number.clone()),
            ("amount".to_string(), self.amount.to_string()),
            ("currency".to_string(), self.currency.to_string()),
            ("language".to_string(), self.language.clone()),
            ("jsonParams".to_string(), json_params),
            ("returnUrl".to_string(), self.return_url.to_string()),
            ("description".to_string(), self.description.clone()),
        ];

        if let Some(bundle) = &self.order_bundle {
            let bundle = serde_json::to_string(bundle)
                .map_err(|e| GatewayError::Validation(format!("orderBundle: {e}")))?;
            fields.push(("orderBundle".to_string(), bundle));
        }

        Ok(fields)
    }
}

/// Successful `register.do` response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub form_url: Option<String>,
}

/// Successful `getOrderStatusExtended.do` response, reduced to the fields reconciliation needs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusResponse {
    #[serde(default)]
    pub error_code: Option<Value>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub order_status: Option<i64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub amount: Option<i64>,
}

impl OrderStatusResponse {
    pub fn status(&self) -> Option<GatewayStatus> {
        self.order_status.and_then(GatewayStatus::from_code)
    }

    pub fn has_error(&self) -> bool {
        self.error_code.as_ref().and_then(error_code).is_some()
    }
}

/// Extracts a meaningful `errorCode`. Absent, null, empty and zero codes mean "no error".
pub fn error_code(value: &Value) -> Option<String> {
    let code = match value {
        Value::Null | Value::Bool(false) => return None,
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    };
    let zero = code.parse::<f64>().is_ok_and(|n| n == 0.0);
    (!code.is_empty() && !zero).then_some(code)
}

fn lenient_i64<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_gateway_order_id_validation() {
        assert!(GatewayOrderId::parse("70906e55-7114-41d6-8332-4609dc6590f4").is_ok());
        assert!(GatewayOrderId::parse("not-a-uuid").is_err());
        assert!(GatewayOrderId::parse("70906E55-7114-41D6-8332-4609DC6590F4").is_err());
        assert!(GatewayOrderId::parse("70906e55-7114-41d6-8332-4609dc6590fz").is_err());
        assert!(GatewayOrderId::parse("70906e55-7114-41d6-8332-4609dc6590f").is_err());
    }

    #[test]
    fn test_error_code_extraction() {
        assert_eq!(error_code(&json!(0)), None);
        assert_eq!(error_code(&json!("0")), None);
        assert_eq!(error_code(&json!("")), None);
        assert_eq!(error_code(&Value::Null), None);
        assert_eq!(error_code(&json!(1)).as_deref(), Some("1"));
        assert_eq!(error_code(&json!("5")).as_deref(), Some("5"));
    }

    #[test]
    fn test_status_response_lenient_numbers() {
        let response: OrderStatusResponse = serde_json::from_value(json!({
            "errorCode": "0",
            "orderStatus": "2",
            "amount": 150000,
        }))
        .unwrap();
        assert!(!response.has_error());
        assert_eq!(response.status(), Some(GatewayStatus::Confirmed));
        assert_eq!(response.amount, Some(150000));
    }

    #[test]
    fn test_status_codes_round_trip() {
        for code in 0..=6 {
            assert_eq!(GatewayStatus::from_code(code).unwrap().code(), code);
        }
        assert_eq!(GatewayStatus::from_code(7), None);
    }

    #[test]
    fn test_form_fields_without_bundle() {
        let request = GatewayRequest {
            order_number: "42-1700000000".to_string(),
            amount: MinorUnits::new(150000).unwrap(),
            currency: 643,
            language: "ru".to_string(),
            json_params: BTreeMap::from([("CMS".to_string(), "bankpay".to_string())]),
            return_url: Url::parse("https://shop.test/pay?paymentId=1").unwrap(),
            description: "Order #42".to_string(),
            order_bundle: None,
        };
        let fields: BTreeMap<String, String> = request.form_fields().unwrap().into_iter().collect();
        assert_eq!(fields["amount"], "150000");
        assert_eq!(fields["currency"], "643");
        assert_eq!(fields["jsonParams"], r#"{"CMS":"bankpay"}"#);
        assert!(!fields.contains_key("orderBundle"));
    }
}
