use super::gateway::GatewayStatus;
use reqwest::Url;
use std::collections::HashMap;
use std::fmt;

pub const ORDER_ID_PARAM: &str = "orderId";
pub const PAYMENT_ID_PARAM: &str = "paymentId";
pub const PAYMENT_HASH_PARAM: &str = "paymentHash";

/// A single inbound request parameter. Only `key[]` forms become lists.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Text(String),
    List(Vec<String>),
}

/// Parameters of an inbound gateway callback, whether they arrived by GET or POST.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CallbackRequest {
    params: HashMap<String, ParamValue>,
}

impl CallbackRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut request = Self::new();
        for (key, value) in pairs {
            request.push(key, value);
        }
        request
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        let (key, is_list) = match key.strip_suffix("[]") {
            Some(base) => (base.to_string(), true),
            None => (key, false),
        };

        let next = match (is_list, self.params.remove(&key)) {
            (true, Some(ParamValue::List(mut values))) => {
                values.push(value);
                ParamValue::List(values)
            }
            (true, _) => ParamValue::List(vec![value]),
            // A repeated plain key keeps its last value.
            (false, _) => ParamValue::Text(value),
        };
        self.params.insert(key, next);
    }

    /// Returns the parameter only when it is a single string value.
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.params.get(key) {
            Some(ParamValue::Text(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Like [`text`](Self::text), but treats empty strings as absent.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.text(key).filter(|value| !value.is_empty())
    }

    pub fn payment_hash(&self) -> Option<&str> {
        self.text(PAYMENT_HASH_PARAM)
    }
}

/// Result of handling one callback.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconciliationOutcome {
    /// The callback was malformed; no gateway call or state change happened.
    Rejected { reason: String },
    /// The status query failed; no state change.
    QueryFailed,
    /// The gateway has not secured the funds yet. The gateway will call back again.
    Pending { status: Option<GatewayStatus> },
    /// Crediting the order failed; no redirect.
    ApplyFailed,
    /// Funds were applied; the payer should be sent to `redirect`.
    Confirmed { payment_hash: String, redirect: Url },
}

impl ReconciliationOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReconciliationOutcome::Pending { .. })
    }

    pub fn redirect(&self) -> Option<&Url> {
        match self {
            ReconciliationOutcome::Confirmed { redirect, .. } => Some(redirect),
            _ => None,
        }
    }
}

impl fmt::Display for ReconciliationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected { reason } => write!(f, "rejected: {reason}"),
            Self::QueryFailed => f.write_str("query failed"),
            Self::Pending { status: Some(status) } => {
                write!(f, "pending ({status:?}, orderStatus {})", status.code())
            }
            Self::Pending { status: None } => f.write_str("pending"),
            Self::ApplyFailed => f.write_str("apply failed"),
            Self::Confirmed { redirect, .. } => write!(f, "confirmed: {redirect}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_values_are_text() {
        let request = CallbackRequest::from_pairs([("orderId", "abc"), ("paymentId", "")]);
        assert_eq!(request.text("orderId"), Some("abc"));
        assert_eq!(request.text("paymentId"), Some(""));
        assert_eq!(request.non_empty("paymentId"), None);
        assert_eq!(request.text("missing"), None);
    }

    #[test]
    fn test_repeated_plain_key_keeps_last_value() {
        let request = CallbackRequest::from_pairs([("orderId", "a"), ("orderId", "b")]);
        assert_eq!(request.text("orderId"), Some("b"));
    }

    #[test]
    fn test_bracketed_keys_are_lists() {
        let request = CallbackRequest::from_pairs([
            ("paymentHash[]", "h"),
            ("paymentHash[]", "i"),
            ("paymentId", "1"),
            ("paymentId[]", "2"),
        ]);
        assert_eq!(request.payment_hash(), None);
        assert_eq!(request.text("paymentId"), None);
        assert_eq!(
            request.params.get("paymentHash"),
            Some(&ParamValue::List(vec!["h".to_string(), "i".to_string()]))
        );
    }

    #[test]
    fn test_terminal_states() {
        assert!(!ReconciliationOutcome::Pending { status: None }.is_terminal());
        assert!(ReconciliationOutcome::QueryFailed.is_terminal());
        assert!(ReconciliationOutcome::ApplyFailed.redirect().is_none());
    }

    #[test]
    fn test_pending_display_names_status_code() {
        let outcome = ReconciliationOutcome::Pending {
            status: Some(GatewayStatus::AcsPending),
        };
        assert_eq!(outcome.to_string(), "pending (AcsPending, orderStatus 5)");
    }
}
