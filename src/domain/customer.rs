//! Customer contact normalization for the order bundle.
//!
//! Invalid contacts are dropped, never reported as errors: the gateway accepts a
//! registration without customer details.

use super::order::Order;
use serde::Serialize;

const MAX_EMAIL_LEN: usize = 254;
const MAX_LOCAL_LEN: usize = 64;
const MAX_LABEL_LEN: usize = 63;

/// Characters allowed in an unquoted local part besides ASCII alphanumerics (RFC 5322 atext).
const ATEXT_SPECIALS: &str = "!#$%&'*+/=?^_`{|}~-";

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CustomerDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl CustomerDetails {
    pub fn from_order(order: &Order) -> Self {
        Self {
            email: order.email.as_deref().and_then(normalize_email),
            phone: order.phone.as_deref().and_then(normalize_phone),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.phone.is_none()
    }
}

/// Returns the trimmed address if it is a syntactically valid `local@domain` address.
pub fn normalize_email(raw: &str) -> Option<String> {
    let email = raw.trim();
    if email.is_empty() || email.len() > MAX_EMAIL_LEN {
        return None;
    }
    let (local, domain) = email.split_once('@')?;
    if is_valid_local_part(local) && is_valid_domain(domain) {
        Some(email.to_string())
    } else {
        None
    }
}

fn is_valid_local_part(local: &str) -> bool {
    !local.is_empty()
        && local.len() <= MAX_LOCAL_LEN
        && local.split('.').all(|atom| {
            !atom.is_empty()
                && atom
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || ATEXT_SPECIALS.contains(c))
        })
}

fn is_valid_domain(domain: &str) -> bool {
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && label.len() <= MAX_LABEL_LEN
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
        && labels
            .last()
            .is_some_and(|tld| tld.chars().any(|c| c.is_ascii_alphabetic()))
}

/// Reduces a phone number to the 11-digit `7XXXXXXXXXX` form the gateway expects.
///
/// Non-digits are stripped and a domestic leading `8` becomes `7`.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    let phone = match digits.strip_prefix('8') {
        Some(rest) => format!("7{rest}"),
        None => digits,
    };
    (phone.len() == 11 && phone.starts_with('7')).then_some(phone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::{CurrencyCode, Money};
    use crate::domain::order::OrderState;
    use rust_decimal_macros::dec;

    #[test]
    fn test_phone_domestic_prefix() {
        assert_eq!(normalize_phone("89161234567").as_deref(), Some("79161234567"));
    }

    #[test]
    fn test_phone_formatted_international() {
        assert_eq!(
            normalize_phone("+7 916 123-45-67").as_deref(),
            Some("79161234567")
        );
        assert_eq!(
            normalize_phone("8 (916) 123 45 67").as_deref(),
            Some("79161234567")
        );
    }

    #[test]
    fn test_phone_rejected() {
        assert_eq!(normalize_phone("12345"), None);
        assert_eq!(normalize_phone("+1 916 123 4567"), None);
        assert_eq!(normalize_phone("791612345678"), None);
        assert_eq!(normalize_phone(""), None);
    }

    #[test]
    fn test_email_accepted() {
        assert_eq!(
            normalize_email(" buyer@example.com ").as_deref(),
            Some("buyer@example.com")
        );
        assert!(normalize_email("first.last+tag@mail.example.co").is_some());
        assert!(normalize_email("o'brien@example.ie").is_some());
    }

    #[test]
    fn test_email_rejected() {
        for bad in [
            "",
            "plainaddress",
            "@example.com",
            "user@",
            "user@localhost",
            "user@@example.com",
            "user..dots@example.com",
            ".user@example.com",
            "user@-example.com",
            "user@example..com",
            "user name@example.com",
            "user@example.123",
        ] {
            assert_eq!(normalize_email(bad), None, "{bad} should be rejected");
        }
    }

    #[test]
    fn test_customer_details_from_order() {
        let order = Order {
            id: 7,
            amount: Money::new(dec!(10), CurrencyCode::new("RUB").unwrap()),
            paid: dec!(0),
            email: Some("not an email".to_string()),
            phone: Some("8-916-123-45-67".to_string()),
            state: OrderState::New,
        };
        let details = CustomerDetails::from_order(&order);
        assert_eq!(details.email, None);
        assert_eq!(details.phone.as_deref(), Some("79161234567"));
        assert!(!details.is_empty());

        let json = serde_json::to_value(&details).unwrap();
        assert!(json.get("email").is_none());
    }
}
