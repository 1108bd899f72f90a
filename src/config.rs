//! Gateway configuration, read from a [`SettingsStore`].

use crate::domain::gateway::{GatewayMethod, GatewayStatus};
use crate::domain::money::CurrencyCode;
use crate::domain::ports::SettingsStore;
use crate::error::{GatewayError, Result};
use reqwest::Url;
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

pub const PRODUCTION_URL: &str = "https://securepayments.sberbank.ru/";
pub const SANDBOX_URL: &str = "https://3dsec.sberbank.ru/";

/// Setting keys understood by [`GatewayConfig::from_settings`].
pub mod keys {
    pub const TOKEN: &str = "token";
    pub const LOGIN: &str = "login";
    pub const PASSWORD: &str = "password";
    pub const SANDBOX: &str = "test";
    pub const DEBUG: &str = "debug";
    pub const ACCEPT_INVALID_CERTS: &str = "accept_invalid_certs";
    pub const PRODUCTION_URL: &str = "production_url";
    pub const SANDBOX_URL: &str = "sandbox_url";
    pub const SETTLEMENT_CURRENCY: &str = "settlement_currency";
    pub const CURRENCY_MODE: &str = "currency_mode";
    pub const LANGUAGE: &str = "language";
    pub const ACCEPTED_STATUSES: &str = "accepted_statuses";
    pub const PARTIAL_PAYMENT_SCALING: &str = "partial_payment_scaling";
    pub const SITE_URL: &str = "site_url";
    pub const SITE_NAME: &str = "site_name";
    pub const RETURN_PATH: &str = "return_path";
    pub const SUCCESS_PATH: &str = "success_path";
    pub const DESCRIPTION_TEMPLATE: &str = "description_template";
    pub const UNITS_LABEL: &str = "units_label";
    pub const CMS_LABEL: &str = "cms_label";
    pub const TIMEOUT_SECS: &str = "timeout_secs";
}

#[derive(Clone, PartialEq)]
pub enum Credentials {
    Token(String),
    Login { user_name: String, password: String },
}

impl Credentials {
    /// Authentication form fields. Exactly one mode is ever sent.
    pub fn form_fields(&self) -> Vec<(String, String)> {
        match self {
            Credentials::Token(token) => vec![("token".to_string(), token.clone())],
            Credentials::Login {
                user_name,
                password,
            } => vec![
                ("userName".to_string(), user_name.clone()),
                ("password".to_string(), password.clone()),
            ],
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Token(_) => f.write_str("Token(***)"),
            Credentials::Login { user_name, .. } => f
                .debug_struct("Login")
                .field("user_name", user_name)
                .field("password", &"***")
                .finish(),
        }
    }
}

/// Which currency registration amounts are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CurrencyMode {
    /// Convert everything into the gateway's settlement currency.
    #[default]
    Settlement,
    /// Register in the order's own currency.
    Native,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub credentials: Option<Credentials>,
    pub sandbox: bool,
    pub debug: bool,
    /// Skip TLS certificate verification. Only for legacy gateway installations.
    pub accept_invalid_certs: bool,
    pub production_url: String,
    pub sandbox_url: String,
    pub settlement_currency: CurrencyCode,
    pub currency_mode: CurrencyMode,
    pub language: String,
    /// `orderStatus` values meaning the funds are secured.
    pub accepted_statuses: BTreeSet<GatewayStatus>,
    pub partial_payment_scaling: bool,
    pub site_url: String,
    pub site_name: String,
    pub return_path: String,
    pub success_path: String,
    pub description_template: String,
    pub units_label: String,
    pub cms_label: String,
    pub request_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            credentials: None,
            sandbox: false,
            debug: false,
            accept_invalid_certs: false,
            production_url: PRODUCTION_URL.to_string(),
            sandbox_url: SANDBOX_URL.to_string(),
            settlement_currency: CurrencyCode::new_unchecked("RUB"),
            currency_mode: CurrencyMode::Settlement,
            language: "ru".to_string(),
            accepted_statuses: BTreeSet::from([GatewayStatus::Authorized, GatewayStatus::Confirmed]),
            partial_payment_scaling: true,
            site_url: "http://localhost/".to_string(),
            site_name: "Shop".to_string(),
            return_path: "commerce/bankpay/payment-process/".to_string(),
            success_path: "commerce/bankpay/payment-success".to_string(),
            description_template: "Payment for order #[+order_id+] on [+site_name+]".to_string(),
            units_label: "pcs".to_string(),
            cms_label: concat!("bankpay ", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl GatewayConfig {
    /// Builds a configuration from the defaults overridden by `settings`.
    pub fn from_settings(settings: &dyn SettingsStore) -> Result<Self> {
        let get = |key: &str| settings.get(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        config.credentials = match (get(keys::TOKEN), get(keys::LOGIN), get(keys::PASSWORD)) {
            (Some(token), _, _) => Some(Credentials::Token(token)),
            (None, Some(user_name), Some(password)) => Some(Credentials::Login {
                user_name,
                password,
            }),
            _ => None,
        };

        for (key, flag) in [
            (keys::SANDBOX, &mut config.sandbox),
            (keys::DEBUG, &mut config.debug),
            (keys::ACCEPT_INVALID_CERTS, &mut config.accept_invalid_certs),
            (keys::PARTIAL_PAYMENT_SCALING, &mut config.partial_payment_scaling),
        ] {
            if let Some(v) = get(key) {
                *flag = parse_flag(key, &v)?;
            }
        }
        for (key, url) in [
            (keys::PRODUCTION_URL, &mut config.production_url),
            (keys::SANDBOX_URL, &mut config.sandbox_url),
            (keys::SITE_URL, &mut config.site_url),
        ] {
            if let Some(v) = get(key) {
                *url = with_trailing_slash(v);
            }
        }
        if let Some(v) = get(keys::SETTLEMENT_CURRENCY) {
            config.settlement_currency = CurrencyCode::new(v)?;
        }
        if let Some(v) = get(keys::CURRENCY_MODE) {
            config.currency_mode = match v.trim().to_ascii_lowercase().as_str() {
                "settlement" => CurrencyMode::Settlement,
                "native" => CurrencyMode::Native,
                other => {
                    return Err(GatewayError::Configuration(format!(
                        "unknown {} `{other}`",
                        keys::CURRENCY_MODE
                    )));
                }
            };
        }
        if let Some(v) = get(keys::ACCEPTED_STATUSES) {
            config.accepted_statuses = parse_statuses(&v)?;
        }
        if let Some(v) = get(keys::TIMEOUT_SECS) {
            let secs = v.trim().parse::<u64>().map_err(|_| {
                GatewayError::Configuration(format!("{} must be a number", keys::TIMEOUT_SECS))
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }
        for (key, text) in [
            (keys::LANGUAGE, &mut config.language),
            (keys::SITE_NAME, &mut config.site_name),
            (keys::RETURN_PATH, &mut config.return_path),
            (keys::SUCCESS_PATH, &mut config.success_path),
            (keys::DESCRIPTION_TEMPLATE, &mut config.description_template),
            (keys::UNITS_LABEL, &mut config.units_label),
            (keys::CMS_LABEL, &mut config.cms_label),
        ] {
            if let Some(v) = get(key) {
                *text = v;
            }
        }

        Ok(config)
    }

    pub fn require_credentials(&self) -> Result<&Credentials> {
        self.credentials.as_ref().ok_or_else(|| {
            GatewayError::Configuration(
                "either a token or a login and password must be configured".to_string(),
            )
        })
    }

    /// A user-facing warning to show in the payment method settings, if any.
    pub fn setup_warning(&self) -> Option<&'static str> {
        self.credentials
            .is_none()
            .then_some("Gateway token or login/password is not configured")
    }

    /// The currency amounts are registered and settled in for an order in `order_currency`.
    pub fn registration_currency(&self, order_currency: &CurrencyCode) -> CurrencyCode {
        match self.currency_mode {
            CurrencyMode::Settlement => self.settlement_currency.clone(),
            CurrencyMode::Native => order_currency.clone(),
        }
    }

    pub fn endpoint(&self, method: GatewayMethod) -> Result<Url> {
        let base = if self.sandbox {
            &self.sandbox_url
        } else {
            &self.production_url
        };
        parse_url(&format!("{base}{}", method.path()))
    }

    /// Where the gateway sends the payer back after the payment page.
    pub fn return_url(&self, payment_id: u64, payment_hash: &str) -> Result<Url> {
        let mut url = self.site_url()?.join(&self.return_path).map_err(invalid_url)?;
        url.query_pairs_mut()
            .append_pair("paymentId", &payment_id.to_string())
            .append_pair("paymentHash", payment_hash);
        Ok(url)
    }

    pub fn success_url(&self, payment_hash: &str) -> Result<Url> {
        let mut url = self.site_url()?.join(&self.success_path).map_err(invalid_url)?;
        url.query_pairs_mut().append_pair("paymentHash", payment_hash);
        Ok(url)
    }

    fn site_url(&self) -> Result<Url> {
        parse_url(&self.site_url)
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(GatewayError::Configuration(format!(
            "{key} must be a boolean, got `{other}`"
        ))),
    }
}

fn parse_statuses(value: &str) -> Result<BTreeSet<GatewayStatus>> {
    let statuses = value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|code| {
            code.parse::<i64>()
                .ok()
                .and_then(GatewayStatus::from_code)
                .ok_or_else(|| {
                    GatewayError::Configuration(format!("unknown order status code `{code}`"))
                })
        })
        .collect::<Result<BTreeSet<_>>>()?;

    if statuses.is_empty() {
        return Err(GatewayError::Configuration(format!(
            "{} must list at least one status",
            keys::ACCEPTED_STATUSES
        )));
    }
    Ok(statuses)
}

fn with_trailing_slash(mut url: String) -> String {
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(invalid_url)
}

fn invalid_url<E: fmt::Display>(e: E) -> GatewayError {
    GatewayError::Configuration(format!("invalid URL: {e}"))
}
