use crate::domain::ports::SettingsStore;
use std::collections::HashMap;

/// Settings held in a map. Used by tests and by hosts that load settings themselves.
#[derive(Debug, Default, Clone)]
pub struct InMemorySettings {
    values: HashMap<String, String>,
}

impl InMemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }
}

impl SettingsStore for InMemorySettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Reads settings from environment variables named `<PREFIX><KEY>` (key upper-cased).
#[derive(Debug, Clone)]
pub struct EnvSettings {
    prefix: String,
}

impl EnvSettings {
    pub const DEFAULT_PREFIX: &'static str = "BANKPAY_";

    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn var_name(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key.to_ascii_uppercase())
    }
}

impl Default for EnvSettings {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PREFIX)
    }
}

impl SettingsStore for EnvSettings {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(self.var_name(key)).ok()
    }
}

/// Looks keys up in `primary` first, then in `fallback`.
pub struct LayeredSettings<A, B> {
    primary: A,
    fallback: B,
}

impl<A: SettingsStore, B: SettingsStore> LayeredSettings<A, B> {
    pub fn new(primary: A, fallback: B) -> Self {
        Self { primary, fallback }
    }
}

impl<A: SettingsStore, B: SettingsStore> SettingsStore for LayeredSettings<A, B> {
    fn get(&self, key: &str) -> Option<String> {
        self.primary
            .get(key)
            .filter(|v| !v.is_empty())
            .or_else(|| self.fallback.get(key))
    }
}
