//! Adapters that implement the domain ports.

pub mod http;
pub mod in_memory;
pub mod logging;
pub mod settings;
pub mod template;
