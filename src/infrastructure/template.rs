use crate::domain::ports::TemplateRenderer;
use crate::error::{GatewayError, Result};
use std::collections::BTreeMap;

const OPEN: &str = "[+";
const CLOSE: &str = "+]";

/// Renders `[+name+]` placeholders, the chunk syntax used by the shop's CMS.
///
/// Unknown placeholders render as an empty string.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderRenderer;

impl TemplateRenderer for PlaceholderRenderer {
    fn render(&self, template: &str, variables: &BTreeMap<&str, String>) -> Result<String> {
        let mut output = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find(OPEN) {
            output.push_str(&rest[..start]);
            let after_open = &rest[start + OPEN.len()..];
            let end = after_open.find(CLOSE).ok_or_else(|| {
                GatewayError::Template(format!("unterminated placeholder in `{template}`"))
            })?;
            let name = after_open[..end].trim();
            if let Some(value) = variables.get(name) {
                output.push_str(value);
            }
            rest = &after_open[end + CLOSE.len()..];
        }
        output.push_str(rest);

        Ok(output)
    }
}
