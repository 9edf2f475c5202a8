//! Template system for reactive contract generation
//!
//! Holds the Handlebars skeleton the rendered Solidity fragments are
//! substituted into.

use handlebars::Handlebars;
use reactgen_core::{Error, Result};

/// Name the contract skeleton is registered under
pub const REACTIVE_CONTRACT: &str = "reactive_contract";

/// Template manager for reactive contract generation
#[derive(Debug)]
pub struct ReactiveTemplateManager {
    handlebars: Handlebars<'static>,
}

impl ReactiveTemplateManager {
    /// Create a new template manager and register all templates
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();
        // Solidity string literals must pass through untouched
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars.set_strict_mode(true);

        Self::register_templates(&mut handlebars)?;

        Ok(Self { handlebars })
    }

    fn register_templates(handlebars: &mut Handlebars) -> Result<()> {
        handlebars
            .register_template_string(REACTIVE_CONTRACT, include_str!("reactive_contract.hbs"))
            .map_err(|e| {
                Error::template(format!(
                    "Failed to register {} template: {}",
                    REACTIVE_CONTRACT, e
                ))
            })?;

        Ok(())
    }

    /// Render a template with the given data
    pub fn render(&self, template_name: &str, data: &serde_json::Value) -> Result<String> {
        self.handlebars.render(template_name, data).map_err(|e| {
            Error::template(format!("Failed to render template {}: {}", template_name, e))
        })
    }

    /// Get list of available templates
    pub fn available_templates(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlebars.get_templates().keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registers_contract_skeleton() {
        let manager = ReactiveTemplateManager::new().unwrap();
        assert_eq!(manager.available_templates(), vec![REACTIVE_CONTRACT.to_string()]);
    }

    #[test]
    fn test_missing_field_fails_in_strict_mode() {
        let manager = ReactiveTemplateManager::new().unwrap();
        let err = manager.render(REACTIVE_CONTRACT, &json!({})).unwrap_err();
        assert!(matches!(err, Error::Template(_)));
    }
}
