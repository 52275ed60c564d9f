use handlebars::Handlebars;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::spec::field::FormField;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to render message template: {0}")]
    Render(String),
}

/// Renders author-supplied validation messages such as
/// `"{{label}} needs at least {{minLength}} characters"`.
#[derive(Debug, Clone)]
pub struct MessageTemplates {
    handlebars: Handlebars<'static>,
}

impl Default for MessageTemplates {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageTemplates {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        handlebars.register_escape_fn(handlebars::no_escape);
        Self { handlebars }
    }

    pub fn render(&self, template: &str, ctx: &Value) -> Result<String, TemplateError> {
        self.handlebars
            .render_template(template, ctx)
            .map_err(|err| TemplateError::Render(err.to_string()))
    }

    /// Renders `template` for `field`, falling back to `fallback` when rendering fails.
    pub fn render_for_field(&self, template: &str, field: &MessageContext, fallback: &str) -> String {
        match self.render(template, &field.to_value()) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(field = %field.field_name, error = %err, "custom message fell back");
                fallback.to_string()
            }
        }
    }
}

/// Values exposed to message templates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageContext {
    pub label: String,
    pub field_name: String,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub pattern: Option<String>,
}

impl MessageContext {
    pub fn from_field(field: &FormField) -> Self {
        let validation = field.validation.clone().unwrap_or_default();
        Self {
            label: field.label.clone(),
            field_name: field.key().unwrap_or_default().to_string(),
            min_length: validation.min_length,
            max_length: validation.max_length,
            min: validation.min,
            max: validation.max,
            pattern: validation.pattern,
        }
    }

    fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("label".into(), Value::String(self.label.clone()));
        map.insert("fieldName".into(), Value::String(self.field_name.clone()));
        if let Some(min_length) = self.min_length {
            map.insert("minLength".into(), Value::from(min_length));
        }
        if let Some(max_length) = self.max_length {
            map.insert("maxLength".into(), Value::from(max_length));
        }
        if let Some(min) = self.min {
            map.insert("min".into(), bound_value(min));
        }
        if let Some(max) = self.max {
            map.insert("max".into(), bound_value(max));
        }
        if let Some(pattern) = &self.pattern {
            map.insert("pattern".into(), Value::String(pattern.clone()));
        }
        Value::Object(map)
    }
}

/// Whole-number bounds render as `18`, not `18.0`.
fn bound_value(bound: f64) -> Value {
    if bound.fract() == 0.0 && bound.abs() < i64::MAX as f64 {
        Value::from(bound as i64)
    } else {
        Value::from(bound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_placeholders_without_escaping() {
        let templates = MessageTemplates::new();
        let ctx = MessageContext {
            label: "Name & title".into(),
            field_name: "name".into(),
            min_length: Some(3),
            ..Default::default()
        };
        let message =
            templates.render_for_field("{{label}} needs {{minLength}} chars", &ctx, "fallback");
        assert_eq!(message, "Name & title needs 3 chars");
    }

    #[test]
    fn missing_placeholder_uses_fallback() {
        let templates = MessageTemplates::new();
        let ctx = MessageContext::default();
        let message = templates.render_for_field("at most {{maxLength}}", &ctx, "too long");
        assert_eq!(message, "too long");
        assert!(templates.render("{{nope}}", &json!({})).is_err());
    }
}
