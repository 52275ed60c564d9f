use std::collections::BTreeMap;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::spec::field::{FieldType, FormField};
use crate::spec::schema::FormSchema;
use crate::template::{MessageContext, MessageTemplates};

#[derive(Debug, Error, PartialEq)]
pub enum ControlError {
    #[error("no control named '{0}'")]
    Unknown(String),
    #[error("control '{0}' is not a checkbox group")]
    NotAGroup(String),
}

/// Field-level validation failure shown inline next to the control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    pub field_name: String,
    pub code: String,
    pub message: String,
}

/// Single check derived from a field definition.
#[derive(Debug, Clone, PartialEq)]
pub enum Validator {
    Required,
    /// Required single checkbox: must be ticked.
    RequiredTrue,
    Email,
    Url,
    Numeric,
    MinLength(usize),
    MaxLength(usize),
    Min(f64),
    Max(f64),
    Pattern(FieldPattern),
    OneOf(Vec<String>),
}

/// Author-supplied pattern, compiled once and anchored to the whole value.
#[derive(Debug, Clone)]
pub struct FieldPattern {
    source: String,
    regex: Regex,
}

impl FieldPattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("^(?:{})$", source))?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for FieldPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Validator {
    pub fn code(&self) -> &'static str {
        match self {
            Validator::Required | Validator::RequiredTrue => "required",
            Validator::Email => "email",
            Validator::Url => "url",
            Validator::Numeric => "number",
            Validator::MinLength(_) => "min_length",
            Validator::MaxLength(_) => "max_length",
            Validator::Min(_) => "min",
            Validator::Max(_) => "max",
            Validator::Pattern(_) => "pattern",
            Validator::OneOf(_) => "invalid_option",
        }
    }

    /// Returns `true` when `value` satisfies the check. Empty values only fail `Required*`.
    pub fn check(&self, value: &Value) -> bool {
        match self {
            Validator::Required => !is_empty(value),
            Validator::RequiredTrue => value.as_bool() == Some(true),
            _ if is_empty(value) => true,
            Validator::Email => value.as_str().is_some_and(|text| email_regex().is_match(text)),
            Validator::Url => value.as_str().is_some_and(|text| url_regex().is_match(text)),
            Validator::Numeric => as_number(value).is_some(),
            Validator::MinLength(min) => length_of(value).is_none_or(|len| len >= *min),
            Validator::MaxLength(max) => length_of(value).is_none_or(|len| len <= *max),
            Validator::Min(min) => as_number(value).is_none_or(|number| number >= *min),
            Validator::Max(max) => as_number(value).is_none_or(|number| number <= *max),
            Validator::Pattern(pattern) => pattern.is_match(&display_string(value)),
            Validator::OneOf(options) => options.contains(&display_string(value)),
        }
    }

    fn default_message(&self, label: &str) -> String {
        let label = if label.is_empty() { "This field" } else { label };
        match self {
            Validator::Required | Validator::RequiredTrue => format!("{} is required", label),
            Validator::Email => "Please enter a valid email address".into(),
            Validator::Url => "Please enter a valid URL".into(),
            Validator::Numeric => format!("{} must be a number", label),
            Validator::MinLength(min) => format!("Must be at least {} characters", min),
            Validator::MaxLength(max) => format!("Must be at most {} characters", max),
            Validator::Min(min) => format!("Must be at least {}", min),
            Validator::Max(max) => format!("Must be at most {}", max),
            Validator::Pattern(_) => format!("{} has an invalid format", label),
            Validator::OneOf(_) => "Please choose one of the available options".into(),
        }
    }
}

fn email_regex() -> &'static Regex {
    static EMAIL: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)*$")
            .expect("email pattern is valid")
    })
}

fn url_regex() -> &'static Regex {
    static URL: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    URL.get_or_init(|| Regex::new(r"^https?://[^\s/$.?#][^\s]*$").expect("url pattern is valid"))
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::String(text) => Some(text.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

/// Numeric view of a control value: numbers as-is, strings parsed after trimming.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// String form used for comparisons and option membership.
pub fn display_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Editable state for one input field.
#[derive(Debug, Clone, PartialEq)]
pub struct Control {
    pub field_id: String,
    pub name: String,
    pub label: String,
    pub kind: FieldType,
    pub value: Value,
    pub default_value: Value,
    pub validators: Vec<Validator>,
    /// Live selection list for checkbox groups, kept in step with `value`.
    pub selections: Option<Vec<String>>,
    pub options: Vec<String>,
    pub touched: bool,
    message: Option<String>,
    message_ctx: MessageContext,
}

impl Control {
    /// Builds the control for an input field; display fields yield `None`.
    pub fn from_field(field: &FormField) -> Option<Self> {
        let name = field.key()?.to_string();
        let options = field
            .option_values()
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();
        let default_value = default_value_for(field);
        let selections = field.is_checkbox_group().then(|| string_items(&default_value));

        Some(Self {
            field_id: field.id.clone(),
            name,
            label: field.label.clone(),
            kind: field.kind,
            value: default_value.clone(),
            default_value,
            validators: validators_for(field),
            selections,
            options,
            touched: false,
            message: field
                .validation
                .as_ref()
                .and_then(|validation| validation.error_message.clone()),
            message_ctx: MessageContext::from_field(field),
        })
    }

    pub fn is_checkbox_group(&self) -> bool {
        self.selections.is_some()
    }

    /// Replaces the value; checkbox groups accept arrays or comma-separated strings.
    pub fn set_value(&mut self, value: Value) {
        if let Some(selections) = self.selections.as_mut() {
            *selections = split_selections(&value);
            self.value = selection_value(selections);
        } else if self.kind.is_boolean_like() {
            self.value = normalize_bool(&value);
        } else {
            self.value = value;
        }
    }

    /// Applies a single checkbox change event to a group.
    pub fn toggle_option(&mut self, option: &str, checked: bool) -> Result<(), ControlError> {
        let selections = self
            .selections
            .as_mut()
            .ok_or_else(|| ControlError::NotAGroup(self.name.clone()))?;
        let present = selections.iter().any(|selected| selected == option);
        if checked && !present {
            selections.push(option.to_string());
        } else if !checked {
            selections.retain(|selected| selected != option);
        }
        self.value = selection_value(selections);
        Ok(())
    }

    /// Clears the value after the field became hidden.
    pub fn clear(&mut self) {
        if let Some(selections) = self.selections.as_mut() {
            selections.clear();
            self.value = Value::Array(Vec::new());
        } else if self.kind.is_boolean_like() {
            self.value = Value::Bool(false);
        } else {
            self.value = Value::Null;
        }
    }

    /// Whether the value already equals what [`clear`](Self::clear) would set.
    pub fn is_cleared(&self) -> bool {
        if self.selections.is_some() {
            self.value.as_array().is_some_and(Vec::is_empty)
        } else if self.kind.is_boolean_like() {
            self.value == Value::Bool(false)
        } else {
            self.value.is_null()
        }
    }

    pub fn restore_default(&mut self) {
        self.value = self.default_value.clone();
        if self.selections.is_some() {
            self.selections = Some(string_items(&self.default_value));
        }
        self.touched = false;
    }

    pub fn mark_touched(&mut self) {
        self.touched = true;
    }

    pub fn is_valid(&self) -> bool {
        self.validators
            .iter()
            .all(|validator| validator.check(&self.value))
    }

    /// Every failing check, in derivation order.
    pub fn errors(&self, templates: &MessageTemplates) -> Vec<FieldError> {
        self.validators
            .iter()
            .filter(|validator| !validator.check(&self.value))
            .map(|validator| {
                let fallback = validator.default_message(&self.label);
                let message = match &self.message {
                    Some(template) => {
                        templates.render_for_field(template, &self.message_ctx, &fallback)
                    }
                    None => fallback,
                };
                FieldError {
                    field_name: self.name.clone(),
                    code: validator.code().into(),
                    message,
                }
            })
            .collect()
    }
}

/// Default value derivation per field type.
pub fn default_value_for(field: &FormField) -> Value {
    let raw = field.default_value.clone().unwrap_or(Value::Null);
    if field.is_checkbox_group() {
        let allowed = field.option_values();
        let mut selected = Vec::new();
        for item in split_selections(&raw) {
            if allowed.contains(&item.as_str()) && !selected.contains(&item) {
                selected.push(item);
            }
        }
        return selection_value(&selected);
    }
    match field.kind {
        FieldType::Checkbox | FieldType::Toggle => normalize_bool(&raw),
        FieldType::Number => raw,
        _ if raw.is_null() => Value::String(String::new()),
        _ => raw,
    }
}

/// Strict boolean view of loosely-typed defaults and inputs.
pub fn normalize_bool(value: &Value) -> Value {
    let flag = match value {
        Value::Bool(flag) => *flag,
        Value::String(text) => matches!(
            text.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes" | "on"
        ),
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    };
    Value::Bool(flag)
}

/// Parses an array, comma-separated string, or scalar into selection strings.
pub fn split_selections(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items
            .iter()
            .map(display_string)
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect(),
        Value::String(text) => text
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(String::from)
            .collect(),
        other => vec![display_string(other)],
    }
}

fn string_items(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| items.iter().map(display_string).collect())
        .unwrap_or_default()
}

fn selection_value(selections: &[String]) -> Value {
    Value::Array(
        selections
            .iter()
            .map(|item| Value::String(item.clone()))
            .collect(),
    )
}

/// Validator derivation: required, type checks, then the configured bounds.
pub fn validators_for(field: &FormField) -> Vec<Validator> {
    let mut validators = Vec::new();
    if field.required {
        if field.kind == FieldType::Checkbox && !field.is_checkbox_group() {
            validators.push(Validator::RequiredTrue);
        } else {
            validators.push(Validator::Required);
        }
    }
    match field.kind {
        FieldType::Email => validators.push(Validator::Email),
        FieldType::Url => validators.push(Validator::Url),
        FieldType::Number => validators.push(Validator::Numeric),
        FieldType::Select | FieldType::Radio if field.choices().is_some() => {
            let options = field
                .option_values()
                .into_iter()
                .map(String::from)
                .collect();
            validators.push(Validator::OneOf(options));
        }
        _ => {}
    }
    if let Some(validation) = &field.validation {
        if let Some(min_length) = validation.min_length {
            validators.push(Validator::MinLength(min_length));
        }
        if let Some(max_length) = validation.max_length {
            validators.push(Validator::MaxLength(max_length));
        }
        if let Some(min) = validation.min {
            validators.push(Validator::Min(min));
        }
        if let Some(max) = validation.max {
            validators.push(Validator::Max(max));
        }
        if let Some(pattern) = validation.pattern.as_ref().filter(|p| !p.is_empty()) {
            match FieldPattern::new(pattern) {
                Ok(pattern) => validators.push(Validator::Pattern(pattern)),
                Err(err) => {
                    tracing::warn!(field = %field.id, error = %err, "invalid pattern skipped")
                }
            }
        }
    }
    validators
}

/// The editable-value model of a rendered form, keyed by `fieldName`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlSet {
    controls: BTreeMap<String, Control>,
    names_by_id: BTreeMap<String, String>,
}

impl ControlSet {
    /// One control per input field; display fields are skipped.
    pub fn build(schema: &FormSchema) -> Self {
        let mut set = Self::default();
        for field in &schema.fields {
            let Some(control) = Control::from_field(field) else {
                continue;
            };
            if set.controls.contains_key(&control.name) {
                tracing::warn!(field = %control.name, "duplicate fieldName ignored");
                continue;
            }
            set.names_by_id
                .insert(control.field_id.clone(), control.name.clone());
            set.controls.insert(control.name.clone(), control);
        }
        set
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Control> {
        self.controls.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Control> {
        self.controls.get_mut(name)
    }

    /// Looks a control up by the `id` of the field it was built from.
    pub fn by_field_id(&self, field_id: &str) -> Option<&Control> {
        self.names_by_id
            .get(field_id)
            .and_then(|name| self.controls.get(name))
    }

    pub fn by_field_id_mut(&mut self, field_id: &str) -> Option<&mut Control> {
        let name = self.names_by_id.get(field_id)?;
        self.controls.get_mut(name)
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.controls.get(name).map(|control| &control.value)
    }

    pub fn set_value(&mut self, name: &str, value: Value) -> Result<(), ControlError> {
        self.controls
            .get_mut(name)
            .ok_or_else(|| ControlError::Unknown(name.to_string()))?
            .set_value(value);
        Ok(())
    }

    pub fn toggle_option(
        &mut self,
        name: &str,
        option: &str,
        checked: bool,
    ) -> Result<(), ControlError> {
        self.controls
            .get_mut(name)
            .ok_or_else(|| ControlError::Unknown(name.to_string()))?
            .toggle_option(option, checked)
    }

    /// Applies a `{ fieldName: value }` object, ignoring unknown keys.
    pub fn apply_values(&mut self, values: &Map<String, Value>) {
        for (name, value) in values {
            if let Some(control) = self.controls.get_mut(name) {
                control.set_value(value.clone());
            }
        }
    }

    pub fn restore_defaults(&mut self) {
        self.controls.values_mut().for_each(Control::restore_default);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Control> {
        self.controls.values()
    }

    /// Current values as a JSON object.
    pub fn values(&self) -> Map<String, Value> {
        self.controls
            .iter()
            .map(|(name, control)| (name.clone(), control.value.clone()))
            .collect()
    }
}
