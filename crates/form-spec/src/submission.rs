use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_cbor::{to_vec, value::to_value};
use serde_json::{Map, Value};

use crate::controls::{Control, ControlSet};
use crate::spec::field::{FieldType, FormField};
use crate::spec::schema::FormSchema;
use crate::steps::StepEvent;

/// Metadata sent alongside step-form submissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionMetadata {
    pub step_events: Vec<StepEvent>,
}

/// Body handed to the submission sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubmissionPayload {
    pub values: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SubmissionMetadata>,
}

impl SubmissionPayload {
    pub fn new(values: Map<String, Value>) -> Self {
        Self {
            values,
            metadata: None,
        }
    }

    pub fn with_step_events(mut self, step_events: Vec<StepEvent>) -> Self {
        self.metadata = Some(SubmissionMetadata { step_events });
        self
    }

    /// Serializes the payload as canonical CBOR bytes.
    pub fn to_cbor(&self) -> Result<Vec<u8>, serde_cbor::Error> {
        let canonical = to_value(self)?;
        to_vec(&canonical)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Converts control values into wire values, one entry per input field.
pub fn prepare_submission(schema: &FormSchema, controls: &ControlSet) -> Map<String, Value> {
    let mut values = Map::new();
    for field in &schema.fields {
        let Some(name) = field.key() else {
            continue;
        };
        let Some(control) = controls.get(name) else {
            continue;
        };
        values.insert(name.to_string(), wire_value(field, control));
    }
    values
}

/// Wire representation of one control.
pub fn wire_value(field: &FormField, control: &Control) -> Value {
    match &control.selections {
        Some(selections) if field.is_checkbox_group() => {
            let allowed = field.option_values();
            let mut joined: Vec<&str> = Vec::new();
            for selection in selections {
                if allowed.contains(&selection.as_str()) && !joined.contains(&selection.as_str()) {
                    joined.push(selection);
                }
            }
            Value::String(joined.join(","))
        }
        _ => control.value.clone(),
    }
}

/// JSON Schema describing the wire payload of `schema`.
pub fn submission_schema(schema: &FormSchema) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for field in schema.input_fields() {
        let Some(name) = field.key() else {
            continue;
        };
        properties.insert(name.to_string(), field_schema(field));
        if field.required {
            required.push(Value::String(name.to_string()));
        }
    }

    let mut root = Map::new();
    root.insert("type".into(), Value::String("object".into()));
    root.insert("properties".into(), Value::Object(properties));
    if !required.is_empty() {
        root.insert("required".into(), Value::Array(required));
    }
    Value::Object(root)
}

fn field_schema(field: &FormField) -> Value {
    let mut schema = Map::new();
    if field.is_checkbox_group() {
        schema.insert("type".into(), Value::String("string".into()));
        schema.insert(
            "description".into(),
            Value::String("comma-separated option values".into()),
        );
        return Value::Object(schema);
    }
    let kind = match field.kind {
        FieldType::Checkbox | FieldType::Toggle => "boolean",
        FieldType::Number => "number",
        _ => "string",
    };
    schema.insert("type".into(), Value::String(kind.into()));
    if let Some(validation) = &field.validation {
        if let Some(min_length) = validation.min_length {
            schema.insert("minLength".into(), Value::from(min_length));
        }
        if let Some(max_length) = validation.max_length {
            schema.insert("maxLength".into(), Value::from(max_length));
        }
        if let Some(min) = validation.min {
            schema.insert("minimum".into(), Value::from(min));
        }
        if let Some(max) = validation.max {
            schema.insert("maximum".into(), Value::from(max));
        }
        if let Some(pattern) = &validation.pattern {
            schema.insert("pattern".into(), Value::String(pattern.clone()));
        }
    }
    if matches!(field.kind, FieldType::Select | FieldType::Radio)
        && let Some(options) = field.choices()
    {
        schema.insert(
            "enum".into(),
            Value::Array(
                options
                    .iter()
                    .map(|option| Value::String(option.value.clone()))
                    .collect(),
            ),
        );
    }
    if field.kind == FieldType::Email {
        schema.insert("format".into(), Value::String("email".into()));
    }
    Value::Object(schema)
}
