use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::spec::conditional::ConditionalRule;

/// Closed catalogue of field types, split into input and display elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    Text,
    Email,
    Number,
    Textarea,
    Password,
    Phone,
    Url,
    Date,
    Time,
    Select,
    Radio,
    Checkbox,
    Toggle,
    File,
    Heading,
    Paragraph,
    Divider,
    Image,
    Group,
}

impl FieldType {
    /// Display elements never receive a control.
    pub fn is_display(&self) -> bool {
        matches!(
            self,
            FieldType::Heading
                | FieldType::Paragraph
                | FieldType::Divider
                | FieldType::Image
                | FieldType::Group
        )
    }

    pub fn is_input(&self) -> bool {
        !self.is_display()
    }

    /// Checkbox and toggle fields, which hold booleans unless options are set.
    pub fn is_boolean_like(&self) -> bool {
        matches!(self, FieldType::Checkbox | FieldType::Toggle)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "TEXT",
            FieldType::Email => "EMAIL",
            FieldType::Number => "NUMBER",
            FieldType::Textarea => "TEXTAREA",
            FieldType::Password => "PASSWORD",
            FieldType::Phone => "PHONE",
            FieldType::Url => "URL",
            FieldType::Date => "DATE",
            FieldType::Time => "TIME",
            FieldType::Select => "SELECT",
            FieldType::Radio => "RADIO",
            FieldType::Checkbox => "CHECKBOX",
            FieldType::Toggle => "TOGGLE",
            FieldType::File => "FILE",
            FieldType::Heading => "HEADING",
            FieldType::Paragraph => "PARAGRAPH",
            FieldType::Divider => "DIVIDER",
            FieldType::Image => "IMAGE",
            FieldType::Group => "GROUP",
        }
    }
}

/// Choice offered by select, radio, and checkbox-group fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldOption {
    #[serde(default)]
    pub label: String,
    pub value: String,
}

/// Bounds and patterns enforced on a field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct FieldValidation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Replaces built-in messages; may use `{{label}}`-style placeholders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Placement of a field inside the row layout and, optionally, a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct FieldPosition {
    #[serde(default)]
    pub row_id: String,
    #[serde(default)]
    pub column_index: usize,
    #[serde(default)]
    pub order_in_column: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_column_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
}

/// One element of a form schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub order: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<FieldValidation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<FieldOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional: Option<ConditionalRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<FieldPosition>,
}

impl FormField {
    /// Control key for input fields; `None` for display elements and unnamed inputs.
    pub fn key(&self) -> Option<&str> {
        if self.kind.is_display() {
            return None;
        }
        self.field_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
    }

    /// Non-empty option list, if any.
    pub fn choices(&self) -> Option<&[FieldOption]> {
        self.options
            .as_deref()
            .filter(|options| !options.is_empty())
    }

    /// A checkbox with options is a multi-select group serialized as a comma-joined string.
    pub fn is_checkbox_group(&self) -> bool {
        self.kind == FieldType::Checkbox && self.choices().is_some()
    }

    pub fn option_values(&self) -> Vec<&str> {
        self.choices()
            .map(|options| options.iter().map(|option| option.value.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn step_id(&self) -> Option<&str> {
        self.position
            .as_ref()
            .and_then(|position| position.step_id.as_deref())
            .filter(|step_id| !step_id.is_empty())
    }

    pub fn row_id(&self) -> Option<&str> {
        self.position
            .as_ref()
            .map(|position| position.row_id.as_str())
            .filter(|row_id| !row_id.is_empty())
    }
}
