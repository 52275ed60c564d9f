use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::field::FormField;
use crate::spec::row::{RowLayoutConfig, RowLayoutSettings};
use crate::spec::step::StepFormConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub enum LabelPosition {
    #[default]
    Top,
    Left,
    Hidden,
}

/// Presentation hints for the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSettings {
    #[serde(default = "default_columns")]
    pub columns: usize,
    #[serde(default)]
    pub label_position: LabelPosition,
}

fn default_columns() -> usize {
    1
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            columns: default_columns(),
            label_position: LabelPosition::default(),
        }
    }
}

/// Behaviour after a successful submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(default)]
    pub allow_multiple_submissions: bool,
    #[serde(default)]
    pub show_reset_button: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct FormSettings {
    #[serde(default)]
    pub layout: LayoutSettings,
    #[serde(default)]
    pub submission: SubmissionSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_layout: Option<RowLayoutSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_form: Option<StepFormConfig>,
}

/// The authored form document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct FormSchema {
    #[serde(default)]
    pub fields: Vec<FormField>,
    #[serde(default)]
    pub settings: FormSettings,
}

impl FormSchema {
    pub fn input_fields(&self) -> impl Iterator<Item = &FormField> {
        self.fields.iter().filter(|field| field.key().is_some())
    }

    pub fn field(&self, id: &str) -> Option<&FormField> {
        self.fields.iter().find(|field| field.id == id)
    }

    pub fn field_by_name(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|field| field.key() == Some(name))
    }

    /// Fields sorted by their fallback `order`.
    pub fn ordered_fields(&self) -> Vec<&FormField> {
        let mut fields = self.fields.iter().collect::<Vec<_>>();
        fields.sort_by_key(|field| field.order);
        fields
    }

    /// Step configuration when step mode is switched on.
    pub fn step_form(&self) -> Option<&StepFormConfig> {
        self.settings
            .step_form
            .as_ref()
            .filter(|config| config.enabled)
    }

    /// Row layout when it is switched on.
    pub fn row_layout(&self) -> Option<&RowLayoutSettings> {
        self.settings
            .row_layout
            .as_ref()
            .filter(|layout| layout.enabled)
    }

    pub fn row(&self, row_id: &str) -> Option<&RowLayoutConfig> {
        self.row_layout()
            .and_then(|layout| layout.rows.iter().find(|row| row.row_id == row_id))
    }

    /// Step index a row renders on. Rows without a known `stepId` belong to step 0.
    pub fn step_index_for_row(&self, row: &RowLayoutConfig) -> usize {
        match (self.step_form(), row.step_id.as_deref()) {
            (Some(config), Some(step_id)) => config.index_of(step_id).unwrap_or(0),
            _ => 0,
        }
    }

    /// Step index a field renders on: its own `stepId`, then its row's, then step 0.
    pub fn step_index_for_field(&self, field: &FormField) -> usize {
        let Some(config) = self.step_form() else {
            return 0;
        };
        if let Some(step_id) = field.step_id() {
            return config.index_of(step_id).unwrap_or(0);
        }
        field
            .row_id()
            .and_then(|row_id| self.row(row_id))
            .map(|row| self.step_index_for_row(row))
            .unwrap_or(0)
    }
}

/// JSON Schema of the persisted [`FormSchema`] document, for authoring tools.
pub fn document_schema() -> serde_json::Value {
    schemars::schema_for!(FormSchema).to_value()
}
