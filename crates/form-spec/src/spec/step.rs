use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One page of a multi-step form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormStep {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub order: i64,
}

/// Step-form settings. Absent or disabled means a single-page form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct StepFormConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub steps: Vec<FormStep>,
}

impl StepFormConfig {
    /// Steps sorted by `order`, ties kept in declaration order.
    pub fn ordered_steps(&self) -> Vec<&FormStep> {
        let mut steps = self.steps.iter().collect::<Vec<_>>();
        steps.sort_by_key(|step| step.order);
        steps
    }

    /// Position of `step_id` in the ordered step list.
    pub fn index_of(&self, step_id: &str) -> Option<usize> {
        self.ordered_steps()
            .iter()
            .position(|step| step.id == step_id)
    }

    pub fn contains(&self, step_id: &str) -> bool {
        self.steps.iter().any(|step| step.id == step_id)
    }
}
