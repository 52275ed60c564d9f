use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison applied between a watched control value and the rule comparand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum ConditionalOperator {
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
}

impl ConditionalOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionalOperator::Equals => "equals",
            ConditionalOperator::NotEquals => "notEquals",
            ConditionalOperator::Contains => "contains",
            ConditionalOperator::GreaterThan => "greaterThan",
            ConditionalOperator::LessThan => "lessThan",
        }
    }
}

/// Visibility predicate tying a field to another field's current value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalRule {
    /// `id` of the watched field (not its `fieldName`).
    pub watch_field_id: String,
    pub operator: ConditionalOperator,
    #[serde(default)]
    pub value: Value,
}
