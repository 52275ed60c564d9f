use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Nested columns inside one column of a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubColumnConfig {
    pub column_index: usize,
    pub sub_column_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_column_widths: Option<Vec<String>>,
}

/// A layout row with a fixed number of columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RowLayoutConfig {
    pub row_id: String,
    pub column_count: usize,
    /// Fractional-unit widths such as `"2fr"`, one per column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_widths: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_columns: Vec<SubColumnConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    #[serde(default)]
    pub order: i64,
}

impl RowLayoutConfig {
    pub fn sub_columns_for(&self, column_index: usize) -> Option<&SubColumnConfig> {
        self.sub_columns
            .iter()
            .find(|sub| sub.column_index == column_index)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct RowLayoutSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub rows: Vec<RowLayoutConfig>,
}
