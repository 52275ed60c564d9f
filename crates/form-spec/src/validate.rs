use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::controls::FieldPattern;
use crate::spec::row::RowLayoutConfig;
use crate::spec::schema::FormSchema;
use crate::spec::step::StepFormConfig;

pub const MIN_STEPS: usize = 2;
pub const MAX_STEPS: usize = 10;

/// Authoring error found while checking a schema before it is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SchemaError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_id: Option<String>,
}

impl SchemaError {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            path: None,
            step_id: None,
            field_id: None,
            row_id: None,
        }
    }

    fn at(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    fn for_step(mut self, step_id: &str) -> Self {
        self.step_id = Some(step_id.into());
        self
    }

    fn for_field(mut self, field_id: &str) -> Self {
        self.field_id = Some(field_id.into());
        self
    }

    fn for_row(mut self, row_id: &str) -> Self {
        self.row_id = Some(row_id.into());
        self
    }
}

/// Checks step-form configuration consistency.
///
/// Schemas without an enabled `stepForm` always pass so that documents authored
/// before step forms existed keep validating. Every problem is collected; nothing
/// short-circuits.
pub fn validate(schema: &FormSchema) -> Result<(), Vec<SchemaError>> {
    let Some(config) = schema.step_form() else {
        return Ok(());
    };

    let mut errors = Vec::new();
    check_step_count(config, &mut errors);
    check_duplicate_step_ids(config, &mut errors);
    check_step_attributes(config, &mut errors);
    check_step_orders(config, &mut errors);
    check_field_step_references(schema, config, &mut errors);
    check_row_step_references(schema, config, &mut errors);

    finish("step configuration", errors)
}

/// Checks field names, row geometry, and conditional references.
///
/// Runs regardless of step mode; the authoring path applies it next to [`validate`].
pub fn validate_layout(schema: &FormSchema) -> Result<(), Vec<SchemaError>> {
    let mut errors = Vec::new();
    check_field_names(schema, &mut errors);
    check_conditionals(schema, &mut errors);
    check_patterns(schema, &mut errors);
    if let Some(layout) = &schema.settings.row_layout {
        check_rows(&layout.rows, &mut errors);
    }
    check_field_positions(schema, &mut errors);

    finish("layout", errors)
}

/// Runs [`validate`] and [`validate_layout`] and merges their errors.
pub fn validate_for_persistence(schema: &FormSchema) -> Result<(), Vec<SchemaError>> {
    let mut errors = validate(schema).err().unwrap_or_default();
    errors.extend(validate_layout(schema).err().unwrap_or_default());
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn finish(scope: &str, errors: Vec<SchemaError>) -> Result<(), Vec<SchemaError>> {
    if errors.is_empty() {
        Ok(())
    } else {
        tracing::debug!(scope, count = errors.len(), "schema rejected");
        Err(errors)
    }
}

fn step_path(index: usize) -> String {
    format!("/settings/stepForm/steps/{}", index)
}

fn check_step_count(config: &StepFormConfig, errors: &mut Vec<SchemaError>) {
    let count = config.steps.len();
    if !(MIN_STEPS..=MAX_STEPS).contains(&count) {
        errors.push(
            SchemaError::new(
                "step_count",
                format!(
                    "step forms must have between {} and {} steps (found {})",
                    MIN_STEPS, MAX_STEPS, count
                ),
            )
            .at("/settings/stepForm/steps"),
        );
    }
}

fn check_duplicate_step_ids(config: &StepFormConfig, errors: &mut Vec<SchemaError>) {
    let mut seen = BTreeSet::new();
    let mut reported = BTreeSet::new();
    for (index, step) in config.steps.iter().enumerate() {
        if step.id.is_empty() {
            continue;
        }
        if !seen.insert(step.id.as_str()) && reported.insert(step.id.as_str()) {
            errors.push(
                SchemaError::new(
                    "duplicate_step_id",
                    format!("step id '{}' is used more than once", step.id),
                )
                .at(step_path(index))
                .for_step(&step.id),
            );
        }
    }
}

fn check_step_attributes(config: &StepFormConfig, errors: &mut Vec<SchemaError>) {
    for (index, step) in config.steps.iter().enumerate() {
        if step.id.trim().is_empty() {
            errors.push(
                SchemaError::new("missing_step_id", format!("step {} has no id", index))
                    .at(step_path(index)),
            );
        }
        if step.title.trim().is_empty() {
            let error = SchemaError::new("missing_step_title", format!("step {} has no title", index))
                .at(step_path(index));
            errors.push(if step.id.is_empty() {
                error
            } else {
                error.for_step(&step.id)
            });
        }
    }
}

fn check_step_orders(config: &StepFormConfig, errors: &mut Vec<SchemaError>) {
    let mut orders = config.steps.iter().map(|step| step.order).collect::<Vec<_>>();
    orders.sort_unstable();

    let before = orders.len();
    orders.dedup();
    if orders.len() != before {
        errors.push(
            SchemaError::new("duplicate_step_order", "step orders must be unique")
                .at("/settings/stepForm/steps"),
        );
    }

    let sequential = orders
        .iter()
        .enumerate()
        .all(|(expected, order)| *order == expected as i64);
    if !sequential {
        errors.push(
            SchemaError::new(
                "non_sequential_step_order",
                "step orders must be sequential starting from 0",
            )
            .at("/settings/stepForm/steps"),
        );
    }
}

fn check_field_step_references(
    schema: &FormSchema,
    config: &StepFormConfig,
    errors: &mut Vec<SchemaError>,
) {
    for (index, field) in schema.fields.iter().enumerate() {
        if let Some(step_id) = field.step_id()
            && !config.contains(step_id)
        {
            errors.push(
                SchemaError::new(
                    "unknown_step_reference",
                    format!(
                        "field '{}' references step '{}' which does not exist",
                        field.id, step_id
                    ),
                )
                .at(format!("/fields/{}/position/stepId", index))
                .for_field(&field.id)
                .for_step(step_id),
            );
        }
    }
}

fn check_row_step_references(
    schema: &FormSchema,
    config: &StepFormConfig,
    errors: &mut Vec<SchemaError>,
) {
    let Some(layout) = &schema.settings.row_layout else {
        return;
    };
    for (index, row) in layout.rows.iter().enumerate() {
        if let Some(step_id) = row.step_id.as_deref().filter(|id| !id.is_empty())
            && !config.contains(step_id)
        {
            errors.push(
                SchemaError::new(
                    "unknown_row_step_reference",
                    format!(
                        "row '{}' references step '{}' which does not exist",
                        row.row_id, step_id
                    ),
                )
                .at(format!("/settings/rowLayout/rows/{}/stepId", index))
                .for_row(&row.row_id)
                .for_step(step_id),
            );
        }
    }
}

fn check_field_names(schema: &FormSchema, errors: &mut Vec<SchemaError>) {
    let mut seen: BTreeMap<&str, &str> = BTreeMap::new();
    for (index, field) in schema.fields.iter().enumerate() {
        if field.kind.is_display() {
            continue;
        }
        let Some(name) = field.key() else {
            errors.push(
                SchemaError::new(
                    "missing_field_name",
                    format!("input field '{}' has no fieldName", field.id),
                )
                .at(format!("/fields/{}/fieldName", index))
                .for_field(&field.id),
            );
            continue;
        };
        match seen.entry(name) {
            Entry::Occupied(first) => errors.push(
                SchemaError::new(
                    "duplicate_field_name",
                    format!(
                        "fieldName '{}' is shared by fields '{}' and '{}'",
                        name,
                        first.get(),
                        field.id
                    ),
                )
                .at(format!("/fields/{}/fieldName", index))
                .for_field(&field.id),
            ),
            Entry::Vacant(slot) => {
                slot.insert(field.id.as_str());
            }
        }
    }
}

fn check_conditionals(schema: &FormSchema, errors: &mut Vec<SchemaError>) {
    for (index, field) in schema.fields.iter().enumerate() {
        let Some(rule) = &field.conditional else {
            continue;
        };
        let path = format!("/fields/{}/conditional/watchFieldId", index);
        if rule.watch_field_id == field.id {
            errors.push(
                SchemaError::new(
                    "self_reference",
                    format!("field '{}' cannot watch itself", field.id),
                )
                .at(path)
                .for_field(&field.id),
            );
        } else if schema.field(&rule.watch_field_id).is_none() {
            errors.push(
                SchemaError::new(
                    "unknown_watch_field",
                    format!(
                        "field '{}' watches '{}' which does not exist",
                        field.id, rule.watch_field_id
                    ),
                )
                .at(path)
                .for_field(&field.id),
            );
        }
    }
}

fn check_patterns(schema: &FormSchema, errors: &mut Vec<SchemaError>) {
    for (index, field) in schema.fields.iter().enumerate() {
        let Some(pattern) = field
            .validation
            .as_ref()
            .and_then(|validation| validation.pattern.as_deref())
            .filter(|pattern| !pattern.is_empty())
        else {
            continue;
        };
        if let Err(err) = FieldPattern::new(pattern) {
            errors.push(
                SchemaError::new(
                    "invalid_pattern",
                    format!("field '{}' has an invalid pattern: {}", field.id, err),
                )
                .at(format!("/fields/{}/validation/pattern", index))
                .for_field(&field.id),
            );
        }
    }
}

fn check_rows(rows: &[RowLayoutConfig], errors: &mut Vec<SchemaError>) {
    let mut seen = BTreeSet::new();
    for (index, row) in rows.iter().enumerate() {
        let path = format!("/settings/rowLayout/rows/{}", index);
        if !seen.insert(row.row_id.as_str()) {
            errors.push(
                SchemaError::new(
                    "duplicate_row_id",
                    format!("row id '{}' is used more than once", row.row_id),
                )
                .at(path.clone())
                .for_row(&row.row_id),
            );
        }
        if row.column_count == 0 {
            errors.push(
                SchemaError::new(
                    "invalid_column_count",
                    format!("row '{}' must have at least one column", row.row_id),
                )
                .at(format!("{}/columnCount", path))
                .for_row(&row.row_id),
            );
        }
        if let Some(widths) = &row.column_widths
            && widths.len() != row.column_count
        {
            errors.push(
                SchemaError::new(
                    "column_widths_mismatch",
                    format!(
                        "row '{}' declares {} columns but {} widths",
                        row.row_id,
                        row.column_count,
                        widths.len()
                    ),
                )
                .at(format!("{}/columnWidths", path))
                .for_row(&row.row_id),
            );
        }
        for sub in &row.sub_columns {
            if sub.column_index >= row.column_count {
                errors.push(
                    SchemaError::new(
                        "column_out_of_range",
                        format!(
                            "row '{}' defines sub-columns for missing column {}",
                            row.row_id, sub.column_index
                        ),
                    )
                    .at(format!("{}/subColumns", path))
                    .for_row(&row.row_id),
                );
            }
            if let Some(widths) = &sub.sub_column_widths
                && widths.len() != sub.sub_column_count
            {
                errors.push(
                    SchemaError::new(
                        "sub_column_widths_mismatch",
                        format!(
                            "row '{}' column {} declares {} sub-columns but {} widths",
                            row.row_id,
                            sub.column_index,
                            sub.sub_column_count,
                            widths.len()
                        ),
                    )
                    .at(format!("{}/subColumns", path))
                    .for_row(&row.row_id),
                );
            }
        }
    }
}

fn check_field_positions(schema: &FormSchema, errors: &mut Vec<SchemaError>) {
    let Some(layout) = schema.row_layout() else {
        return;
    };
    for (index, field) in schema.fields.iter().enumerate() {
        let (Some(position), Some(row_id)) = (&field.position, field.row_id()) else {
            continue;
        };
        let path = format!("/fields/{}/position", index);
        let Some(row) = layout.rows.iter().find(|row| row.row_id == row_id) else {
            errors.push(
                SchemaError::new(
                    "unknown_row",
                    format!("field '{}' is placed in unknown row '{}'", field.id, row_id),
                )
                .at(path)
                .for_field(&field.id)
                .for_row(row_id),
            );
            continue;
        };
        let sub_out_of_range = position.sub_column_index.is_some_and(|sub_index| {
            row.sub_columns_for(position.column_index)
                .is_none_or(|sub| sub_index >= sub.sub_column_count)
        });
        if position.column_index >= row.column_count || sub_out_of_range {
            errors.push(
                SchemaError::new(
                    "column_out_of_range",
                    format!(
                        "field '{}' is placed outside the columns of row '{}'",
                        field.id, row_id
                    ),
                )
                .at(path)
                .for_field(&field.id)
                .for_row(row_id),
            );
        }
    }
}
