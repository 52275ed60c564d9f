use serde::{Deserialize, Serialize};

use crate::spec::field::FormField;
use crate::spec::row::RowLayoutConfig;
use crate::spec::schema::FormSchema;
use crate::steps::fields_for_step;
use crate::visibility::VisibilityTracker;

const DEFAULT_WIDTH: &str = "1fr";

/// Column of a rendered row holding field ids in display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutColumn {
    pub width: String,
    pub fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_columns: Vec<LayoutColumn>,
}

impl LayoutColumn {
    fn empty(width: &str) -> Self {
        Self {
            width: width.to_string(),
            fields: Vec::new(),
            sub_columns: Vec::new(),
        }
    }
}

/// Row of the rendered layout. `row_id` is `None` for the implicit row that
/// collects unpositioned fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutRow {
    pub row_id: Option<String>,
    pub columns: Vec<LayoutColumn>,
}

/// Lays out the visible fields of `step` (or the whole form when `step` is `None`).
pub fn layout_for(
    schema: &FormSchema,
    step: Option<usize>,
    visibility: &VisibilityTracker,
) -> Vec<LayoutRow> {
    let mut fields = match step {
        Some(index) => fields_for_step(schema, index),
        None => schema.fields.iter().collect(),
    };
    fields.retain(|field| visibility.is_visible(&field.id));
    fields.sort_by_key(|field| field.order);

    let Some(layout) = schema.row_layout() else {
        return implicit_row(&fields).into_iter().collect();
    };

    let mut rows = layout.rows.iter().collect::<Vec<_>>();
    rows.sort_by_key(|row| row.order);

    let mut placed = Vec::new();
    let mut rendered = Vec::new();
    for row in rows {
        let members = fields
            .iter()
            .copied()
            .filter(|field| field.row_id() == Some(row.row_id.as_str()))
            .collect::<Vec<_>>();
        let on_step = step.is_none_or(|index| schema.step_index_for_row(row) == index);
        if members.is_empty() && !on_step {
            continue;
        }
        let (built, used) = build_row(row, &members);
        placed.extend(used);
        rendered.push(built);
    }

    let leftovers = fields
        .iter()
        .copied()
        .filter(|field| !placed.contains(&field.id))
        .collect::<Vec<_>>();
    rendered.extend(implicit_row(&leftovers));
    rendered
}

fn implicit_row(fields: &[&FormField]) -> Option<LayoutRow> {
    if fields.is_empty() {
        return None;
    }
    let mut column = LayoutColumn::empty(DEFAULT_WIDTH);
    column.fields = fields.iter().map(|field| field.id.clone()).collect();
    Some(LayoutRow {
        row_id: None,
        columns: vec![column],
    })
}

fn build_row(row: &RowLayoutConfig, members: &[&FormField]) -> (LayoutRow, Vec<String>) {
    let mut columns = (0..row.column_count)
        .map(|index| {
            let width = row
                .column_widths
                .as_ref()
                .and_then(|widths| widths.get(index))
                .map(String::as_str)
                .unwrap_or(DEFAULT_WIDTH);
            let mut column = LayoutColumn::empty(width);
            if let Some(sub) = row.sub_columns_for(index) {
                column.sub_columns = (0..sub.sub_column_count)
                    .map(|sub_index| {
                        let width = sub
                            .sub_column_widths
                            .as_ref()
                            .and_then(|widths| widths.get(sub_index))
                            .map(String::as_str)
                            .unwrap_or(DEFAULT_WIDTH);
                        LayoutColumn::empty(width)
                    })
                    .collect();
            }
            column
        })
        .collect::<Vec<_>>();

    let mut positioned = members
        .iter()
        .filter_map(|field| field.position.as_ref().map(|position| (*field, position)))
        .collect::<Vec<_>>();
    positioned.sort_by_key(|(_, position)| position.order_in_column);

    let mut used = Vec::new();
    for (field, position) in positioned {
        let Some(column) = columns.get_mut(position.column_index) else {
            continue;
        };
        let target = match position.sub_column_index {
            Some(sub_index) => match column.sub_columns.get_mut(sub_index) {
                Some(sub) => &mut sub.fields,
                None => continue,
            },
            None => &mut column.fields,
        };
        target.push(field.id.clone());
        used.push(field.id.clone());
    }

    (
        LayoutRow {
            row_id: Some(row.row_id.clone()),
            columns,
        },
        used,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::ControlSet;
    use serde_json::json;

    #[test]
    fn fields_land_in_columns_and_leftovers_trail() {
        let schema: FormSchema = serde_json::from_value(json!({
            "fields": [
                { "id": "b", "type": "TEXT", "fieldName": "b", "order": 2,
                  "position": { "rowId": "r1", "columnIndex": 1, "orderInColumn": 0 } },
                { "id": "a", "type": "TEXT", "fieldName": "a", "order": 1,
                  "position": { "rowId": "r1", "columnIndex": 0, "orderInColumn": 1 } },
                { "id": "a0", "type": "TEXT", "fieldName": "a0", "order": 3,
                  "position": { "rowId": "r1", "columnIndex": 0, "orderInColumn": 0 } },
                { "id": "s", "type": "TEXT", "fieldName": "s", "order": 4,
                  "position": { "rowId": "r1", "columnIndex": 1, "orderInColumn": 1, "subColumnIndex": 1 } },
                { "id": "loose", "type": "TEXT", "fieldName": "loose", "order": 0 }
            ],
            "settings": {
                "rowLayout": {
                    "enabled": true,
                    "rows": [{
                        "rowId": "r1", "columnCount": 2, "columnWidths": ["2fr", "1fr"],
                        "subColumns": [{ "columnIndex": 1, "subColumnCount": 2 }]
                    }]
                }
            }
        }))
        .expect("schema");
        let mut controls = ControlSet::build(&schema);
        let visibility = VisibilityTracker::new(&schema, &mut controls);
        let rows = layout_for(&schema, None, &visibility);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].columns[0].width, "2fr");
        assert_eq!(rows[0].columns[0].fields, vec!["a0", "a"]);
        assert_eq!(rows[0].columns[1].fields, vec!["b"]);
        assert_eq!(rows[0].columns[1].sub_columns[1].fields, vec!["s"]);
        assert_eq!(rows[1].row_id, None);
        assert_eq!(rows[1].columns[0].fields, vec!["loose"]);
    }
}
