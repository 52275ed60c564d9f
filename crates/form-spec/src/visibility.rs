use std::collections::BTreeMap;

use serde_json::Value;

use crate::controls::{ControlSet, display_string};
use crate::spec::conditional::{ConditionalOperator, ConditionalRule};
use crate::spec::field::FormField;
use crate::spec::schema::FormSchema;

/// Visibility per field `id`.
pub type VisibilityMap = BTreeMap<String, bool>;

/// Whether `field` should be shown given the current control values.
///
/// Fields without a rule are always visible. A rule whose watched field has no
/// control fails open.
pub fn is_visible(field: &FormField, controls: &ControlSet) -> bool {
    let Some(rule) = &field.conditional else {
        return true;
    };
    match controls.by_field_id(&rule.watch_field_id) {
        Some(watched) => evaluate(rule, &watched.value),
        None => {
            tracing::warn!(
                field = %field.id,
                watch = %rule.watch_field_id,
                "conditional watches a missing control; showing field"
            );
            true
        }
    }
}

/// Applies `rule.operator` to the watched value and the rule comparand.
pub fn evaluate(rule: &ConditionalRule, watched: &Value) -> bool {
    match rule.operator {
        ConditionalOperator::Equals => strict_equals(watched, &rule.value),
        ConditionalOperator::NotEquals => !strict_equals(watched, &rule.value),
        ConditionalOperator::Contains => match watched {
            Value::String(text) => text.contains(&display_string(&rule.value)),
            _ => false,
        },
        ConditionalOperator::GreaterThan => coerce_number(watched) > coerce_number(&rule.value),
        ConditionalOperator::LessThan => coerce_number(watched) < coerce_number(&rule.value),
    }
}

fn strict_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

/// Loose numeric coercion: blanks and null are zero, unparseable input is NaN.
fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(flag) => f64::from(u8::from(*flag)),
        Value::Number(number) => number.as_f64().unwrap_or(f64::NAN),
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse().unwrap_or(f64::NAN)
            }
        }
        _ => f64::NAN,
    }
}

/// Evaluates every field of the schema against the current values.
pub fn resolve_visibility(schema: &FormSchema, controls: &ControlSet) -> VisibilityMap {
    schema
        .fields
        .iter()
        .map(|field| (field.id.clone(), is_visible(field, controls)))
        .collect()
}

/// Re-runs visibility after every value change and keeps hidden fields cleared.
#[derive(Debug, Clone, Default)]
pub struct VisibilityTracker {
    current: VisibilityMap,
}

impl VisibilityTracker {
    /// Initial evaluation. Fields hidden at mount are cleared like any other transition.
    pub fn new(schema: &FormSchema, controls: &mut ControlSet) -> Self {
        let mut tracker = Self::default();
        tracker.refresh(schema, controls);
        tracker
    }

    pub fn map(&self) -> &VisibilityMap {
        &self.current
    }

    pub fn is_visible(&self, field_id: &str) -> bool {
        self.current.get(field_id).copied().unwrap_or(true)
    }

    /// Single whole-form pass. Returns the ids that turned hidden on this pass.
    ///
    /// Every hidden control is cleared, including ones that were written while
    /// already hidden. Clearing does not trigger another pass, so dependents of
    /// a cleared field keep their old visibility until [`settle`](Self::settle).
    pub fn refresh(&mut self, schema: &FormSchema, controls: &mut ControlSet) -> Vec<String> {
        let next = resolve_visibility(schema, controls);
        let mut hidden = Vec::new();
        for (field_id, visible) in &next {
            if *visible {
                continue;
            }
            if let Some(control) = controls.by_field_id_mut(field_id)
                && !control.is_cleared()
            {
                control.clear();
                tracing::debug!(field = %field_id, "cleared hidden field");
            }
            if self.current.get(field_id).copied().unwrap_or(true) {
                hidden.push(field_id.clone());
            }
        }
        self.current = next;
        hidden
    }

    /// Repeats [`refresh`](Self::refresh) until clearing no longer changes the
    /// map, so chained conditionals are resolved before values leave the form.
    ///
    /// Bounded by the field count; each extra pass needs a newly cleared field.
    pub fn settle(&mut self, schema: &FormSchema, controls: &mut ControlSet) -> Vec<String> {
        let mut hidden = self.refresh(schema, controls);
        for _ in 0..schema.fields.len() {
            if resolve_visibility(schema, controls) == self.current {
                break;
            }
            hidden.extend(self.refresh(schema, controls));
        }
        hidden
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule(operator: ConditionalOperator, value: Value) -> ConditionalRule {
        ConditionalRule {
            watch_field_id: "w".into(),
            operator,
            value,
        }
    }

    #[test]
    fn equality_is_strict_but_numeric_aware() {
        let equals = rule(ConditionalOperator::Equals, json!(5));
        assert!(evaluate(&equals, &json!(5.0)));
        assert!(!evaluate(&equals, &json!("5")));
        let not_equals = rule(ConditionalOperator::NotEquals, json!("yes"));
        assert!(evaluate(&not_equals, &json!("no")));
        assert!(!evaluate(&not_equals, &json!("yes")));
    }

    #[test]
    fn contains_requires_string_watch_value() {
        let contains = rule(ConditionalOperator::Contains, json!(42));
        assert!(evaluate(&contains, &json!("order-42-x")));
        assert!(!evaluate(&contains, &json!(["42"])));
        assert!(!evaluate(&contains, &json!(42)));
    }

    #[test]
    fn ordering_coerces_to_numbers() {
        let greater = rule(ConditionalOperator::GreaterThan, json!("10"));
        assert!(evaluate(&greater, &json!("11")));
        assert!(!evaluate(&greater, &json!(10)));
        assert!(!evaluate(&greater, &json!("abc")));
        let less = rule(ConditionalOperator::LessThan, json!(1));
        assert!(evaluate(&less, &json!("")));
        assert!(evaluate(&less, &Value::Null));
        assert!(!evaluate(&less, &json!(true)));
    }

    #[test]
    fn dangling_watch_fails_open() {
        let schema: FormSchema = serde_json::from_value(json!({
            "fields": [
                { "id": "f", "type": "TEXT", "fieldName": "f",
                  "conditional": { "watchFieldId": "ghost", "operator": "equals", "value": "x" } }
            ]
        }))
        .expect("schema");
        let controls = ControlSet::build(&schema);
        assert!(is_visible(&schema.fields[0], &controls));
    }

    fn chain_schema() -> FormSchema {
        serde_json::from_value(json!({
            "fields": [
                { "id": "a", "type": "TEXT", "fieldName": "a" },
                { "id": "b", "type": "TEXT", "fieldName": "b",
                  "conditional": { "watchFieldId": "a", "operator": "equals", "value": "yes" } },
                { "id": "c", "type": "TEXT", "fieldName": "c",
                  "conditional": { "watchFieldId": "b", "operator": "equals", "value": "x" } }
            ]
        }))
        .expect("schema")
    }

    #[test]
    fn refresh_clears_values_written_while_hidden() {
        let schema = chain_schema();
        let mut controls = ControlSet::build(&schema);
        let mut tracker = VisibilityTracker::new(&schema, &mut controls);
        assert!(!tracker.is_visible("b"));

        controls.set_value("b", json!("late")).expect("b");
        let hidden = tracker.refresh(&schema, &mut controls);
        assert!(hidden.is_empty());
        assert_eq!(controls.by_field_id("b").map(|c| &c.value), Some(&Value::Null));
    }

    #[test]
    fn settle_resolves_chained_conditionals() {
        let schema = chain_schema();
        let mut controls = ControlSet::build(&schema);
        let mut tracker = VisibilityTracker::new(&schema, &mut controls);
        controls.set_value("a", json!("yes")).expect("a");
        tracker.refresh(&schema, &mut controls);
        controls.set_value("b", json!("x")).expect("b");
        tracker.refresh(&schema, &mut controls);
        controls.set_value("c", json!("secret")).expect("c");
        tracker.refresh(&schema, &mut controls);

        controls.set_value("a", json!("no")).expect("a");
        assert_eq!(tracker.refresh(&schema, &mut controls), vec!["b"]);
        assert!(tracker.is_visible("c"));

        assert_eq!(tracker.settle(&schema, &mut controls), vec!["c"]);
        assert!(!tracker.is_visible("c"));
        assert_eq!(controls.by_field_id("c").map(|c| &c.value), Some(&Value::Null));
    }
}
