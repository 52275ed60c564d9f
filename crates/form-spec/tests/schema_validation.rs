use form_spec::{FormSchema, validate, validate_for_persistence, validate_layout};
use serde_json::{Value, json};

fn fixture(name: &str) -> FormSchema {
    let raw = match name {
        "signup_steps" => include_str!("fixtures/signup_steps.json"),
        "contact_form" => include_str!("fixtures/contact_form.json"),
        other => panic!("unknown fixture {other}"),
    };
    serde_json::from_str(raw).expect("fixture parses")
}

fn stepped(steps: Value) -> FormSchema {
    serde_json::from_value(json!({
        "fields": [],
        "settings": { "stepForm": { "enabled": true, "steps": steps } }
    }))
    .expect("schema")
}

fn codes(schema: &FormSchema) -> Vec<String> {
    validate(schema)
        .err()
        .unwrap_or_default()
        .into_iter()
        .map(|error| error.code)
        .collect()
}

fn steps_with_orders(orders: &[i64]) -> Value {
    Value::Array(
        orders
            .iter()
            .enumerate()
            .map(|(index, order)| json!({ "id": format!("s{index}"), "title": "Step", "order": order }))
            .collect(),
    )
}

#[test]
fn fixtures_pass_every_check() {
    for name in ["signup_steps", "contact_form"] {
        let schema = fixture(name);
        assert!(validate_for_persistence(&schema).is_ok(), "{name} should be valid");
    }
}

#[test]
fn step_count_must_be_between_two_and_ten() {
    assert_eq!(codes(&stepped(steps_with_orders(&[0]))), ["step_count"]);
    let eleven = (0..11).collect::<Vec<_>>();
    assert_eq!(codes(&stepped(steps_with_orders(&eleven))), ["step_count"]);
    assert!(codes(&stepped(steps_with_orders(&[0, 1]))).is_empty());
    let ten = (0..10).collect::<Vec<_>>();
    assert!(codes(&stepped(steps_with_orders(&ten))).is_empty());
}

#[test]
fn duplicate_step_ids_are_reported() {
    let schema = stepped(json!([
        { "id": "a", "title": "One", "order": 0 },
        { "id": "a", "title": "Two", "order": 1 }
    ]));
    assert_eq!(codes(&schema), ["duplicate_step_id"]);
}

#[test]
fn step_orders_must_be_unique_and_gapless() {
    assert_eq!(
        codes(&stepped(steps_with_orders(&[0, 2]))),
        ["non_sequential_step_order"]
    );
    assert!(
        codes(&stepped(steps_with_orders(&[0, 0])))
            .contains(&"duplicate_step_order".to_string())
    );
    assert!(codes(&stepped(steps_with_orders(&[0, 1]))).is_empty());
    assert!(codes(&stepped(steps_with_orders(&[1, 0]))).is_empty());
}

#[test]
fn field_pointing_at_missing_step_is_reported() {
    let schema: FormSchema = serde_json::from_value(json!({
        "fields": [{
            "id": "f1", "type": "TEXT", "fieldName": "name", "label": "Name",
            "position": { "stepId": "ghost" }
        }],
        "settings": { "stepForm": { "enabled": true, "steps": steps_with_orders(&[0, 1]) } }
    }))
    .expect("schema");

    let errors = validate(&schema).expect_err("dangling step");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, "unknown_step_reference");
    assert_eq!(errors[0].field_id.as_deref(), Some("f1"));
    assert_eq!(errors[0].step_id.as_deref(), Some("ghost"));
}

#[test]
fn disabled_or_absent_step_mode_is_always_valid() {
    let disabled: FormSchema = serde_json::from_value(json!({
        "fields": [],
        "settings": { "stepForm": { "enabled": false, "steps": [{ "id": "a", "order": 7 }] } }
    }))
    .expect("schema");
    assert!(validate(&disabled).is_ok());

    let absent: FormSchema = serde_json::from_value(json!({ "fields": [] })).expect("schema");
    assert!(validate(&absent).is_ok());
}

#[test]
fn layout_lint_catches_bad_names_and_rows() {
    let schema: FormSchema = serde_json::from_value(json!({
        "fields": [
            { "id": "a", "type": "TEXT", "fieldName": "dup", "label": "A",
              "position": { "rowId": "r1", "columnIndex": 3 } },
            { "id": "b", "type": "TEXT", "fieldName": "dup", "label": "B",
              "position": { "rowId": "nowhere" } },
            { "id": "c", "type": "EMAIL", "label": "C" }
        ],
        "settings": {
            "rowLayout": {
                "enabled": true,
                "rows": [{ "rowId": "r1", "columnCount": 2, "columnWidths": ["1fr"] }]
            }
        }
    }))
    .expect("schema");

    let codes = validate_layout(&schema)
        .expect_err("lint errors")
        .into_iter()
        .map(|error| error.code)
        .collect::<Vec<_>>();
    for expected in [
        "duplicate_field_name",
        "missing_field_name",
        "column_widths_mismatch",
        "column_out_of_range",
        "unknown_row",
    ] {
        assert!(codes.contains(&expected.to_string()), "missing {expected} in {codes:?}");
    }
}
