use std::cell::RefCell;
use std::sync::Arc;

use form_spec::{
    Clock, FormSchema, FormSession, SessionError, SessionOptions, StepError, StepEventKind,
    SubmissionPayload, SubmissionReceipt, SubmissionSink, SubmitError,
};
use serde_json::{Value, json};

#[derive(Debug)]
struct FixedClock(u64);

impl Clock for FixedClock {
    fn now_millis(&self) -> u64 {
        self.0
    }
}

#[derive(Default)]
struct RecordingSink {
    payloads: RefCell<Vec<SubmissionPayload>>,
}

impl SubmissionSink for RecordingSink {
    fn submit(
        &self,
        token: &str,
        payload: &SubmissionPayload,
    ) -> Result<SubmissionReceipt, SubmitError> {
        self.payloads.borrow_mut().push(payload.clone());
        Ok(SubmissionReceipt {
            submission_id: format!("{token}-{}", self.payloads.borrow().len()),
            message: None,
        })
    }
}

fn fixture(name: &str) -> FormSchema {
    let raw = match name {
        "signup_steps" => include_str!("fixtures/signup_steps.json"),
        "contact_form" => include_str!("fixtures/contact_form.json"),
        other => panic!("unknown fixture {other}"),
    };
    serde_json::from_str(raw).expect("fixture parses")
}

fn session(name: &str) -> FormSession {
    let options = SessionOptions {
        clock: Arc::new(FixedClock(1_700_000_000_000)),
    };
    FormSession::with_options(fixture(name), options).expect("session")
}

fn event_kinds(session: &FormSession) -> Vec<StepEventKind> {
    session
        .navigator()
        .expect("step form")
        .events()
        .iter()
        .map(|event| event.kind)
        .collect()
}

fn fill_account(session: &mut FormSession) {
    session.set_value("name", json!("Ada Lovelace")).expect("name");
    session.set_value("email", json!("ada@example.com")).expect("email");
}

#[test]
fn hiding_a_field_clears_only_that_field() {
    let mut session = session("signup_steps");
    assert_eq!(session.visibility().get("f-company"), Some(&false));

    session.set_value("hasCompany", json!("yes")).expect("radio");
    assert_eq!(session.visibility().get("f-company"), Some(&true));
    session.set_value("company", json!("Acme")).expect("company");
    session.set_value("age", json!(30)).expect("age");

    let hidden = session.set_value("hasCompany", json!("no")).expect("radio");
    assert_eq!(hidden, vec!["f-company".to_string()]);
    assert_eq!(session.controls().value("company"), Some(&Value::Null));
    assert_eq!(session.controls().value("age"), Some(&json!(30)));

    session.set_value("hasCompany", json!("yes")).expect("radio");
    assert_eq!(session.controls().value("company"), Some(&Value::Null));
}

#[test]
fn next_is_blocked_until_the_step_validates() {
    let mut session = session("signup_steps");

    let err = session.next().expect_err("name and email are required");
    match err {
        SessionError::Step(StepError::Invalid { step_index, errors }) => {
            assert_eq!(step_index, 0);
            let names = errors.iter().map(|e| e.field_name.as_str()).collect::<Vec<_>>();
            assert_eq!(names, ["name", "email"]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(session.navigator().map(|n| n.current_index()), Some(0));
    assert_eq!(event_kinds(&session), [StepEventKind::View]);
    assert!(!session.errors_for("name").is_empty());

    fill_account(&mut session);
    assert_eq!(session.next().expect("advance"), 1);
    assert_eq!(
        event_kinds(&session),
        [StepEventKind::View, StepEventKind::Next, StepEventKind::View]
    );
    let last = session.navigator().and_then(|n| n.events().last()).expect("event");
    assert_eq!(last.step_id, "profile");
    assert_eq!(last.timestamp, 1_700_000_000_000);
}

#[test]
fn hidden_required_field_does_not_block_the_step() {
    let mut session = session("signup_steps");
    fill_account(&mut session);
    session.next().expect("to profile");
    assert_eq!(session.next().expect("company is hidden"), 2);
}

#[test]
fn custom_message_is_rendered_for_failing_check() {
    let mut session = session("signup_steps");
    fill_account(&mut session);
    session.next().expect("to profile");
    session.set_value("age", json!(12)).expect("age");

    let err = session.next().expect_err("too young");
    let SessionError::Step(StepError::Invalid { errors, .. }) = err else {
        panic!("expected invalid step");
    };
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, "min");
    assert_eq!(errors[0].message, "Age must be at least 18");
}

#[test]
fn submit_stops_at_the_first_invalid_step_and_sends_nothing() {
    let mut session = session("signup_steps");
    let sink = RecordingSink::default();
    fill_account(&mut session);
    session.next().expect("to profile");
    session.next().expect("to preferences");

    session.set_value("hasCompany", json!("yes")).expect("radio");
    let err = session.submit(&sink, "tok").expect_err("company now required");
    match err {
        SessionError::Step(StepError::Invalid { step_index, .. }) => assert_eq!(step_index, 1),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(sink.payloads.borrow().is_empty());
    assert_eq!(session.navigator().map(|n| n.current_index()), Some(2));
    assert!(!event_kinds(&session).contains(&StepEventKind::Submit));
}

#[test]
fn successful_step_submission_carries_values_and_events() {
    let mut session = session("signup_steps");
    let sink = RecordingSink::default();
    fill_account(&mut session);
    session.next().expect("to profile");
    session.set_value("hasCompany", json!("yes")).expect("radio");
    session.set_value("company", json!("Acme")).expect("company");
    session.next().expect("to preferences");

    let receipt = session.submit(&sink, "tok").expect("submitted");
    assert_eq!(receipt.submission_id, "tok-1");

    let payloads = sink.payloads.borrow();
    let payload = &payloads[0];
    assert_eq!(payload.values["company"], json!("Acme"));
    assert_eq!(payload.values["colors"], json!("red"));
    assert_eq!(payload.values["newsletter"], json!(true));
    assert!(!payload.values.contains_key("f-heading"));

    let events = &payload.metadata.as_ref().expect("metadata").step_events;
    assert_eq!(events.last().map(|event| event.kind), Some(StepEventKind::Submit));
    let wire = serde_json::to_value(payload).expect("json");
    assert!(wire["metadata"]["stepEvents"].is_array());
}

#[test]
fn checkbox_group_keeps_known_options_and_joins_on_submit() {
    let mut session = session("signup_steps");
    assert_eq!(session.controls().value("colors"), Some(&json!(["red"])));

    session.toggle_option("colors", "blue", true).expect("toggle");
    session.toggle_option("colors", "blue", true).expect("toggle twice");
    assert_eq!(session.payload().values["colors"], json!("red,blue"));

    session.toggle_option("colors", "red", false).expect("toggle");
    session.toggle_option("colors", "blue", false).expect("toggle");
    assert_eq!(session.payload().values["colors"], json!(""));

    let err = session.toggle_option("name", "x", true).expect_err("not a group");
    assert!(matches!(err, SessionError::Control(_)));
}

#[test]
fn layout_places_positioned_fields_and_collects_the_rest() {
    let session = session("signup_steps");
    let rows = session.layout();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].row_id.as_deref(), Some("row-account"));
    assert_eq!(rows[0].columns[0].fields, ["f-name"]);
    assert_eq!(rows[0].columns[1].fields, ["f-email"]);
    assert_eq!(rows[1].row_id, None);
    assert_eq!(rows[1].columns[0].fields, ["f-heading", "f-notes"]);
}

#[test]
fn previous_and_reset_rewind_the_navigator() {
    let mut session = session("signup_steps");
    assert!(matches!(
        session.previous(),
        Err(SessionError::Step(StepError::AtFirstStep))
    ));
    fill_account(&mut session);
    session.next().expect("to profile");
    assert_eq!(session.previous().expect("back"), 0);
    assert!(matches!(
        session.go_to_step(9),
        Err(SessionError::Step(StepError::OutOfRange { target: 9, count: 3 }))
    ));

    session.reset();
    assert_eq!(session.controls().value("name"), Some(&json!("")));
    assert_eq!(event_kinds(&session), [StepEventKind::View]);
}

#[test]
fn single_page_form_validates_everything_on_submit() {
    let mut session = session("contact_form");
    let sink = RecordingSink::default();
    assert!(!session.is_step_form());
    assert!(matches!(session.next(), Err(SessionError::NotStepForm)));

    let err = session.submit(&sink, "tok").expect_err("name and agree missing");
    let SessionError::Invalid(errors) = err else {
        panic!("expected field errors");
    };
    let names = errors.iter().map(|e| e.field_name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, ["name", "agree"]);
    assert!(sink.payloads.borrow().is_empty());

    session.set_value("topic", json!("support")).expect("topic");
    assert_eq!(session.visibility().get("c-order"), Some(&true));
    session.set_value("name", json!("Grace")).expect("name");
    session.set_value("agree", json!("on")).expect("agree");
    session.submit(&sink, "tok").expect("submitted");

    let payloads = sink.payloads.borrow();
    assert_eq!(payloads[0].values["agree"], json!(true));
    assert!(payloads[0].metadata.is_none());
}

#[test]
fn value_written_to_a_hidden_field_is_not_submitted() {
    let mut session = session("contact_form");
    let sink = RecordingSink::default();
    assert_eq!(session.visibility().get("c-order"), Some(&false));

    session.set_value("orderNumber", json!("STALE")).expect("order");
    assert_eq!(session.controls().value("orderNumber"), Some(&Value::Null));

    session.apply_values(
        json!({ "name": "Grace", "agree": true, "orderNumber": "STALE" })
            .as_object()
            .expect("object"),
    );
    session.submit(&sink, "tok").expect("submitted");

    let payloads = sink.payloads.borrow();
    assert_eq!(payloads[0].values["orderNumber"], Value::Null);
}

#[test]
fn chained_conditionals_are_resolved_before_submit() {
    let schema: FormSchema = serde_json::from_value(json!({
        "fields": [
            { "id": "a", "type": "TEXT", "fieldName": "a", "order": 0 },
            { "id": "b", "type": "TEXT", "fieldName": "b", "order": 1,
              "conditional": { "watchFieldId": "a", "operator": "equals", "value": "yes" } },
            { "id": "c", "type": "TEXT", "fieldName": "c", "order": 2, "required": true,
              "conditional": { "watchFieldId": "b", "operator": "equals", "value": "x" } }
        ]
    }))
    .expect("schema");
    let mut session = FormSession::new(schema).expect("session");
    let sink = RecordingSink::default();

    session.set_value("a", json!("yes")).expect("a");
    session.set_value("b", json!("x")).expect("b");
    session.set_value("c", json!("secret")).expect("c");
    assert_eq!(session.set_value("a", json!("no")).expect("a"), vec!["b"]);
    assert_eq!(session.visibility().get("c"), Some(&true));

    session.submit(&sink, "tok").expect("c is hidden, so not required");
    assert_eq!(session.visibility().get("c"), Some(&false));
    let payloads = sink.payloads.borrow();
    assert_eq!(payloads[0].values["b"], Value::Null);
    assert_eq!(payloads[0].values["c"], Value::Null);
}
