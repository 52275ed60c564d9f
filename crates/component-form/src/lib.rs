use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

use form_spec::{
    FormSchema, FormSession, SessionError, StepError, SubmissionPayload,
    document_schema as form_document_schema, render_dots,
    submission_schema as form_submission_schema, validate_for_persistence, visible_dots,
};

const DEFAULT_SCHEMA: &str = include_str!("../../form-spec/tests/fixtures/signup_steps.json");

#[derive(Debug, Error)]
enum ComponentError {
    #[error("failed to parse config: {0}")]
    ConfigParse(#[source] serde_json::Error),
    #[error("failed to parse form schema: {0}")]
    SchemaParse(#[source] serde_json::Error),
    #[error("json encode error: {0}")]
    JsonEncode(#[source] serde_json::Error),
    #[error("step {index} does not exist (form has {count} step(s))")]
    StepOutOfRange { index: usize, count: usize },
    #[error(transparent)]
    Session(#[from] SessionError),
}

#[derive(Debug, Deserialize, Serialize, Default)]
struct ComponentConfig {
    #[serde(default)]
    schema_json: Option<String>,
}

fn load_schema(config_json: &str) -> Result<FormSchema, ComponentError> {
    let config = if config_json.trim().is_empty() {
        ComponentConfig::default()
    } else {
        serde_json::from_str(config_json).map_err(ComponentError::ConfigParse)?
    };

    let schema_json = match config.schema_json.as_deref() {
        Some(raw) => raw,
        None => {
            tracing::debug!("no schema_json configured; using bundled schema");
            DEFAULT_SCHEMA
        }
    };

    serde_json::from_str(schema_json).map_err(ComponentError::SchemaParse)
}

fn parse_values(values_json: &str) -> Map<String, Value> {
    serde_json::from_str::<Value>(values_json)
        .ok()
        .and_then(|value| value.as_object().cloned())
        .unwrap_or_default()
}

fn load_session(config_json: &str, values_json: &str) -> Result<FormSession, ComponentError> {
    let mut session = FormSession::new(load_schema(config_json)?)?;
    session.apply_values(&parse_values(values_json));
    Ok(session)
}

fn encode<T: Serialize>(value: &T) -> Result<Value, ComponentError> {
    serde_json::to_value(value).map_err(ComponentError::JsonEncode)
}

fn respond(result: Result<Value, ComponentError>) -> String {
    match result {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|error| {
            json!({"error": format!("json encode: {}", error)}).to_string()
        }),
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

/// The configured form schema.
pub fn describe(config_json: &str) -> String {
    respond(load_schema(config_json).and_then(|schema| encode(&schema)))
}

/// JSON Schema of the form document format itself.
pub fn document_schema() -> String {
    respond(Ok(form_document_schema()))
}

/// Persistence gate: `{"valid": true}` or a 400-style body listing every problem.
pub fn validate_schema(config_json: &str) -> String {
    respond(load_schema(config_json).and_then(|schema| {
        match validate_for_persistence(&schema) {
            Ok(()) => Ok(json!({ "valid": true })),
            Err(errors) => Ok(json!({
                "valid": false,
                "status": 400,
                "errors": encode(&errors)?,
            })),
        }
    }))
}

pub fn build_controls(config_json: &str, values_json: &str) -> String {
    respond(load_session(config_json, values_json).map(|session| {
        let controls = session
            .controls()
            .iter()
            .map(|control| {
                json!({
                    "fieldId": control.field_id,
                    "name": control.name,
                    "type": control.kind.as_str(),
                    "value": control.value,
                    "defaultValue": control.default_value,
                    "options": control.options,
                    "validators": control
                        .validators
                        .iter()
                        .map(|validator| validator.code())
                        .collect::<Vec<_>>(),
                    "visible": session
                        .visibility()
                        .get(&control.field_id)
                        .copied()
                        .unwrap_or(true),
                })
            })
            .collect::<Vec<_>>();
        Value::Array(controls)
    }))
}

pub fn resolve_visibility(config_json: &str, values_json: &str) -> String {
    respond(load_session(config_json, values_json).and_then(|session| encode(session.visibility())))
}

/// Step header, pagination dots, and row layout for one step of the form.
pub fn render_step(config_json: &str, values_json: &str, step_index: usize) -> String {
    respond(load_session(config_json, values_json).and_then(|session| {
        let layout_settings = &session.schema().settings.layout;
        let mut response = json!({
            "columns": layout_settings.columns,
            "labelPosition": encode(&layout_settings.label_position)?,
        });

        let Some(navigator) = session.navigator() else {
            response["step"] = Value::Null;
            response["layout"] = encode(&session.layout())?;
            return Ok(response);
        };

        let count = navigator.step_count();
        let step = navigator
            .steps()
            .get(step_index)
            .ok_or(ComponentError::StepOutOfRange {
                index: step_index,
                count,
            })?;
        let dots = visible_dots(count, step_index);
        response["step"] = json!({
            "id": step.id,
            "title": step.title,
            "description": step.description,
            "index": step_index,
            "count": count,
            "isFirst": step_index == 0,
            "isLast": step_index + 1 == count,
        });
        response["dots"] = encode(&dots)?;
        response["dotsLabel"] = Value::String(render_dots(&dots, step_index));
        response["layout"] = encode(&session.step_layout(step_index))?;
        Ok(response)
    }))
}

/// Walks the form as a submit would and returns either the errors or the wire payload.
///
/// Step forms advance one step at a time from the first step, so errors are
/// reported for the first step that fails, together with its `stepIndex`.
/// Hidden fields are sent cleared.
pub fn prepare_submission(config_json: &str, values_json: &str) -> String {
    respond(load_session(config_json, values_json).and_then(|mut session| {
        match complete(&mut session) {
            Ok(payload) => {
                let settings = &session.schema().settings.submission;
                Ok(json!({
                    "status": "complete",
                    "payload": encode(&payload)?,
                    "successMessage": settings.success_message,
                    "redirectUrl": settings.redirect_url,
                }))
            }
            Err(SessionError::Step(StepError::Invalid { step_index, errors })) => Ok(json!({
                "status": "error",
                "stepIndex": step_index,
                "errors": encode(&errors)?,
            })),
            Err(SessionError::Invalid(errors)) => Ok(json!({
                "status": "error",
                "errors": encode(&errors)?,
            })),
            Err(err) => Err(err.into()),
        }
    }))
}

fn complete(session: &mut FormSession) -> Result<SubmissionPayload, SessionError> {
    while session
        .navigator()
        .is_some_and(|navigator| !navigator.is_last())
    {
        session.next()?;
    }
    session.prepare()
}

pub fn submission_schema(config_json: &str) -> String {
    respond(load_schema(config_json).map(|schema| form_submission_schema(&schema)))
}

pub fn pagination(total: usize, current: usize) -> String {
    let markers = visible_dots(total, current);
    respond(encode(&markers).map(|encoded| {
        json!({
            "markers": encoded,
            "label": render_dots(&markers, current),
        })
    }))
}
