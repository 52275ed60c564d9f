use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::controls::FieldError;
use crate::spec::schema::FormSchema;
use crate::submission::SubmissionPayload;

/// A published form as returned by the schema source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FetchedForm {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub schema: FormSchema,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub submission_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Error, PartialEq)]
pub enum FetchError {
    #[error("form not found")]
    NotFound,
    #[error("form link has expired")]
    Expired,
    #[error("too many requests; try again later")]
    RateLimited,
    #[error("form link is invalid")]
    InvalidToken,
    #[error("network error: {0}")]
    Network(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum SubmitError {
    #[error("submission rejected: {} invalid field(s)", .0.len())]
    Validation(Vec<FieldError>),
    #[error("form not found")]
    NotFound,
    #[error("form link has expired")]
    Expired,
    #[error("too many requests; try again later")]
    RateLimited,
    #[error("submission failed: {0}")]
    Submission(String),
    #[error("network error: {0}")]
    Network(String),
}

/// Loads a published form by token or short code. A single attempt, no retry.
pub trait SchemaSource {
    fn fetch(&self, token: &str) -> Result<FetchedForm, FetchError>;
}

/// Accepts a prepared submission. A single attempt, no retry.
pub trait SubmissionSink {
    fn submit(
        &self,
        token: &str,
        payload: &SubmissionPayload,
    ) -> Result<SubmissionReceipt, SubmitError>;
}
