use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::controls::{ControlError, ControlSet, FieldError};
use crate::layout::{LayoutRow, layout_for};
use crate::spec::field::FormField;
use crate::spec::schema::FormSchema;
use crate::steps::{
    Clock, ControlStepValidator, StepError, StepNavigator, SystemClock, fields_for_step,
};
use crate::submission::{SubmissionPayload, prepare_submission};
use crate::template::MessageTemplates;
use crate::transport::{SubmissionReceipt, SubmissionSink, SubmitError};
use crate::visibility::{VisibilityMap, VisibilityTracker};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("this form has no step navigation")]
    NotStepForm,
    #[error(transparent)]
    Step(#[from] StepError),
    #[error(transparent)]
    Control(#[from] ControlError),
    #[error("{} field(s) need attention", .0.len())]
    Invalid(Vec<FieldError>),
    #[error(transparent)]
    Submit(#[from] SubmitError),
}

/// Session-scoped collaborators.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub clock: Arc<dyn Clock>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            clock: Arc::new(SystemClock),
        }
    }
}

/// State of one render of a form: controls, visibility, step position, event log.
///
/// The schema is read-only for the lifetime of the session.
#[derive(Debug, Clone)]
pub struct FormSession {
    schema: FormSchema,
    controls: ControlSet,
    visibility: VisibilityTracker,
    navigator: Option<StepNavigator>,
    templates: MessageTemplates,
}

impl FormSession {
    pub fn new(schema: FormSchema) -> Result<Self, SessionError> {
        Self::with_options(schema, SessionOptions::default())
    }

    pub fn with_options(schema: FormSchema, options: SessionOptions) -> Result<Self, SessionError> {
        let mut controls = ControlSet::build(&schema);
        let visibility = VisibilityTracker::new(&schema, &mut controls);
        let navigator = schema
            .step_form()
            .map(|config| StepNavigator::new(config, options.clock.clone()))
            .transpose()?;
        Ok(Self {
            schema,
            controls,
            visibility,
            navigator,
            templates: MessageTemplates::new(),
        })
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn controls(&self) -> &ControlSet {
        &self.controls
    }

    pub fn visibility(&self) -> &VisibilityMap {
        self.visibility.map()
    }

    pub fn navigator(&self) -> Option<&StepNavigator> {
        self.navigator.as_ref()
    }

    pub fn is_step_form(&self) -> bool {
        self.navigator.is_some()
    }

    /// Updates a control and re-evaluates visibility. Returns ids that became hidden.
    pub fn set_value(&mut self, name: &str, value: Value) -> Result<Vec<String>, SessionError> {
        self.controls.set_value(name, value)?;
        Ok(self.visibility.refresh(&self.schema, &mut self.controls))
    }

    /// Bulk update from a `{ fieldName: value }` object; unknown names are ignored.
    pub fn apply_values(&mut self, values: &Map<String, Value>) -> Vec<String> {
        self.controls.apply_values(values);
        self.visibility.refresh(&self.schema, &mut self.controls)
    }

    /// Applies one checkbox-group change event.
    pub fn toggle_option(
        &mut self,
        name: &str,
        option: &str,
        checked: bool,
    ) -> Result<Vec<String>, SessionError> {
        self.controls.toggle_option(name, option, checked)?;
        Ok(self.visibility.refresh(&self.schema, &mut self.controls))
    }

    /// Visible fields on the active step (the whole form without steps), by `order`.
    pub fn current_fields(&self) -> Vec<&FormField> {
        let mut fields = match &self.navigator {
            Some(navigator) => fields_for_step(&self.schema, navigator.current_index()),
            None => self.schema.fields.iter().collect(),
        };
        fields.retain(|field| self.visibility.is_visible(&field.id));
        fields.sort_by_key(|field| field.order);
        fields
    }

    /// Row/column layout of the active step.
    pub fn layout(&self) -> Vec<LayoutRow> {
        let step = self.navigator.as_ref().map(StepNavigator::current_index);
        layout_for(&self.schema, step, &self.visibility)
    }

    /// Layout of an arbitrary step without moving the navigator.
    pub fn step_layout(&self, index: usize) -> Vec<LayoutRow> {
        layout_for(&self.schema, Some(index), &self.visibility)
    }

    /// Inline errors for a control, shown once it has been touched.
    pub fn errors_for(&self, name: &str) -> Vec<FieldError> {
        self.controls
            .get(name)
            .filter(|control| control.touched)
            .map(|control| control.errors(&self.templates))
            .unwrap_or_default()
    }

    pub fn next(&mut self) -> Result<usize, SessionError> {
        let (navigator, mut validator) = self.split_for_steps()?;
        Ok(navigator.next(&mut validator)?)
    }

    pub fn previous(&mut self) -> Result<usize, SessionError> {
        let navigator = self
            .navigator
            .as_mut()
            .ok_or(SessionError::NotStepForm)?;
        Ok(navigator.previous()?)
    }

    pub fn go_to_step(&mut self, target: usize) -> Result<usize, SessionError> {
        let (navigator, mut validator) = self.split_for_steps()?;
        Ok(navigator.go_to_step(target, &mut validator)?)
    }

    /// Touches and checks every visible control of a single-page form.
    pub fn validate_all(&mut self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        for field in &self.schema.fields {
            if !self.visibility.is_visible(&field.id) {
                continue;
            }
            if let Some(control) = self.controls.by_field_id_mut(&field.id) {
                control.mark_touched();
                errors.extend(control.errors(&self.templates));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Resolves chained conditionals so that every hidden field is cleared.
    /// Returns ids that became hidden.
    pub fn settle_visibility(&mut self) -> Vec<String> {
        self.visibility.settle(&self.schema, &mut self.controls)
    }

    /// Wire payload for the current values, with step events in step mode.
    pub fn payload(&mut self) -> SubmissionPayload {
        self.settle_visibility();
        let payload = SubmissionPayload::new(prepare_submission(&self.schema, &self.controls));
        match &self.navigator {
            Some(navigator) => payload.with_step_events(navigator.events().to_vec()),
            None => payload,
        }
    }

    /// Runs the submit checks and builds the payload without sending it.
    ///
    /// In step mode steps `0..=current` are re-validated and a `submit` event is
    /// recorded; otherwise every visible control is checked.
    pub fn prepare(&mut self) -> Result<SubmissionPayload, SessionError> {
        self.settle_visibility();
        if self.navigator.is_some() {
            let (navigator, mut validator) = self.split_for_steps()?;
            navigator.submit(&mut validator)?;
        } else {
            self.validate_all().map_err(SessionError::Invalid)?;
        }
        Ok(self.payload())
    }

    /// Validates, prepares, and hands the payload to `sink`. Nothing is sent when
    /// validation fails.
    pub fn submit(
        &mut self,
        sink: &dyn SubmissionSink,
        token: &str,
    ) -> Result<SubmissionReceipt, SessionError> {
        let payload = self.prepare()?;
        let receipt = sink.submit(token, &payload)?;
        tracing::info!(submission = %receipt.submission_id, "form submitted");
        Ok(receipt)
    }

    fn split_for_steps(
        &mut self,
    ) -> Result<(&mut StepNavigator, ControlStepValidator<'_>), SessionError> {
        let navigator = self
            .navigator
            .as_mut()
            .ok_or(SessionError::NotStepForm)?;
        let validator = ControlStepValidator {
            schema: &self.schema,
            controls: &mut self.controls,
            visibility: &self.visibility,
            templates: &self.templates,
        };
        Ok((navigator, validator))
    }

    /// Restores defaults and rewinds to the first step.
    pub fn reset(&mut self) {
        self.controls.restore_defaults();
        self.visibility = VisibilityTracker::new(&self.schema, &mut self.controls);
        if let Some(navigator) = self.navigator.as_mut() {
            navigator.reset();
        }
    }
}
