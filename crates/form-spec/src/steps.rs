use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::controls::{ControlSet, FieldError};
use crate::pagination::{DotMarker, visible_dots};
use crate::spec::field::FormField;
use crate::spec::schema::FormSchema;
use crate::spec::step::{FormStep, StepFormConfig};
use crate::template::MessageTemplates;
use crate::visibility::VisibilityTracker;

/// Source of event timestamps, in milliseconds since the Unix epoch.
pub trait Clock: fmt::Debug + Send + Sync {
    fn now_millis(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StepEventKind {
    View,
    Next,
    Previous,
    Submit,
}

/// Navigation event recorded against a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StepEvent {
    pub step_id: String,
    #[serde(rename = "type")]
    pub kind: StepEventKind,
    pub timestamp: u64,
}

#[derive(Debug, Error, PartialEq)]
pub enum StepError {
    #[error("step form has no steps")]
    NoSteps,
    #[error("already on the last step")]
    AtLastStep,
    #[error("already on the first step")]
    AtFirstStep,
    #[error("step {target} is out of range (0..{count})")]
    OutOfRange { target: usize, count: usize },
    #[error("step {step_index} has {} invalid field(s)", .errors.len())]
    Invalid {
        step_index: usize,
        errors: Vec<FieldError>,
    },
}

/// Validates the input controls belonging to one step.
pub trait StepValidator {
    fn validate_step(&mut self, index: usize) -> Result<(), Vec<FieldError>>;
}

impl<F> StepValidator for F
where
    F: FnMut(usize) -> Result<(), Vec<FieldError>>,
{
    fn validate_step(&mut self, index: usize) -> Result<(), Vec<FieldError>> {
        self(index)
    }
}

/// Fields that render on step `index`. Fields without a step belong to step 0.
pub fn fields_for_step(schema: &FormSchema, index: usize) -> Vec<&FormField> {
    schema
        .fields
        .iter()
        .filter(|field| schema.step_index_for_field(field) == index)
        .collect()
}

/// Step validation over live controls: visible inputs on the step are touched and checked.
pub struct ControlStepValidator<'a> {
    pub schema: &'a FormSchema,
    pub controls: &'a mut ControlSet,
    pub visibility: &'a VisibilityTracker,
    pub templates: &'a MessageTemplates,
}

impl StepValidator for ControlStepValidator<'_> {
    fn validate_step(&mut self, index: usize) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        for field in fields_for_step(self.schema, index) {
            if !self.visibility.is_visible(&field.id) {
                continue;
            }
            let Some(control) = self.controls.by_field_id_mut(&field.id) else {
                continue;
            };
            control.mark_touched();
            errors.extend(control.errors(self.templates));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Multi-step navigation: current step, validated steps, and the event log.
#[derive(Debug, Clone)]
pub struct StepNavigator {
    steps: Vec<FormStep>,
    current: usize,
    validated: BTreeSet<usize>,
    events: Vec<StepEvent>,
    clock: Arc<dyn Clock>,
}

impl StepNavigator {
    /// Starts on step 0 with a single `view` event.
    pub fn new(config: &StepFormConfig, clock: Arc<dyn Clock>) -> Result<Self, StepError> {
        let steps = config
            .ordered_steps()
            .into_iter()
            .cloned()
            .collect::<Vec<_>>();
        if steps.is_empty() {
            return Err(StepError::NoSteps);
        }
        let mut navigator = Self {
            steps,
            current: 0,
            validated: BTreeSet::new(),
            events: Vec::new(),
            clock,
        };
        navigator.record(StepEventKind::View, 0);
        Ok(navigator)
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_step(&self) -> &FormStep {
        &self.steps[self.current]
    }

    pub fn steps(&self) -> &[FormStep] {
        &self.steps
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn is_first(&self) -> bool {
        self.current == 0
    }

    pub fn is_last(&self) -> bool {
        self.current + 1 == self.steps.len()
    }

    pub fn is_validated(&self, index: usize) -> bool {
        self.validated.contains(&index)
    }

    pub fn events(&self) -> &[StepEvent] {
        &self.events
    }

    pub fn dots(&self) -> Vec<DotMarker> {
        visible_dots(self.steps.len(), self.current)
    }

    /// Advances one step after the current step validates.
    pub fn next(&mut self, validator: &mut impl StepValidator) -> Result<usize, StepError> {
        if self.is_last() {
            return Err(StepError::AtLastStep);
        }
        self.validate_current(validator)?;
        self.record(StepEventKind::Next, self.current);
        self.current += 1;
        self.record(StepEventKind::View, self.current);
        tracing::debug!(step = self.current, "advanced to next step");
        Ok(self.current)
    }

    /// Moves back one step without validation.
    pub fn previous(&mut self) -> Result<usize, StepError> {
        if self.is_first() {
            return Err(StepError::AtFirstStep);
        }
        self.record(StepEventKind::Previous, self.current);
        self.current -= 1;
        self.record(StepEventKind::View, self.current);
        tracing::debug!(step = self.current, "returned to previous step");
        Ok(self.current)
    }

    /// Jumps to `target`; jumping forward requires the current step to validate.
    pub fn go_to_step(
        &mut self,
        target: usize,
        validator: &mut impl StepValidator,
    ) -> Result<usize, StepError> {
        if target >= self.steps.len() {
            return Err(StepError::OutOfRange {
                target,
                count: self.steps.len(),
            });
        }
        if target > self.current {
            self.validate_current(validator)?;
        }
        self.current = target;
        self.record(StepEventKind::View, target);
        tracing::debug!(step = target, "jumped to step");
        Ok(target)
    }

    /// Re-validates steps `0..=current` in order and records `submit` when all pass.
    pub fn submit(&mut self, validator: &mut impl StepValidator) -> Result<(), StepError> {
        for index in 0..=self.current {
            if let Err(errors) = validator.validate_step(index) {
                tracing::warn!(step = index, "submission blocked by invalid step");
                return Err(StepError::Invalid {
                    step_index: index,
                    errors,
                });
            }
            self.validated.insert(index);
        }
        self.record(StepEventKind::Submit, self.current);
        Ok(())
    }

    /// Back to step 0 with a fresh event log.
    pub fn reset(&mut self) {
        self.current = 0;
        self.validated.clear();
        self.events.clear();
        self.record(StepEventKind::View, 0);
    }

    fn validate_current(&mut self, validator: &mut impl StepValidator) -> Result<(), StepError> {
        match validator.validate_step(self.current) {
            Ok(()) => {
                self.validated.insert(self.current);
                Ok(())
            }
            Err(errors) => {
                tracing::warn!(
                    step = self.current,
                    invalid = errors.len(),
                    "step advance blocked"
                );
                Err(StepError::Invalid {
                    step_index: self.current,
                    errors,
                })
            }
        }
    }

    fn record(&mut self, kind: StepEventKind, index: usize) {
        self.events.push(StepEvent {
            step_id: self.steps[index].id.clone(),
            kind,
            timestamp: self.clock.now_millis(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug)]
    struct FixedClock(u64);

    impl Clock for FixedClock {
        fn now_millis(&self) -> u64 {
            self.0
        }
    }

    fn navigator(count: usize) -> StepNavigator {
        let config: StepFormConfig = serde_json::from_value(json!({
            "enabled": true,
            "steps": (0..count)
                .rev()
                .map(|i| json!({ "id": format!("s{}", i), "title": format!("Step {}", i), "order": i }))
                .collect::<Vec<_>>()
        }))
        .expect("config");
        StepNavigator::new(&config, Arc::new(FixedClock(7))).expect("navigator")
    }

    fn always_ok(_: usize) -> Result<(), Vec<FieldError>> {
        Ok(())
    }

    fn kinds(navigator: &StepNavigator) -> Vec<(StepEventKind, String)> {
        navigator
            .events()
            .iter()
            .map(|event| (event.kind, event.step_id.clone()))
            .collect()
    }

    #[test]
    fn starts_on_first_ordered_step_with_view_event() {
        let navigator = navigator(3);
        assert_eq!(navigator.current_step().id, "s0");
        assert_eq!(kinds(&navigator), vec![(StepEventKind::View, "s0".into())]);
        assert_eq!(navigator.events()[0].timestamp, 7);
    }

    #[test]
    fn previous_and_bounds() {
        let mut navigator = navigator(2);
        assert_eq!(navigator.previous(), Err(StepError::AtFirstStep));
        navigator.next(&mut always_ok).expect("next");
        assert_eq!(navigator.next(&mut always_ok), Err(StepError::AtLastStep));
        assert_eq!(navigator.previous(), Ok(0));
        assert_eq!(
            kinds(&navigator)[2..],
            [
                (StepEventKind::Previous, "s1".into()),
                (StepEventKind::View, "s0".into())
            ]
        );
    }

    #[test]
    fn go_to_step_only_validates_forward_jumps() {
        let mut navigator = navigator(4);
        let mut calls = Vec::new();
        let mut reject = |index: usize| {
            calls.push(index);
            Err(vec![FieldError {
                field_name: "x".into(),
                code: "required".into(),
                message: "x is required".into(),
            }])
        };
        assert!(matches!(
            navigator.go_to_step(2, &mut reject),
            Err(StepError::Invalid { step_index: 0, .. })
        ));
        assert_eq!(navigator.current_index(), 0);
        assert_eq!(
            navigator.go_to_step(9, &mut always_ok),
            Err(StepError::OutOfRange {
                target: 9,
                count: 4
            })
        );
        navigator.go_to_step(3, &mut always_ok).expect("forward jump");
        assert!(navigator.is_validated(0));
        navigator.go_to_step(1, &mut reject).expect("backward jump");
        assert_eq!(navigator.current_index(), 1);
        assert_eq!(calls, vec![0]);
        assert_eq!(
            kinds(&navigator).last(),
            Some(&(StepEventKind::View, "s1".into()))
        );
    }

    #[test]
    fn submit_checks_every_step_up_to_current() {
        let mut navigator = navigator(3);
        navigator.next(&mut always_ok).expect("to 1");
        navigator.next(&mut always_ok).expect("to 2");
        let mut seen = Vec::new();
        let mut validator = |index: usize| {
            seen.push(index);
            Ok(())
        };
        navigator.submit(&mut validator).expect("submit");
        assert_eq!(seen, vec![0, 1, 2]);
        assert_eq!(
            kinds(&navigator).last(),
            Some(&(StepEventKind::Submit, "s2".into()))
        );
    }

    #[test]
    fn reset_restarts_the_log() {
        let mut navigator = navigator(3);
        navigator.next(&mut always_ok).expect("next");
        navigator.reset();
        assert_eq!(navigator.current_index(), 0);
        assert!(!navigator.is_validated(0));
        assert_eq!(navigator.events().len(), 1);
    }
}
