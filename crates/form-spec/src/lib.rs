#![allow(missing_docs)]

pub mod controls;
pub mod layout;
pub mod pagination;
pub mod session;
pub mod spec;
pub mod steps;
pub mod submission;
pub mod template;
pub mod transport;
pub mod validate;
pub mod visibility;

pub use controls::{Control, ControlError, ControlSet, FieldError, FieldPattern, Validator};
pub use layout::{LayoutColumn, LayoutRow, layout_for};
pub use pagination::{DotMarker, render_dots, visible_dots};
pub use session::{FormSession, SessionError, SessionOptions};
pub use spec::{
    ConditionalOperator, ConditionalRule, FieldOption, FieldPosition, FieldType, FieldValidation,
    FormField, FormSchema, FormSettings, FormStep, RowLayoutConfig, StepFormConfig,
    document_schema,
};
pub use steps::{
    Clock, StepError, StepEvent, StepEventKind, StepNavigator, StepValidator, SystemClock,
    fields_for_step,
};
pub use submission::{SubmissionPayload, prepare_submission, submission_schema};
pub use template::{MessageTemplates, TemplateError};
pub use transport::{
    FetchError, FetchedForm, SchemaSource, SubmissionReceipt, SubmissionSink, SubmitError,
};
pub use validate::{SchemaError, validate, validate_for_persistence, validate_layout};
pub use visibility::{VisibilityMap, VisibilityTracker, is_visible, resolve_visibility};
