pub mod conditional;
pub mod field;
pub mod row;
pub mod schema;
pub mod step;

pub use conditional::{ConditionalOperator, ConditionalRule};
pub use field::{FieldOption, FieldPosition, FieldType, FieldValidation, FormField};
pub use row::{RowLayoutConfig, RowLayoutSettings, SubColumnConfig};
pub use schema::{
    FormSchema, FormSettings, LabelPosition, LayoutSettings, SubmissionSettings, document_schema,
};
pub use step::{FormStep, StepFormConfig};
