use std::fmt::Write;

use form_spec::{
    Control, FetchedForm, FieldError, FieldType, FormField, StepNavigator, SubmissionPayload,
    SubmissionReceipt, render_dots,
};
use serde_json::{Number, Value};

/// Controls which bits of state the wizard prints.
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum Verbosity {
    /// Clean output: prompts and errors only.
    Clean,
    /// Verbose output: step dots, visible fields, choices.
    Verbose,
}

impl Verbosity {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Clean
        }
    }

    pub fn is_verbose(&self) -> bool {
        matches!(self, Verbosity::Verbose)
    }
}

/// Prints the fill wizard to the terminal.
pub struct WizardPresenter {
    verbosity: Verbosity,
    show_payload_json: bool,
}

impl WizardPresenter {
    pub fn new(verbosity: Verbosity, show_payload_json: bool) -> Self {
        Self {
            verbosity,
            show_payload_json,
        }
    }

    pub fn show_header(&self, form: &FetchedForm) {
        println!("Form: {}", form.title);
        if let Some(description) = &form.description {
            println!("{}", description);
        }
    }

    pub fn show_step(&self, navigator: &StepNavigator) {
        let step = navigator.current_step();
        println!(
            "Step {} of {}: {}",
            navigator.current_index() + 1,
            navigator.step_count(),
            step.title
        );
        if let Some(description) = &step.description {
            println!("{}", description);
        }
        if self.verbosity.is_verbose() {
            println!(
                "Progress: {}",
                render_dots(&navigator.dots(), navigator.current_index())
            );
        }
    }

    pub fn show_visible_fields(&self, fields: &[&FormField]) {
        if !self.verbosity.is_verbose() {
            return;
        }
        println!("Visible fields:");
        for field in fields {
            let mut entry = format!(" - {} ({})", field.id, field.kind.as_str());
            if field.required {
                entry.push_str(" [required]");
            }
            println!("{}", entry);
        }
    }

    /// Headings and paragraphs are printed as-is; other display fields are skipped.
    pub fn show_display_field(&self, field: &FormField) {
        match field.kind {
            FieldType::Heading => println!("== {} ==", field.label),
            FieldType::Paragraph => println!("{}", field.label),
            FieldType::Divider => println!("----"),
            _ => {}
        }
    }

    pub fn show_prompt(&self, prompt: &PromptContext) {
        let mut line = prompt.label.clone();
        if prompt.required {
            line.push_str(" *");
        }
        if let Some(hint) = &prompt.hint {
            line.push(' ');
            line.push_str(hint);
        }
        if let Some(current) = &prompt.current {
            let _ = write!(line, " [{}]", current);
        }
        println!("{}", line);
        if let Some(help) = &prompt.help_text {
            println!("{}", help);
        }
        if self.verbosity.is_verbose() && !prompt.choices.is_empty() {
            println!("Choices: {}", prompt.choices.join(", "));
        }
    }

    pub fn show_parse_error(&self, error: &AnswerParseError) {
        eprintln!("Invalid answer: {}", error.user_message);
        if let Some(debug) = &error.debug_message {
            eprintln!("  Expected: {}", debug);
        }
    }

    pub fn show_field_errors(&self, errors: &[FieldError]) {
        eprintln!("Please fix the following:");
        for error in errors {
            eprintln!("  {} - {}", error.field_name, error.message);
        }
    }

    pub fn show_completion(&self, receipt: &SubmissionReceipt, payload: &SubmissionPayload) {
        println!("Submitted ✅ ({})", receipt.submission_id);
        if let Some(message) = &receipt.message {
            println!("{}", message);
        }
        match payload.to_cbor() {
            Ok(bytes) => println!("Payload (CBOR hex): {}", encode_hex(&bytes)),
            Err(err) => eprintln!("Failed to serialize payload to CBOR: {}", err),
        }
        if self.show_payload_json {
            match payload.to_json_pretty() {
                Ok(pretty) => println!("{}", pretty),
                Err(err) => eprintln!("Failed to serialize payload to JSON: {}", err),
            }
        }
    }
}

/// Context used to format a single prompt.
pub struct PromptContext {
    pub label: String,
    pub help_text: Option<String>,
    pub required: bool,
    pub hint: Option<String>,
    pub choices: Vec<String>,
    pub current: Option<String>,
}

impl PromptContext {
    pub fn new(field: &FormField, control: &Control) -> Self {
        let choices = control.options.clone();
        Self {
            label: field.label.clone(),
            help_text: field.help_text.clone(),
            required: field.required,
            hint: hint_for(control, &choices),
            choices,
            current: current_value(&control.value),
        }
    }
}

fn hint_for(control: &Control, choices: &[String]) -> Option<String> {
    if control.is_checkbox_group() {
        return Some(format!("(comma-separated: {})", choices.join("/")));
    }
    match control.kind {
        FieldType::Checkbox | FieldType::Toggle => Some("(yes/no)".to_string()),
        FieldType::Number => Some("(number)".to_string()),
        FieldType::Select | FieldType::Radio if !choices.is_empty() => {
            Some(format!("({})", choices.join("/")))
        }
        FieldType::Date => Some("(YYYY-MM-DD)".to_string()),
        FieldType::Time => Some("(HH:MM)".to_string()),
        _ => None,
    }
}

fn current_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text.clone()),
        Value::Array(items) if items.is_empty() => None,
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(","),
        ),
        Value::Bool(true) => Some("yes".to_string()),
        Value::Bool(false) => Some("no".to_string()),
        other => Some(other.to_string()),
    }
}

/// Error produced when parsing a typed line from the user.
#[derive(Debug)]
pub struct AnswerParseError {
    pub user_message: String,
    pub debug_message: Option<String>,
}

impl AnswerParseError {
    pub fn new(user_message: impl Into<String>, debug_message: Option<String>) -> Self {
        Self {
            user_message: user_message.into(),
            debug_message,
        }
    }
}

/// Converts a typed line into a control value. Blank input keeps the current value.
pub fn parse_input(control: &Control, raw: &str) -> Result<Option<Value>, AnswerParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    if control.is_checkbox_group() {
        let mut selected = Vec::new();
        for item in trimmed.split(',').map(str::trim).filter(|item| !item.is_empty()) {
            if !control.options.iter().any(|option| option == item) {
                return Err(AnswerParseError::new(
                    format!("'{}' is not one of the options", item),
                    Some(control.options.join(", ")),
                ));
            }
            selected.push(Value::String(item.to_string()));
        }
        return Ok(Some(Value::Array(selected)));
    }

    match control.kind {
        FieldType::Checkbox | FieldType::Toggle => parse_boolean(trimmed).map(Some),
        FieldType::Number => parse_number(trimmed).map(Some),
        FieldType::Select | FieldType::Radio if !control.options.is_empty() => {
            if control.options.iter().any(|option| option == trimmed) {
                Ok(Some(Value::String(trimmed.to_string())))
            } else {
                Err(AnswerParseError::new(
                    format!("'{}' is not one of the options", trimmed),
                    Some(control.options.join(", ")),
                ))
            }
        }
        _ => Ok(Some(Value::String(trimmed.to_string()))),
    }
}

fn parse_boolean(raw: &str) -> Result<Value, AnswerParseError> {
    match raw.to_ascii_lowercase().as_str() {
        "y" | "yes" | "true" | "on" | "1" => Ok(Value::Bool(true)),
        "n" | "no" | "false" | "off" | "0" => Ok(Value::Bool(false)),
        _ => Err(AnswerParseError::new(
            "Please answer yes or no",
            Some("yes/no, y/n, true/false".to_string()),
        )),
    }
}

fn parse_number(raw: &str) -> Result<Value, AnswerParseError> {
    if let Ok(integer) = raw.parse::<i64>() {
        return Ok(Value::Number(integer.into()));
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| AnswerParseError::new("Please enter a number", Some(raw.to_string())))
}

pub fn encode_hex(bytes: &[u8]) -> String {
    let mut encoded = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(&mut encoded, "{:02x}", byte);
    }
    encoded
}
