mod storage;
mod wizard;

use clap::{Parser, Subcommand};
use component_form::{
    build_controls, pagination, prepare_submission, resolve_visibility, validate_schema,
};
use form_spec::{
    Control, FormSession, SchemaSource, SessionError, StepError, StepNavigator, SubmissionPayload,
    fields_for_step,
};
use serde_json::{Map, Value, json};
use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use storage::{FileSchemaSource, FileSubmissionSink};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use wizard::{PromptContext, Verbosity, WizardPresenter, encode_hex, parse_input};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const OUTPUT_DIR_ENV: &str = "FORM_ENGINE_OUTPUT_DIR";

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Form schema engine CLI",
    long_about = "Checks form schemas, previews controls and visibility, prepares submissions, and fills step forms in a text shell"
)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise; also prints step progress in `fill`.
    #[arg(long, global = true, alias = "debug")]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the persistence checks (step rules and layout lint) on a schema.
    Validate {
        /// Path to the form schema JSON.
        #[arg(long, value_name = "SCHEMA")]
        schema: PathBuf,
        /// Print the raw structured response instead of a summary.
        #[arg(long)]
        json: bool,
    },
    /// Print the controls built for a schema, with their current values.
    Controls {
        #[arg(long, value_name = "SCHEMA")]
        schema: PathBuf,
        /// Optional JSON object of `fieldName` values to apply first.
        #[arg(long, value_name = "VALUES")]
        values: Option<PathBuf>,
    },
    /// Print the visibility of every field for the given values.
    Visibility {
        #[arg(long, value_name = "SCHEMA")]
        schema: PathBuf,
        #[arg(long, value_name = "VALUES")]
        values: Option<PathBuf>,
    },
    /// Print the pagination dots for a step form.
    Dots {
        /// Number of steps.
        #[arg(long)]
        total: usize,
        /// Active step, one-based.
        #[arg(long, default_value_t = 1)]
        current: usize,
    },
    /// Validate values and print the wire payload.
    Prepare {
        #[arg(long, value_name = "SCHEMA")]
        schema: PathBuf,
        #[arg(long, value_name = "VALUES")]
        values: Option<PathBuf>,
        /// Also print the payload as canonical CBOR hex.
        #[arg(long)]
        cbor: bool,
    },
    /// Fill a form interactively and save the submission to disk.
    Fill {
        /// Path to the form JSON (bare schema or published envelope).
        #[arg(long, value_name = "SCHEMA")]
        schema: PathBuf,
        /// Optional JSON file containing initial values.
        #[arg(long, value_name = "VALUES")]
        values: Option<PathBuf>,
        /// Directory for submission files (defaults to FORM_ENGINE_OUTPUT_DIR or the current directory).
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
        /// Submission token (defaults to the schema file name).
        #[arg(long)]
        token: Option<String>,
        /// Also print the submitted payload as JSON.
        #[arg(long)]
        payload_json: bool,
    },
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Command::Validate { schema, json } => run_validate(&schema, json),
        Command::Controls { schema, values } => run_controls(&schema, values.as_deref()),
        Command::Visibility { schema, values } => run_visibility(&schema, values.as_deref()),
        Command::Dots { total, current } => run_dots(total, current),
        Command::Prepare {
            schema,
            values,
            cbor,
        } => run_prepare(&schema, values.as_deref(), cbor),
        Command::Fill {
            schema,
            values,
            out,
            token,
            payload_json,
        } => run_fill(
            &schema,
            values.as_deref(),
            out,
            token,
            payload_json,
            cli.verbose,
        ),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = env::var("RUST_LOG").unwrap_or_else(|_| default_level.into());
    tracing_subscriber::registry()
        .with(EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn schema_config(path: &Path) -> CliResult<String> {
    let schema_json = fs::read_to_string(path)?;
    Ok(json!({ "schema_json": schema_json }).to_string())
}

fn read_values(path: Option<&Path>) -> CliResult<Map<String, Value>> {
    let Some(path) = path else {
        return Ok(Map::new());
    };
    let contents = fs::read_to_string(path)?;
    match serde_json::from_str(&contents)? {
        Value::Object(values) => Ok(values),
        _ => Err(format!("{} must contain a JSON object", path.display()).into()),
    }
}

fn values_json(path: Option<&Path>) -> CliResult<String> {
    Ok(Value::Object(read_values(path)?).to_string())
}

fn parse_component_result(response: &str) -> CliResult<Value> {
    let value: Value = serde_json::from_str(response)?;
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        Err(error.into())
    } else {
        Ok(value)
    }
}

fn print_pretty(value: &Value) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_validate(schema_path: &Path, raw_json: bool) -> CliResult<()> {
    let response = parse_component_result(&validate_schema(&schema_config(schema_path)?))?;
    if raw_json {
        print_pretty(&response)?;
    }
    if response["valid"] == true {
        if !raw_json {
            println!("Schema is valid");
        }
        return Ok(());
    }

    if !raw_json {
        println!("Schema is invalid (status {}):", response["status"]);
        for error in response["errors"].as_array().into_iter().flatten() {
            println!(
                "  {} [{}] {}",
                error["code"].as_str().unwrap_or("unknown"),
                error["path"].as_str().unwrap_or("/"),
                error["message"].as_str().unwrap_or_default()
            );
        }
    }
    Err("schema validation failed".into())
}

fn run_controls(schema_path: &Path, values_path: Option<&Path>) -> CliResult<()> {
    let response = build_controls(&schema_config(schema_path)?, &values_json(values_path)?);
    print_pretty(&parse_component_result(&response)?)
}

fn run_visibility(schema_path: &Path, values_path: Option<&Path>) -> CliResult<()> {
    let response = resolve_visibility(&schema_config(schema_path)?, &values_json(values_path)?);
    print_pretty(&parse_component_result(&response)?)
}

fn run_dots(total: usize, current: usize) -> CliResult<()> {
    if current == 0 || current > total {
        return Err(format!("--current must be between 1 and {}", total).into());
    }
    let response = parse_component_result(&pagination(total, current - 1))?;
    println!("{}", response["label"].as_str().unwrap_or_default());
    Ok(())
}

fn run_prepare(schema_path: &Path, values_path: Option<&Path>, cbor: bool) -> CliResult<()> {
    let response = parse_component_result(&prepare_submission(
        &schema_config(schema_path)?,
        &values_json(values_path)?,
    ))?;

    if response["status"] == "error" {
        match response["stepIndex"].as_u64() {
            Some(step) => eprintln!("Submission is invalid (step {}):", step + 1),
            None => eprintln!("Submission is invalid:"),
        }
        for error in response["errors"].as_array().into_iter().flatten() {
            eprintln!(
                "  {} - {}",
                error["fieldName"].as_str().unwrap_or("<unknown>"),
                error["message"].as_str().unwrap_or_default()
            );
        }
        return Err("submission is invalid".into());
    }

    print_pretty(&response["payload"])?;
    if cbor {
        let payload: SubmissionPayload = serde_json::from_value(response["payload"].clone())?;
        println!("CBOR: {}", encode_hex(&payload.to_cbor()?));
    }
    Ok(())
}

fn resolve_output_root(out: Option<PathBuf>) -> CliResult<PathBuf> {
    let candidate = match out {
        Some(path) => path,
        None => env::var_os(OUTPUT_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    if candidate.as_os_str().is_empty() {
        return Err("output directory cannot be empty".into());
    }
    Ok(candidate)
}

fn run_fill(
    schema_path: &Path,
    values_path: Option<&Path>,
    out: Option<PathBuf>,
    token: Option<String>,
    payload_json: bool,
    verbose: bool,
) -> CliResult<()> {
    let (source, file_token) = FileSchemaSource::for_file(schema_path)?;
    let form = source.fetch(&file_token)?;
    let token = token.unwrap_or(file_token);
    let sink = FileSubmissionSink::new(resolve_output_root(out)?);
    let presenter = WizardPresenter::new(Verbosity::from_verbose(verbose), payload_json);

    presenter.show_header(&form);
    let mut session = FormSession::new(form.schema)?;
    session.apply_values(&read_values(values_path)?);

    loop {
        if let Some(navigator) = session.navigator() {
            presenter.show_step(navigator);
        }
        if let PromptOutcome::Back = fill_current_step(&mut session, &presenter)? {
            if let Err(err) = session.previous() {
                eprintln!("{}", err);
            }
            continue;
        }

        let on_last_step = session.navigator().is_none_or(StepNavigator::is_last);
        if !on_last_step {
            match session.next() {
                Ok(_) => {}
                Err(SessionError::Step(StepError::Invalid { errors, .. })) => {
                    presenter.show_field_errors(&errors)
                }
                Err(err) => return Err(err.into()),
            }
            continue;
        }

        match session.submit(&sink, &token) {
            Ok(receipt) => {
                presenter.show_completion(&receipt, &session.payload());
                return Ok(());
            }
            Err(SessionError::Step(StepError::Invalid { step_index, errors })) => {
                presenter.show_field_errors(&errors);
                session.go_to_step(step_index)?;
            }
            Err(SessionError::Invalid(errors)) => presenter.show_field_errors(&errors),
            Err(err) => return Err(err.into()),
        }
    }
}

enum PromptOutcome {
    Done,
    Back,
}

enum FieldInput {
    Keep,
    Value(Value),
    Back,
}

/// Prompts every visible input of the active step, re-checking visibility after each answer.
fn fill_current_step(
    session: &mut FormSession,
    presenter: &WizardPresenter,
) -> CliResult<PromptOutcome> {
    presenter.show_visible_fields(&session.current_fields());

    let mut fields = match session.navigator() {
        Some(navigator) => fields_for_step(session.schema(), navigator.current_index()),
        None => session.schema().fields.iter().collect(),
    };
    fields.sort_by_key(|field| field.order);
    let field_ids = fields
        .into_iter()
        .map(|field| field.id.clone())
        .collect::<Vec<_>>();

    for field_id in field_ids {
        if !session.visibility().get(&field_id).copied().unwrap_or(true) {
            continue;
        }
        let Some(field) = session.schema().field(&field_id).cloned() else {
            continue;
        };
        let Some(name) = field.key().map(str::to_string) else {
            presenter.show_display_field(&field);
            continue;
        };
        let Some(control) = session.controls().get(&name).cloned() else {
            continue;
        };

        let prompt = PromptContext::new(&field, &control);
        match prompt_field(&prompt, &control, presenter)? {
            FieldInput::Back => return Ok(PromptOutcome::Back),
            FieldInput::Keep => {}
            FieldInput::Value(value) => {
                let hidden = session.set_value(&name, value)?;
                if !hidden.is_empty() {
                    tracing::debug!(?hidden, "answer hid fields");
                }
            }
        }
    }
    Ok(PromptOutcome::Done)
}

fn prompt_field(
    prompt: &PromptContext,
    control: &Control,
    presenter: &WizardPresenter,
) -> CliResult<FieldInput> {
    loop {
        presenter.show_prompt(prompt);
        print!("> ");
        io::stdout().flush()?;
        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Err("wizard aborted: input closed".into());
        }

        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case("exit") {
            return Err("wizard aborted by user".into());
        }
        if trimmed.eq_ignore_ascii_case("back") {
            return Ok(FieldInput::Back);
        }

        match parse_input(control, trimmed) {
            Ok(Some(value)) => return Ok(FieldInput::Value(value)),
            Ok(None) => return Ok(FieldInput::Keep),
            Err(err) => presenter.show_parse_error(&err),
        }
    }
}
