use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use form_spec::{
    FetchError, FetchedForm, FormSchema, SchemaSource, SubmissionPayload, SubmissionReceipt,
    SubmissionSink, SubmitError,
};
use serde::Deserialize;

/// A form file is either a published form envelope or a bare schema.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredForm {
    Published(FetchedForm),
    Bare(FormSchema),
}

/// Reads `<root>/<token>.json`.
pub struct FileSchemaSource {
    root: PathBuf,
}

impl FileSchemaSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Source and token addressing a single schema file.
    pub fn for_file(path: &Path) -> Result<(Self, String), FetchError> {
        let token = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or(FetchError::InvalidToken)?
            .to_string();
        let root = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Ok((Self::new(root), token))
    }
}

impl SchemaSource for FileSchemaSource {
    fn fetch(&self, token: &str) -> Result<FetchedForm, FetchError> {
        if !is_valid_token(token) {
            return Err(FetchError::InvalidToken);
        }
        let path = self.root.join(format!("{}.json", token));
        let raw = fs::read_to_string(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => FetchError::NotFound,
            _ => FetchError::Network(format!("{}: {}", path.display(), err)),
        })?;
        let stored: StoredForm = serde_json::from_str(&raw)
            .map_err(|err| FetchError::Network(format!("{}: {}", path.display(), err)))?;
        tracing::debug!(token, "loaded form from disk");
        Ok(match stored {
            StoredForm::Published(form) => form,
            StoredForm::Bare(schema) => FetchedForm {
                title: token.to_string(),
                description: None,
                schema,
                theme: None,
            },
        })
    }
}

/// Writes each accepted payload to `<dir>/<token>-<n>.json`.
pub struct FileSubmissionSink {
    dir: PathBuf,
}

impl FileSubmissionSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn next_path(&self, token: &str) -> PathBuf {
        let mut index = 1;
        loop {
            let candidate = self.dir.join(format!("{}-{}.json", token, index));
            if !candidate.exists() {
                return candidate;
            }
            index += 1;
        }
    }
}

impl SubmissionSink for FileSubmissionSink {
    fn submit(
        &self,
        token: &str,
        payload: &SubmissionPayload,
    ) -> Result<SubmissionReceipt, SubmitError> {
        if !is_valid_token(token) {
            return Err(SubmitError::NotFound);
        }
        fs::create_dir_all(&self.dir)
            .map_err(|err| SubmitError::Submission(format!("{}: {}", self.dir.display(), err)))?;
        let path = self.next_path(token);
        let body = payload
            .to_json_pretty()
            .map_err(|err| SubmitError::Submission(err.to_string()))?;
        fs::write(&path, body)
            .map_err(|err| SubmitError::Submission(format!("{}: {}", path.display(), err)))?;

        let submission_id = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(token)
            .to_string();
        Ok(SubmissionReceipt {
            submission_id,
            message: Some(format!("saved to {}", path.display())),
        })
    }
}

fn is_valid_token(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, json};

    #[test]
    fn fetch_accepts_bare_schema_and_envelope() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("bare.json"), r#"{"fields": []}"#).expect("write");
        fs::write(
            dir.path().join("published.json"),
            json!({ "title": "Survey", "schema": { "fields": [] } }).to_string(),
        )
        .expect("write");

        let source = FileSchemaSource::new(dir.path());
        assert_eq!(source.fetch("bare").expect("bare").title, "bare");
        assert_eq!(source.fetch("published").expect("published").title, "Survey");
        assert_eq!(source.fetch("missing"), Err(FetchError::NotFound));
        assert_eq!(source.fetch("../etc"), Err(FetchError::InvalidToken));
    }

    #[test]
    fn sink_numbers_files_per_token() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sink = FileSubmissionSink::new(dir.path().join("out"));
        let payload = SubmissionPayload::new(Map::new());

        let first = sink.submit("signup", &payload).expect("first");
        let second = sink.submit("signup", &payload).expect("second");
        assert_eq!(first.submission_id, "signup-1");
        assert_eq!(second.submission_id, "signup-2");
        assert!(dir.path().join("out/signup-2.json").exists());
    }
}
