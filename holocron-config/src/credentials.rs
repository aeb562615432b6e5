//! Reads the API key from the local credentials file.
//!
//! The file is a JSON object with a string `api_key` field. The value may use
//! `${VAR}` placeholders, expanded from the environment like settings values.
use holocron_common::HolocronError;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CREDENTIALS_FILE: &str = "tumblr_credentials.json";
pub const API_KEY_FIELD: &str = "api_key";

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("credentials file not found: {}", .0.display())]
    Missing(PathBuf),
    #[error("failed to read credentials file {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("credentials file {} is not valid JSON: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("credentials file {} has no non-empty string field `{field}`", .path.display())]
    MissingField { path: PathBuf, field: &'static str },
}

impl From<CredentialsError> for HolocronError {
    fn from(err: CredentialsError) -> Self {
        HolocronError::Configuration(err.to_string())
    }
}

/// Load `api_key` from the JSON file at `path`.
pub fn load_api_key(path: impl AsRef<Path>) -> Result<String, CredentialsError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => CredentialsError::Missing(path.to_path_buf()),
        _ => CredentialsError::Unreadable {
            path: path.to_path_buf(),
            source,
        },
    })?;

    let doc: Value = serde_json::from_str(&raw).map_err(|source| CredentialsError::Malformed {
        path: path.to_path_buf(),
        source,
    })?;

    let mut key = doc
        .get(API_KEY_FIELD)
        .filter(|v| v.is_string())
        .cloned()
        .ok_or_else(|| CredentialsError::MissingField {
            path: path.to_path_buf(),
            field: API_KEY_FIELD,
        })?;
    crate::expand_env_in_value(&mut key);

    match key {
        Value::String(s) if !s.trim().is_empty() => {
            tracing::debug!(path=%path.display(), "config.credentials.loaded");
            Ok(s)
        }
        _ => Err(CredentialsError::MissingField {
            path: path.to_path_buf(),
            field: API_KEY_FIELD,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(tmp: &TempDir, body: &str) -> PathBuf {
        let p = tmp.path().join(DEFAULT_CREDENTIALS_FILE);
        fs::write(&p, body).expect("write credentials");
        p
    }

    #[test]
    fn reads_api_key() {
        let tmp = TempDir::new().unwrap();
        let p = write(&tmp, r#"{ "api_key": "abc123", "api_secret": "ignored" }"#);
        assert_eq!(load_api_key(&p).unwrap(), "abc123");
    }

    #[test]
    fn key_is_returned_as_written() {
        let tmp = TempDir::new().unwrap();
        let p = write(&tmp, r#"{ "api_key": " abc123\n" }"#);
        assert_eq!(load_api_key(&p).unwrap(), " abc123\n");
    }

    #[test]
    fn missing_file() {
        let tmp = TempDir::new().unwrap();
        let err = load_api_key(tmp.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, CredentialsError::Missing(_)));
    }

    #[test]
    fn malformed_json() {
        let tmp = TempDir::new().unwrap();
        let p = write(&tmp, "api_key = abc");
        assert!(matches!(
            load_api_key(&p).unwrap_err(),
            CredentialsError::Malformed { .. }
        ));
    }

    #[test]
    fn missing_or_non_string_field() {
        let tmp = TempDir::new().unwrap();
        for body in [r#"{ "key": "abc" }"#, r#"{ "api_key": 12 }"#, "[]", r#"{ "api_key": "  " }"#] {
            let p = write(&tmp, body);
            assert!(
                matches!(
                    load_api_key(&p).unwrap_err(),
                    CredentialsError::MissingField { field: "api_key", .. }
                ),
                "body {body} should be rejected"
            );
        }
    }

    #[test]
    fn placeholder_expands_from_env() {
        temp_env::with_var("HOLOCRON_TEST_TUMBLR_KEY", Some("from-env"), || {
            let tmp = TempDir::new().unwrap();
            let p = write(&tmp, r#"{ "api_key": "${HOLOCRON_TEST_TUMBLR_KEY}" }"#);
            assert_eq!(load_api_key(&p).unwrap(), "from-env");
        });
    }

    #[test]
    fn converts_to_configuration_error() {
        let err: HolocronError = CredentialsError::Missing(PathBuf::from("x.json")).into();
        assert!(matches!(err, HolocronError::Configuration(msg) if msg.contains("x.json")));
    }
}
