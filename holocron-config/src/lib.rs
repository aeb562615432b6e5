//! Loader for run settings with YAML + environment overlays, and the credential file reader.
//!
//! Settings come from an optional `holocron.yaml`, inline YAML (tests), and finally
//! `HOLOCRON__`-prefixed environment variables, later sources winning. `${VAR}`
//! placeholders in string values are expanded after merging. Every field has a default,
//! so a run with no settings file at all harvests the built-in series list.
use config::{Config, ConfigError, Environment, File};
use holocron_common::observability::{LogConfig, LogFormat};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

pub mod credentials;

pub use credentials::{CredentialsError, load_api_key};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

pub const DEFAULT_SETTINGS_FILE: &str = "holocron.yaml";
pub const DEFAULT_ENDPOINT: &str = "https://api.tumblr.com/";
pub const DEFAULT_LIMIT: u32 = 30;
pub const DEFAULT_SERIES: [&str; 6] = [
    "The Mandalorian",
    "The Book of Boba Fett",
    "Obi-Wan Kenobi",
    "Andor",
    "Ahsoka",
    "The Acolyte",
];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HolocronSettings {
    /// JSON file holding `api_key`.
    pub credentials_path: PathBuf,
    /// Base URL of the tagged-search API.
    pub endpoint: String,
    /// Tags to search, in order. Each one is also the `series` value of its posts.
    pub series: Vec<String>,
    /// Maximum posts requested per series.
    pub limit: u32,
    pub posts_file: PathBuf,
    pub comments_file: PathBuf,
    pub http: HttpSettings,
    pub log: LogSettings,
}

impl Default for HolocronSettings {
    fn default() -> Self {
        Self {
            credentials_path: PathBuf::from(credentials::DEFAULT_CREDENTIALS_FILE),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            series: DEFAULT_SERIES.iter().map(|s| s.to_string()).collect(),
            limit: DEFAULT_LIMIT,
            posts_file: PathBuf::from("tumblr_posts.csv"),
            comments_file: PathBuf::from("tumblr_comments.csv"),
            http: HttpSettings::default(),
            log: LogSettings::default(),
        }
    }
}

/// Network knobs. The defaults mean one attempt with no deadline.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub timeout_secs: Option<u64>,
    pub retries: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub dir: Option<PathBuf>,
    pub json: bool,
    pub stderr: bool,
    pub filter: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            dir: None,
            json: false,
            stderr: false,
            filter: "info".to_string(),
        }
    }
}

impl LogSettings {
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            app_name: "holocron",
            log_dir: self.dir.clone(),
            emit_stderr: self.stderr,
            format: if self.json {
                LogFormat::Json
            } else {
                LogFormat::Text
            },
            default_filter: self.filter.clone(),
        }
    }
}

pub(crate) fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct SettingsLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsLoader {
    /// Start with no sources; [`SettingsLoader::load`] layers `HOLOCRON__` env overrides on top.
    ///
    /// ```
    /// use holocron_config::SettingsLoader;
    ///
    /// let settings = SettingsLoader::new()
    ///     .with_yaml_str("limit: 5\nseries: [Andor]")
    ///     .load()
    ///     .expect("valid settings");
    ///
    /// assert_eq!(settings.limit, 5);
    /// assert_eq!(settings.series, vec!["Andor".to_string()]);
    /// assert_eq!(settings.http.retries, 0);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a required YAML/TOML/JSON file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that may be absent.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests to merge inline YAML snippets.
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into typed settings.
    ///
    /// ```
    /// use holocron_config::SettingsLoader;
    ///
    /// unsafe { std::env::set_var("HOLOCRON_DOC_DATA", "/srv/holocron"); }
    ///
    /// let settings = SettingsLoader::new()
    ///     .with_yaml_str(r#"posts_file: "${HOLOCRON_DOC_DATA}/posts.csv""#)
    ///     .load()
    ///     .expect("valid settings");
    ///
    /// assert_eq!(settings.posts_file.to_str(), Some("/srv/holocron/posts.csv"));
    /// assert_eq!(settings.comments_file.to_str(), Some("tumblr_comments.csv"));
    ///
    /// unsafe { std::env::remove_var("HOLOCRON_DOC_DATA"); }
    /// ```
    pub fn load(self) -> Result<HolocronSettings, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("HOLOCRON")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("series")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: HolocronSettings =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;

        if typed.series.is_empty() {
            tracing::warn!("config.series.empty");
        }
        Ok(typed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("FOO", Some("bar"), || {
            let mut v = json!("prefix-${FOO}-suffix");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("prefix-bar-suffix"));
        });
    }

    #[test]
    fn expands_in_array_and_object() {
        temp_env::with_vars([("SHOW", Some("Andor")), ("ERA", Some("Rebellion"))], || {
            let mut v = json!(["tag-$SHOW", { "era": "${ERA}" }, 30, true, null]);
            expand_env_in_value(&mut v);
            assert_eq!(v, json!(["tag-Andor", { "era": "Rebellion" }, 30, true, null]));
        });
    }

    #[test]
    fn expands_recursively_across_env_values() {
        temp_env::with_vars(
            [
                ("BAZ", Some("qux")),
                ("BAR", Some("mid-${BAZ}")),
                ("FOO", Some("start-${BAR}-end")),
            ],
            || {
                let mut v = json!("X=${FOO}");
                expand_env_in_value(&mut v);
                assert_eq!(v, json!("X=start-mid-qux-end"));
            },
        );
    }

    #[test]
    fn stops_on_cycles() {
        temp_env::with_vars([("A", Some("${B}")), ("B", Some("${A}"))], || {
            let mut v = json!("x=${A}-y");
            expand_env_in_value(&mut v);
            let s = v.as_str().unwrap();
            assert!(s.starts_with("x=") && s.ends_with("-y"));
            assert!(s.contains("${"));
        });
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut v = json!("hi-${DOES_NOT_EXIST_HOLOCRON}");
        expand_env_in_value(&mut v);
        assert_eq!(v, json!("hi-${DOES_NOT_EXIST_HOLOCRON}"));
    }

    #[test]
    fn defaults_match_builtin_run() {
        let s = HolocronSettings::default();
        assert_eq!(s.series.len(), 6);
        assert_eq!(s.series[0], "The Mandalorian");
        assert_eq!(s.limit, 30);
        assert_eq!(s.endpoint, "https://api.tumblr.com/");
        assert_eq!(s.http.timeout_secs, None);
        assert_eq!(s.http.retries, 0);
        assert_eq!(s.credentials_path, PathBuf::from("tumblr_credentials.json"));
    }

    #[test]
    fn log_settings_map_to_log_config() {
        let log = LogSettings {
            json: true,
            stderr: true,
            ..LogSettings::default()
        };
        let cfg = log.to_log_config();
        assert_eq!(cfg.format, LogFormat::Json);
        assert!(cfg.emit_stderr);
        assert_eq!(cfg.default_filter, "info");
    }
}
