use holocron_config::SettingsLoader;
use serial_test::serial;
use std::{fs, path::PathBuf};
use tempfile::TempDir;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

#[test]
#[serial]
fn file_values_override_defaults() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(
        &tmp,
        "holocron.yaml",
        r#"
series:
  - Andor
  - Ahsoka
limit: 10
posts_file: out/posts.csv
http:
  timeout_secs: 20
log:
  json: true
"#,
    );

    let settings = SettingsLoader::new().with_file(p).load().expect("load settings");

    assert_eq!(settings.series, vec!["Andor", "Ahsoka"]);
    assert_eq!(settings.limit, 10);
    assert_eq!(settings.posts_file, PathBuf::from("out/posts.csv"));
    assert_eq!(settings.comments_file, PathBuf::from("tumblr_comments.csv"));
    assert_eq!(settings.http.timeout_secs, Some(20));
    assert_eq!(settings.http.retries, 0);
    assert!(settings.log.json);
    assert_eq!(settings.log.filter, "info");
}

#[test]
#[serial]
fn missing_optional_file_yields_defaults() {
    let tmp = TempDir::new().unwrap();
    let settings = SettingsLoader::new()
        .with_optional_file(tmp.path().join("holocron.yaml"))
        .load()
        .expect("defaults");
    assert_eq!(settings.series.len(), 6);
    assert_eq!(settings.limit, 30);
}

#[test]
#[serial]
fn missing_required_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let res = SettingsLoader::new()
        .with_file(tmp.path().join("holocron.yaml"))
        .load();
    assert!(res.is_err());
}

#[test]
#[serial]
fn environment_wins_over_file() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "holocron.yaml", "limit: 10\nseries: [Andor]\n");

    temp_env::with_vars(
        [
            ("HOLOCRON__LIMIT", Some("5")),
            ("HOLOCRON__SERIES", Some("Ahsoka,The Acolyte")),
        ],
        || {
            let settings = SettingsLoader::new().with_file(&p).load().expect("load");
            assert_eq!(settings.limit, 5);
            assert_eq!(settings.series, vec!["Ahsoka", "The Acolyte"]);
        },
    );
}
