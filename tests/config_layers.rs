//! Config Layer Tests
//!
//! Precedence builtin < file < env < CLI, with file provenance.

use std::fs;

use ppa_steward::config::{ConfigError, ConfigOrigin, EffectiveConfig, EnvOverrides};
use ppa_steward::version::SchemeKind;
use ppa_steward::{FailureThreshold, OrderBy};
use serde_json::json;
use sha2::{Digest, Sha256};
use tempfile::TempDir;

const HOST_CONFIG: &str = r#"
[archive]
service_root = "https://api.staging.launchpad.net/devel"
timeout_seconds = 45

[retention]
max_sources = 4
order_by = "version"
version_scheme = "debian"

[upload]
command = "dput"
args = ["-u"]

[credentials]
token = "file-token"
secret = "file-secret"
"#;

fn write_config(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    fs::write(&path, HOST_CONFIG).unwrap();
    path
}

#[test]
fn test_file_overrides_builtin() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir);

    let config = EffectiveConfig::build(Some(&path), true, &EnvOverrides::default(), None).unwrap();
    let settings = config.settings();
    assert_eq!(settings.archive.timeout_seconds, 45);
    assert_eq!(settings.retention.max_sources, 4);
    assert_eq!(settings.retention.order_by, OrderBy::Version);
    assert_eq!(settings.retention.version_scheme, SchemeKind::Debian);
    assert_eq!(settings.upload.args, vec!["-u"]);
    // Untouched keys keep their defaults
    assert_eq!(settings.builds.time_frame_minutes, 168);
    assert_eq!(settings.retention.failure_threshold, FailureThreshold::All);
    assert_eq!(settings.archive.consumer, "ppa-steward");
}

#[test]
fn test_file_provenance_digest() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir);

    let config = EffectiveConfig::build(Some(&path), true, &EnvOverrides::default(), None).unwrap();
    let file_source = config
        .sources
        .iter()
        .find(|s| s.origin == ConfigOrigin::File)
        .unwrap();
    assert_eq!(
        file_source.digest.as_deref(),
        Some(hex::encode(Sha256::digest(HOST_CONFIG.as_bytes())).as_str())
    );
    assert_eq!(
        file_source.path.as_deref(),
        Some(path.to_string_lossy().as_ref())
    );
}

#[test]
fn test_env_beats_file_and_cli_beats_env() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir);
    let env = EnvOverrides::from_pairs([
        ("LP_ACCESS_TOKEN", "env-token"),
        ("LP_SERVICE_ROOT", "https://api.qastaging.launchpad.net/devel"),
    ]);
    let cli = json!({"archive": {"service_root": "https://api.launchpad.net/devel"}});

    let config = EffectiveConfig::build(Some(&path), true, &env, Some(cli)).unwrap();
    let settings = config.settings();
    assert_eq!(settings.credentials.token.as_deref(), Some("env-token"));
    assert_eq!(settings.credentials.secret.as_deref(), Some("file-secret"));
    assert_eq!(settings.archive.service_root, "https://api.launchpad.net/devel");

    let origins: Vec<ConfigOrigin> = config.sources.iter().map(|s| s.origin.clone()).collect();
    assert_eq!(
        origins,
        vec![
            ConfigOrigin::Builtin,
            ConfigOrigin::File,
            ConfigOrigin::Env,
            ConfigOrigin::Cli
        ]
    );
}

#[test]
fn test_displayed_config_hides_credentials() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir);

    let config = EffectiveConfig::build(Some(&path), true, &EnvOverrides::default(), None).unwrap();
    let shown = config.to_json().unwrap();
    assert!(!shown.contains("file-secret"));
    assert!(!shown.contains("file-token"));
    assert!(config.redactions.contains(&"credentials.secret".to_string()));
    // The typed settings still carry the real values
    assert!(config.settings().credentials.resolve().unwrap().is_some());
}

#[test]
fn test_missing_default_file_is_skipped() {
    let dir = TempDir::new().unwrap();
    let absent = dir.path().join("nope.toml");
    let config =
        EffectiveConfig::build(Some(&absent), false, &EnvOverrides::default(), None).unwrap();
    assert_eq!(config.sources.len(), 1);
    assert_eq!(config.settings().retention.max_sources, 2);
}

#[test]
fn test_malformed_toml_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[retention\nmax_sources = ").unwrap();

    let err = EffectiveConfig::build(Some(&path), true, &EnvOverrides::default(), None).unwrap_err();
    assert!(matches!(err, ConfigError::ParseError(_)));
}

#[test]
fn test_negative_cap_in_file_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[retention]\nmax_sources = -1\n").unwrap();

    let err = EffectiveConfig::build(Some(&path), true, &EnvOverrides::default(), None).unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError(_)));
}

#[test]
fn test_unknown_order_rejected() {
    let cli = json!({"retention": {"order_by": "size"}});
    let err = EffectiveConfig::build(None, false, &EnvOverrides::default(), Some(cli)).unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError(_)));
}
