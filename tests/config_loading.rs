use std::io::Write;
use std::time::Duration;

use buildgraph::config::loader::{from_toml_str, load_and_validate, load_from_path};
use buildgraph::config::EngineConfig;
use buildgraph::errors::BuildGraphError;
use buildgraph::sequence::BuildInfo;
use buildgraph_test_utils::init_tracing;

#[test]
fn empty_toml_yields_defaults() {
    init_tracing();
    let cfg = from_toml_str("").unwrap();
    assert_eq!(cfg, EngineConfig::default());
    assert_eq!(cfg.poll_interval(), Duration::from_millis(100));
    assert_eq!(cfg.warn_timeout(), Duration::from_secs(15));
    assert_eq!(cfg.fail_timeout(), Duration::from_secs(60));
}

#[test]
fn fields_can_be_overridden() {
    init_tracing();
    let cfg = from_toml_str(
        r#"
poll_interval_secs = 0.25
build_warn_timeout_secs = 5.0
build_fail_timeout_secs = 30.0
"#,
    )
    .unwrap();

    assert_eq!(cfg.poll_interval(), Duration::from_millis(250));
    assert_eq!(cfg.warn_timeout(), Duration::from_secs(5));
    assert_eq!(cfg.fail_timeout(), Duration::from_secs(30));
}

#[test]
fn unknown_keys_are_rejected() {
    init_tracing();
    let err = from_toml_str("unknown_knob = 3\n").unwrap_err();
    assert!(matches!(err, BuildGraphError::TomlError(_)));
}

#[test]
fn non_positive_poll_interval_is_rejected() {
    init_tracing();
    let err = from_toml_str("poll_interval_secs = 0.0\n").unwrap_err();
    assert!(matches!(err, BuildGraphError::ConfigError(_)));
}

#[test]
fn non_positive_timeouts_are_rejected() {
    init_tracing();
    let err = from_toml_str("build_fail_timeout_secs = -1.0\n").unwrap_err();
    assert!(matches!(err, BuildGraphError::ConfigError(_)));
}

#[test]
fn warn_timeout_must_not_exceed_fail_timeout() {
    init_tracing();
    let err = from_toml_str(
        r#"
build_warn_timeout_secs = 90.0
build_fail_timeout_secs = 60.0
"#,
    )
    .unwrap_err();
    assert!(matches!(err, BuildGraphError::ConfigError(_)));
}

#[test]
fn non_finite_durations_are_rejected() {
    init_tracing();
    // `inf` is valid TOML and satisfies a plain `> 0` check, but can't be
    // turned into a Duration.
    let err = from_toml_str("poll_interval_secs = inf\n").unwrap_err();
    assert!(matches!(err, BuildGraphError::ConfigError(_)));

    let err = from_toml_str("build_fail_timeout_secs = nan\n").unwrap_err();
    assert!(matches!(err, BuildGraphError::ConfigError(_)));
}

#[test]
fn build_info_thresholds_are_validated() {
    init_tracing();
    assert!(BuildInfo::default().validate().is_ok());

    let mut info = BuildInfo::default();
    info.fail_timeout_secs = -1.0;
    assert!(matches!(
        info.validate(),
        Err(BuildGraphError::ConfigError(_))
    ));

    let mut info = BuildInfo::default();
    info.warn_timeout_secs = f64::INFINITY;
    assert!(info.validate().is_err());

    let mut info = BuildInfo::default();
    info.warn_timeout_secs = info.fail_timeout_secs + 1.0;
    assert!(info.validate().is_err());
}

#[test]
fn build_info_inherits_config_timeouts() {
    init_tracing();
    let cfg = from_toml_str(
        r#"
build_warn_timeout_secs = 2.0
build_fail_timeout_secs = 4.0
"#,
    )
    .unwrap();

    let info = BuildInfo::from_config(&cfg);
    assert_eq!(info.warn_timeout(), Duration::from_secs(2));
    assert_eq!(info.fail_timeout(), Duration::from_secs(4));
    assert!(info.tags.is_empty());
}

#[test]
fn load_from_file_round_trips() {
    init_tracing();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "poll_interval_secs = 0.5").unwrap();

    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg.poll_interval(), Duration::from_millis(500));
    assert_eq!(cfg.warn_timeout(), Duration::from_secs(15));
}

#[test]
fn missing_file_is_an_io_error() {
    init_tracing();
    let err = load_from_path("/definitely/not/here.toml").unwrap_err();
    assert!(matches!(err, BuildGraphError::IoError(_)));
}

#[test]
fn load_without_validation_accepts_bad_values() {
    init_tracing();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "poll_interval_secs = 0.0").unwrap();

    // Parsing alone succeeds; the validating entry point catches it.
    load_from_path(file.path()).unwrap();
    assert!(load_and_validate(file.path()).is_err());
}
