//! Integration tests for deploy-config

use deploy_config::{Config, ConfigError, ProbeOverride, build_table, parser};
use deploy_orchestration::{ProbeSpec, StatusRange};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

#[test]
fn test_full_config_parsing() {
    let yaml = r#"
version: "1.0"
project_dir: /opt/honeypot
compose_file: compose.prod.yml

settings:
  log_level: debug
  probe_timeout: 3
  engine_timeout: 60
  concurrency: 2
  log_file: deploy-run.log

services:
  kibana:
    max_wait: 900
    poll_interval: 15
    probe:
      http: "http://${DEPLOY_CONFIG_TEST_UNSET_KIBANA:-localhost}:5601/api/status"
      status: [200, 299]
  cowrie:
    probe:
      tcp: "127.0.0.1:2222"
  dionaea:
    probe:
      container: dionaea-honeypot
      field: State.Health.Status
"#;

    let config = parser::parse_str(yaml).unwrap();
    assert_eq!(config.project_dir, PathBuf::from("/opt/honeypot"));
    assert_eq!(config.compose_file, "compose.prod.yml");
    assert_eq!(config.settings.log_level.as_deref(), Some("debug"));
    assert_eq!(config.settings.probe_timeout(), Duration::from_secs(3));
    assert_eq!(config.settings.engine_timeout(), Duration::from_secs(60));
    assert_eq!(config.settings.concurrency(), 2);
    assert_eq!(config.log_path(), PathBuf::from("/opt/honeypot/deploy-run.log"));
    assert!(matches!(
        config.services["cowrie"].probe,
        Some(ProbeOverride::Tcp(_))
    ));

    let table = build_table(&config).unwrap();
    let kibana = table.get("kibana").unwrap();
    assert_eq!(kibana.max_wait, Duration::from_secs(900));
    assert_eq!(kibana.poll_interval, Duration::from_secs(15));
    assert_eq!(
        kibana.readiness_probe,
        ProbeSpec::HttpGet {
            url: "http://localhost:5601/api/status".to_string(),
            expected_status: StatusRange::new(200, 299),
        }
    );
    assert_eq!(kibana.dependencies, vec!["elasticsearch"]);

    assert_eq!(
        table.get("cowrie").unwrap().readiness_probe,
        ProbeSpec::tcp("127.0.0.1", 2222)
    );
    assert_eq!(
        table.get("dionaea").unwrap().readiness_probe,
        ProbeSpec::process_field("dionaea-honeypot", "State.Health.Status")
    );

    // Untouched services keep their built-in tuning
    let webapp = table.get("webapp").unwrap();
    assert_eq!(webapp.max_wait, Duration::from_secs(120));
    assert_eq!(webapp.poll_interval, Duration::from_secs(3));
}

#[test]
fn test_minimal_config_uses_defaults() {
    let config = parser::parse_str("version: \"1.0\"\n").unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.settings.probe_timeout(), Duration::from_secs(5));
    assert_eq!(config.settings.engine_timeout(), Duration::from_secs(120));
    assert_eq!(config.settings.concurrency(), 4);
    assert_eq!(config.log_path(), PathBuf::from("./deployment.log"));
}

#[test]
fn test_version_check() {
    let err = parser::parse_str("version: \"2.0\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError(_)));
    assert!(err.to_string().contains("Unsupported version"));
}

#[test]
fn test_unknown_service_override() {
    let yaml = r#"
version: "1.0"
services:
  grafana:
    max_wait: 30
"#;
    match parser::parse_str(yaml) {
        Err(ConfigError::ServiceNotFound(name)) => assert_eq!(name, "grafana"),
        other => panic!("expected ServiceNotFound, got {:?}", other),
    }
}

#[test]
fn test_override_cannot_change_dependencies() {
    let yaml = r#"
version: "1.0"
services:
  kibana:
    dependencies: []
"#;
    assert!(matches!(
        parser::parse_str(yaml),
        Err(ConfigError::YamlError(_))
    ));
}

#[test]
fn test_zero_durations_rejected() {
    for yaml in [
        "version: \"1.0\"\nservices:\n  webapp:\n    max_wait: 0\n",
        "version: \"1.0\"\nservices:\n  webapp:\n    poll_interval: 0\n",
        "version: \"1.0\"\nsettings:\n  probe_timeout: 0\n",
        "version: \"1.0\"\nsettings:\n  concurrency: 0\n",
    ] {
        assert!(
            matches!(parser::parse_str(yaml), Err(ConfigError::ValidationError(_))),
            "accepted: {}",
            yaml
        );
    }
}

#[test]
fn test_inverted_status_range_rejected() {
    let yaml = r#"
version: "1.0"
services:
  flask:
    probe:
      http: "http://localhost:8181/"
      status: [499, 200]
"#;
    let err = parser::parse_str(yaml).unwrap_err();
    assert!(err.to_string().contains("499-200"));
}

#[test]
fn test_bad_tcp_address_rejected() {
    let yaml = r#"
version: "1.0"
services:
  cowrie:
    probe:
      tcp: "localhost"
"#;
    assert!(matches!(
        parser::parse_str(yaml),
        Err(ConfigError::ValidationError(_))
    ));
}

#[test]
fn test_unknown_log_level_rejected() {
    let yaml = "version: \"1.0\"\nsettings:\n  log_level: chatty\n";
    assert!(matches!(
        parser::parse_str(yaml),
        Err(ConfigError::ValidationError(_))
    ));
}

#[test]
fn test_missing_environment_variables_listed() {
    let yaml = r#"
version: "1.0"
project_dir: "${DEPLOY_CONFIG_TEST_MISSING_DIR}"
services:
  webapp:
    probe:
      http: "http://${DEPLOY_CONFIG_TEST_MISSING_HOST}:5000/api/health"
"#;
    match parser::parse_str(yaml) {
        Err(ConfigError::EnvVarNotFound(vars)) => {
            assert!(vars.contains("DEPLOY_CONFIG_TEST_MISSING_DIR"));
            assert!(vars.contains("DEPLOY_CONFIG_TEST_MISSING_HOST"));
        }
        other => panic!("expected EnvVarNotFound, got {:?}", other),
    }
}

#[test]
fn test_environment_substitution() {
    // SAFETY: the variable name is unique to this test
    unsafe {
        std::env::set_var("DEPLOY_CONFIG_TEST_FLASK_PORT", "8282");
    }
    let yaml = r#"
version: "1.0"
services:
  flask:
    probe:
      http: "http://localhost:${DEPLOY_CONFIG_TEST_FLASK_PORT}/"
      status: [200, 499]
"#;
    let table = build_table(&parser::parse_str(yaml).unwrap()).unwrap();
    assert_eq!(
        table.get("flask").unwrap().readiness_probe,
        ProbeSpec::HttpGet {
            url: "http://localhost:8282/".to_string(),
            expected_status: StatusRange::new(200, 499),
        }
    );
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "version: \"1.0\"\nsettings:\n  concurrency: 1").unwrap();

    let config = parser::load(file.path()).unwrap();
    assert_eq!(config.settings.concurrency(), 1);
}

#[test]
fn test_load_missing_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = parser::load(dir.path().join("deploy.yaml")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_project_location_substituted() {
    let yaml = r#"
version: "1.0"
project_dir: "${DEPLOY_CONFIG_TEST_UNSET_ROOT:-/srv/honeypot}"
compose_file: "${DEPLOY_CONFIG_TEST_UNSET_COMPOSE:-docker-compose.yml}"
"#;
    let config = parser::parse_str(yaml).unwrap();
    assert_eq!(config.project_dir, PathBuf::from("/srv/honeypot"));
    assert_eq!(config.compose_file, "docker-compose.yml");
}

#[test]
fn test_readiness_keys_from_other_forms_rejected() {
    for probe in [
        "tcp: \"localhost:2222\"\n      status: [200, 299]",
        "http: \"http://localhost:5000/\"\n      port: 5000",
        "container: webapp\n      field: State.Status\n      http: \"http://localhost:5000/\"",
    ] {
        let yaml = format!("version: \"1.0\"\nservices:\n  webapp:\n    probe:\n      {}\n", probe);
        assert!(
            matches!(parser::parse_str(&yaml), Err(ConfigError::YamlError(_))),
            "accepted: {}",
            probe
        );
    }
}
