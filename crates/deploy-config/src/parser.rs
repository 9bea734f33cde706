//! Configuration parser with environment variable substitution

use crate::{
    Config, ConfigError, FieldOverride, HttpOverride, ProbeOverride, Result, TcpOverride,
    table::parse_tcp_address,
};
use deploy_orchestration::DescriptorTable;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Load a configuration file, falling back to built-in defaults when the
/// file does not exist
pub fn load(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        debug!("No config file at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    parse_file(path)
}

/// Parse a YAML configuration file
pub fn parse_file(path: impl AsRef<Path>) -> Result<Config> {
    let content = std::fs::read_to_string(path)?;
    parse_str(&content)
}

/// Parse YAML configuration from a string
pub fn parse_str(content: &str) -> Result<Config> {
    let mut config: Config = serde_yaml::from_str(content)?;
    validate_config(&config)?;

    config.project_dir = PathBuf::from(substitute_env_vars(&config.project_dir.to_string_lossy())?);
    config.compose_file = substitute_env_vars(&config.compose_file)?;
    Ok(config)
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    // Check version
    if config.version != "1.0" {
        return Err(ConfigError::ValidationError(format!(
            "Unsupported version: {}, expected 1.0",
            config.version
        )));
    }

    if let Some(level) = &config.settings.log_level {
        if !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Unknown log level '{}', expected one of: {}",
                level,
                LOG_LEVELS.join(", ")
            )));
        }
    }
    for (setting, value) in [
        ("probe_timeout", config.settings.probe_timeout),
        ("engine_timeout", config.settings.engine_timeout),
    ] {
        if value == Some(0) {
            return Err(ConfigError::ValidationError(format!(
                "settings.{} must be greater than 0",
                setting
            )));
        }
    }
    if config.settings.concurrency == Some(0) {
        return Err(ConfigError::ValidationError(
            "settings.concurrency must be at least 1".to_string(),
        ));
    }

    // Overrides may only tune services the platform has
    let platform = DescriptorTable::new(deploy_orchestration::platform_services())?;
    for (name, service) in &config.services {
        if !platform.contains(name) {
            return Err(ConfigError::ServiceNotFound(name.clone()));
        }

        for (field, value) in [
            ("max_wait", service.max_wait),
            ("poll_interval", service.poll_interval),
        ] {
            if value == Some(0) {
                return Err(ConfigError::ValidationError(format!(
                    "Service '{}': {} must be greater than 0",
                    name, field
                )));
            }
        }

        match &service.probe {
            Some(ProbeOverride::Http(HttpOverride {
                status: Some([low, high]),
                ..
            })) if low > high => {
                return Err(ConfigError::ValidationError(format!(
                    "Service '{}': status range {}-{} is empty",
                    name, low, high
                )));
            }
            Some(ProbeOverride::Tcp(TcpOverride { tcp })) => {
                // Missing variables are reported by validate_references
                if let Ok(address) = substitute_env_vars(tcp) {
                    parse_tcp_address(&address).map_err(|e| {
                        ConfigError::ValidationError(format!("Service '{}': {}", name, e))
                    })?;
                }
            }
            _ => {}
        }
    }

    // Validate all variable references
    validate_references(config)
}

/// Every `${VAR}` must have a value or a default
fn validate_references(config: &Config) -> Result<()> {
    let project_dir = config.project_dir.to_string_lossy();
    let mut values: Vec<&str> = vec![project_dir.as_ref(), config.compose_file.as_str()];
    for service in config.services.values() {
        match &service.probe {
            Some(ProbeOverride::Http(HttpOverride { http, .. })) => values.push(http),
            Some(ProbeOverride::Tcp(TcpOverride { tcp })) => values.push(tcp),
            Some(ProbeOverride::Field(FieldOverride { container, field })) => {
                values.push(container);
                values.push(field);
            }
            None => {}
        }
    }

    let missing: Vec<String> = values
        .into_iter()
        .filter_map(|value| match substitute_env_vars(value) {
            Err(ConfigError::EnvVarNotFound(vars)) => Some(vars),
            _ => None,
        })
        .collect();

    if !missing.is_empty() {
        return Err(ConfigError::EnvVarNotFound(missing.join(", ")));
    }
    Ok(())
}

/// Substitute environment variables in a string
pub fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| ConfigError::ValidationError(format!("Invalid pattern: {}", e)))?;
    let mut result = input.to_string();
    let mut errors = Vec::new();

    for cap in re.captures_iter(input) {
        let full_match = &cap[0];
        let var_expr = &cap[1];

        // Handle default values: ${VAR:-default}
        let (var_name, default_value) = match var_expr.split_once(":-") {
            Some((name, default)) => (name, Some(default)),
            None => (var_expr, None),
        };

        match (std::env::var(var_name), default_value) {
            (Ok(value), _) => result = result.replace(full_match, &value),
            (Err(_), Some(default)) => result = result.replace(full_match, default),
            (Err(_), None) => errors.push(var_name.to_string()),
        }
    }

    if !errors.is_empty() {
        return Err(ConfigError::EnvVarNotFound(errors.join(", ")));
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_value_used_when_unset() {
        let result =
            substitute_env_vars("http://${DEPLOY_TEST_SURELY_UNSET_HOST:-localhost}:5601/").unwrap();
        assert_eq!(result, "http://localhost:5601/");
    }

    #[test]
    fn test_missing_variables_are_listed() {
        let err = substitute_env_vars("${DEPLOY_TEST_MISSING_A}:${DEPLOY_TEST_MISSING_B}")
            .unwrap_err();
        match err {
            ConfigError::EnvVarNotFound(vars) => {
                assert_eq!(vars, "DEPLOY_TEST_MISSING_A, DEPLOY_TEST_MISSING_B");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_plain_strings_untouched() {
        assert_eq!(
            substitute_env_vars("docker-compose.yml").unwrap(),
            "docker-compose.yml"
        );
    }
}
