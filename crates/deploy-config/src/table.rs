//! Turning a [`Config`] into the descriptor table a run uses

use crate::{
    Config, ConfigError, FieldOverride, HttpOverride, ProbeOverride, Result, TcpOverride,
    parser::substitute_env_vars,
};
use deploy_orchestration::{DescriptorTable, ProbeSpec, StatusRange, platform_services};
use std::time::Duration;
use tracing::debug;

/// Build the platform descriptor table with the configuration's overrides
/// applied. The result is immutable for the rest of the process.
pub fn build_table(config: &Config) -> Result<DescriptorTable> {
    let mut services = platform_services();

    for (name, tuning) in &config.services {
        let service = services
            .iter_mut()
            .find(|s| &s.name == name)
            .ok_or_else(|| ConfigError::ServiceNotFound(name.clone()))?;

        if let Some(secs) = tuning.max_wait {
            service.max_wait = Duration::from_secs(secs);
        }
        if let Some(secs) = tuning.poll_interval {
            service.poll_interval = Duration::from_secs(secs);
        }
        if let Some(probe) = &tuning.probe {
            service.readiness_probe = probe_spec(probe)?;
        }
        debug!(
            "Override for {}: probe {}, max_wait {:?}, poll every {:?}",
            name, service.readiness_probe, service.max_wait, service.poll_interval
        );
    }

    Ok(DescriptorTable::new(services)?)
}

fn probe_spec(probe: &ProbeOverride) -> Result<ProbeSpec> {
    Ok(match probe {
        ProbeOverride::Http(HttpOverride { http, status }) => ProbeSpec::HttpGet {
            url: substitute_env_vars(http)?,
            expected_status: match status {
                Some([low, high]) => StatusRange::new(*low, *high),
                None => StatusRange::success(),
            },
        },
        ProbeOverride::Tcp(TcpOverride { tcp }) => {
            let (host, port) = parse_tcp_address(&substitute_env_vars(tcp)?)
                .map_err(ConfigError::ValidationError)?;
            ProbeSpec::tcp(host, port)
        }
        ProbeOverride::Field(FieldOverride { container, field }) => {
            ProbeSpec::process_field(substitute_env_vars(container)?, substitute_env_vars(field)?)
        }
    })
}

/// Split `host:port`
pub(crate) fn parse_tcp_address(address: &str) -> std::result::Result<(String, u16), String> {
    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| format!("TCP probe '{}' must be host:port", address))?;
    if host.is_empty() {
        return Err(format!("TCP probe '{}' has no host", address));
    }
    let port = port
        .parse::<u16>()
        .map_err(|_| format!("TCP probe '{}' has an invalid port", address))?;
    Ok((host.to_string(), port))
}
