//! Preflight checks run before a deployment.
//!
//! Tool checks are hard failures. System requirements only warn, and the
//! operator decides whether to continue.

use command_executor::{Command, Executor};
use deploy_orchestration::ComposeEngine;
use std::fmt;
use std::io::{BufRead, Write};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Minimum total memory
pub const MIN_MEMORY_MB: u64 = 4000;
/// Minimum free disk in the project directory
pub const MIN_DISK_GB: u64 = 20;
/// Minimum `vm.max_map_count` for Elasticsearch
pub const MIN_MAX_MAP_COUNT: u64 = 262_144;

/// One host requirement and what was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    /// What is measured
    pub name: &'static str,
    /// Minimum value
    pub required: u64,
    /// Measured value, `None` if it could not be read
    pub found: Option<u64>,
    /// Unit for display
    pub unit: &'static str,
    /// How to fix it, if there is a known fix
    pub remedy: Option<&'static str>,
}

impl Requirement {
    /// Met, or unreadable (which only warns)
    pub fn is_met(&self) -> bool {
        self.found.is_none_or(|found| found >= self.required)
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.found {
            Some(found) => write!(
                f,
                "{}: {}{} (required: {}{})",
                self.name, found, self.unit, self.required, self.unit
            ),
            None => write!(f, "{}: unknown (required: {}{})", self.name, self.required, self.unit),
        }
    }
}

/// Host requirements
pub fn system_requirements(project_dir: &Path) -> Vec<Requirement> {
    vec![
        Requirement {
            name: "Memory",
            required: MIN_MEMORY_MB,
            found: std::fs::read_to_string("/proc/meminfo")
                .ok()
                .and_then(|content| parse_meminfo_total_mb(&content)),
            unit: "MB",
            remedy: None,
        },
        Requirement {
            name: "Free disk",
            required: MIN_DISK_GB,
            found: free_disk_gb(project_dir),
            unit: "GB",
            remedy: None,
        },
        Requirement {
            name: "vm.max_map_count",
            required: MIN_MAX_MAP_COUNT,
            found: std::fs::read_to_string("/proc/sys/vm/max_map_count")
                .ok()
                .and_then(|content| content.trim().parse().ok()),
            unit: "",
            remedy: Some("sudo sysctl -w vm.max_map_count=262144"),
        },
    ]
}

/// `MemTotal` from `/proc/meminfo`, in MB
pub fn parse_meminfo_total_mb(meminfo: &str) -> Option<u64> {
    let line = meminfo.lines().find(|line| line.starts_with("MemTotal:"))?;
    let kb: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kb / 1024)
}

/// Space available to unprivileged users at `path`, in GB
pub fn free_disk_gb(path: &Path) -> Option<u64> {
    let stats = nix::sys::statvfs::statvfs(path).ok()?;
    let bytes = u64::from(stats.blocks_available()).saturating_mul(u64::from(stats.fragment_size()));
    Some(bytes / (1024 * 1024 * 1024))
}

/// Log each requirement and return the unmet ones
pub fn report_requirements(requirements: &[Requirement]) -> Vec<&Requirement> {
    let mut unmet = Vec::new();
    for requirement in requirements {
        match requirement.found {
            None => warn!("Could not check {}", requirement),
            Some(_) if requirement.is_met() => info!("✓ {}", requirement),
            Some(_) => {
                warn!("✗ {}", requirement);
                if let Some(remedy) = requirement.remedy {
                    warn!("  To fix: {}", remedy);
                }
                unmet.push(requirement);
            }
        }
    }
    unmet
}

/// The docker CLI and a compose command must both answer
pub async fn check_tools(engine: &ComposeEngine) -> anyhow::Result<()> {
    let executor = Executor::new("preflight").with_timeout(Duration::from_secs(30));
    let docker = executor
        .execute(&Command::builder("docker").arg("--version").build())
        .await
        .map_err(|e| anyhow::anyhow!("Docker is not installed or not on PATH: {}", e))?;
    if !docker.success() {
        anyhow::bail!("Docker is not usable: {}", docker.failure_message());
    }
    info!("✓ {}", docker.output.trim());

    let compose = engine.compose_version().await.map_err(|e| {
        anyhow::anyhow!(
            "Docker Compose is not available (tried '{}'): {}",
            engine.compose_command(),
            e
        )
    })?;
    info!("✓ {}", compose.trim());
    Ok(())
}

/// Ask "Continue anyway? (y/n)". End of input counts as no.
pub fn confirm(input: &mut impl BufRead, output: &mut impl Write) -> std::io::Result<bool> {
    write!(output, "Continue anyway? (y/n): ")?;
    output.flush()?;

    let mut answer = String::new();
    if input.read_line(&mut answer)? == 0 {
        writeln!(output)?;
        return Ok(false);
    }
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

/// Bind-mount directories the compose file expects under the project directory
pub const DATA_DIRECTORIES: &[&str] = &["logs", "data/elasticsearch", "data/cowrie", "data/dionaea"];

/// Create the bind-mount directories. Existing directories are left alone.
pub fn prepare_directories(project_dir: &Path) -> std::io::Result<()> {
    for dir in DATA_DIRECTORIES {
        let path = project_dir.join(dir);
        std::fs::create_dir_all(&path)?;
        debug!("Ensured directory {}", path.display());
    }
    Ok(())
}
