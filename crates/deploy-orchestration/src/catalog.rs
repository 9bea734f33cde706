//! The descriptor table and the platform's built-in service definitions.

use crate::config::{ProbeSpec, ServiceDescriptor, StartCommand, StatusRange};
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Search/store cluster, log pipeline and visualisation
pub const ELK_SERVICES: [&str; 3] = ["elasticsearch", "logstash", "kibana"];

/// Honeypot emulators
pub const HONEYPOT_SERVICES: [&str; 3] = ["cowrie", "dionaea", "flask"];

/// Management dashboard
pub const WEBAPP_SERVICES: [&str; 1] = ["webapp"];

/// Immutable name → descriptor mapping that remembers declaration order
#[derive(Debug, Clone)]
pub struct DescriptorTable {
    services: Vec<Arc<ServiceDescriptor>>,
    index: HashMap<String, usize>,
}

impl DescriptorTable {
    /// Build a table; declaration order is the order of `services`.
    ///
    /// Only name uniqueness is checked here. Unknown dependencies and cycles
    /// are reported by [`crate::resolve`], for the part of the graph a run
    /// actually needs.
    pub fn new(services: Vec<ServiceDescriptor>) -> Result<Self> {
        let mut index = HashMap::with_capacity(services.len());
        for (position, service) in services.iter().enumerate() {
            if index.insert(service.name.clone(), position).is_some() {
                return Err(Error::DuplicateService(service.name.clone()));
            }
        }

        Ok(Self {
            services: services.into_iter().map(Arc::new).collect(),
            index,
        })
    }

    /// Look up a service by name
    pub fn get(&self, name: &str) -> Option<&Arc<ServiceDescriptor>> {
        self.index.get(name).map(|&i| &self.services[i])
    }

    /// Declaration index of a service
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Whether the table defines `name`
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Descriptor at a declaration index
    pub fn at(&self, position: usize) -> Option<&Arc<ServiceDescriptor>> {
        self.services.get(position)
    }

    /// Descriptors in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ServiceDescriptor>> {
        self.services.iter()
    }

    /// Service names in declaration order
    pub fn names(&self) -> Vec<String> {
        self.services.iter().map(|s| s.name.clone()).collect()
    }

    /// Number of services
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

/// The platform's services in declaration order.
///
/// Ports and timeouts follow the compose file the platform ships with. Kibana
/// gets the longest budget: its first boot runs saved-object migrations that
/// can take several minutes on small hosts.
pub fn platform_services() -> Vec<ServiceDescriptor> {
    vec![
        // Answers 408 until the cluster is at least yellow.
        ServiceDescriptor::new(
            "elasticsearch",
            StartCommand::new("elasticsearch", "elasticsearch"),
            ProbeSpec::http(
                "http://localhost:9200/_cluster/health?wait_for_status=yellow&timeout=1s",
            ),
            secs(300),
            secs(10),
        ),
        ServiceDescriptor::new(
            "logstash",
            StartCommand::new("logstash", "logstash"),
            ProbeSpec::http("http://localhost:9600/"),
            secs(180),
            secs(5),
        )
        .depends_on(["elasticsearch"]),
        ServiceDescriptor::new(
            "kibana",
            StartCommand::new("kibana", "kibana"),
            ProbeSpec::http("http://localhost:5601/api/status"),
            secs(600),
            secs(10),
        )
        .depends_on(["elasticsearch"]),
        ServiceDescriptor::new(
            "cowrie",
            StartCommand::new("cowrie", "cowrie-honeypot"),
            ProbeSpec::tcp("localhost", 2222),
            secs(60),
            secs(2),
        ),
        ServiceDescriptor::new(
            "dionaea",
            StartCommand::new("dionaea", "dionaea-honeypot"),
            ProbeSpec::process_field("dionaea-honeypot", "State.Status"),
            secs(60),
            secs(2),
        ),
        // Any answer at all means the web honeypot is serving.
        ServiceDescriptor::new(
            "flask",
            StartCommand::new("flask", "flask-honeypot"),
            ProbeSpec::HttpGet {
                url: "http://localhost:8181/".to_string(),
                expected_status: StatusRange::new(200, 499),
            },
            secs(60),
            secs(2),
        ),
        ServiceDescriptor::new(
            "webapp",
            StartCommand::new("webapp", "webapp"),
            ProbeSpec::http("http://localhost:5000/api/health"),
            secs(120),
            secs(3),
        ),
    ]
}
