//! Dependency resolution.
//!
//! Expands a target set to everything it transitively depends on and orders
//! the result so that every service comes after all of its dependencies.
//! Among services whose dependencies are already placed, the one declared
//! first in the table goes next, so the same table and targets always give
//! the same order.

use crate::catalog::DescriptorTable;
use crate::config::ServiceDescriptor;
use crate::{Error, Result};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;

/// Ordered list of services for one run. Recomputed every run, never stored.
#[derive(Debug, Clone, Default)]
pub struct RunPlan {
    services: Vec<Arc<ServiceDescriptor>>,
    targets: BTreeSet<String>,
}

impl RunPlan {
    /// Services in start order
    pub fn services(&self) -> &[Arc<ServiceDescriptor>] {
        &self.services
    }

    /// Service names in start order
    pub fn names(&self) -> Vec<&str> {
        self.services.iter().map(|s| s.name.as_str()).collect()
    }

    /// Whether `name` was asked for directly rather than pulled in as a
    /// dependency
    pub fn is_target(&self, name: &str) -> bool {
        self.targets.contains(name)
    }

    /// Number of services in the plan
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Whether the plan is empty
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

/// Resolve `targets` against `table` into a start order.
///
/// Fails with [`Error::UnknownService`] if a target or one of its transitive
/// dependencies is not in the table, and with [`Error::CycleDetected`] if the
/// graph reachable from the targets has a cycle.
pub fn resolve<S: AsRef<str>>(table: &DescriptorTable, targets: &[S]) -> Result<RunPlan> {
    let mut closure = BTreeSet::new();
    let mut stack = Vec::new();

    for target in targets {
        let target = target.as_ref();
        let position = table
            .position(target)
            .ok_or_else(|| Error::UnknownService(target.to_string()))?;
        stack.push(position);
    }

    // Dependencies per node, as declaration indices
    let mut deps: HashMap<usize, BTreeSet<usize>> = HashMap::new();
    while let Some(position) = stack.pop() {
        if !closure.insert(position) {
            continue;
        }
        let service = table.at(position).ok_or_else(|| {
            Error::Config(format!("Descriptor index {} out of range", position))
        })?;

        let mut node_deps = BTreeSet::new();
        for dep in &service.dependencies {
            let dep_position = table.position(dep).ok_or_else(|| {
                Error::UnknownService(format!("{} (required by {})", dep, service.name))
            })?;
            node_deps.insert(dep_position);
            stack.push(dep_position);
        }
        deps.insert(position, node_deps);
    }

    let mut remaining: HashMap<usize, usize> = deps
        .iter()
        .map(|(&node, node_deps)| (node, node_deps.len()))
        .collect();
    let mut dependents: HashMap<usize, Vec<usize>> = HashMap::new();
    for (&node, node_deps) in &deps {
        for &dep in node_deps {
            dependents.entry(dep).or_default().push(node);
        }
    }

    let mut ready: BTreeSet<usize> = remaining
        .iter()
        .filter(|&(_, &count)| count == 0)
        .map(|(&node, _)| node)
        .collect();
    let mut order = Vec::with_capacity(closure.len());

    while let Some(node) = ready.pop_first() {
        order.push(node);
        for &dependent in dependents.get(&node).map(Vec::as_slice).unwrap_or(&[]) {
            if let Some(count) = remaining.get_mut(&dependent) {
                *count -= 1;
                if *count == 0 {
                    ready.insert(dependent);
                }
            }
        }
    }

    if order.len() != closure.len() {
        let placed: BTreeSet<usize> = order.iter().copied().collect();
        let stuck: BTreeSet<usize> = closure.difference(&placed).copied().collect();
        return Err(Error::CycleDetected(describe_cycle(table, &deps, &stuck)));
    }

    let services: Vec<Arc<ServiceDescriptor>> = order
        .into_iter()
        .filter_map(|position| table.at(position).cloned())
        .collect();
    debug!(
        "Resolved start order: {:?}",
        services.iter().map(|s| s.name.as_str()).collect::<Vec<_>>()
    );

    Ok(RunPlan {
        services,
        targets: targets.iter().map(|t| t.as_ref().to_string()).collect(),
    })
}

/// Walk dependency edges among the unplaceable nodes until one repeats and
/// return that loop as service names, closed (first name repeated last).
fn describe_cycle(
    table: &DescriptorTable,
    deps: &HashMap<usize, BTreeSet<usize>>,
    stuck: &BTreeSet<usize>,
) -> Vec<String> {
    let name = |position: usize| {
        table
            .at(position)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| format!("#{}", position))
    };

    let Some(&start) = stuck.first() else {
        return Vec::new();
    };
    let mut path = vec![start];
    let mut current = start;
    loop {
        let next = deps
            .get(&current)
            .and_then(|node_deps| node_deps.iter().find(|d| stuck.contains(d)))
            .copied();
        let Some(next) = next else {
            break;
        };
        if let Some(at) = path.iter().position(|&p| p == next) {
            let mut cycle: Vec<String> = path[at..].iter().map(|&p| name(p)).collect();
            cycle.push(name(next));
            return cycle;
        }
        path.push(next);
        current = next;
    }
    path.into_iter().map(name).collect()
}
