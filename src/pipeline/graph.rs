//! Validation and ordering of the consumer group dependency graph.
//!
//! Groups form a DAG where an edge `u -> g` means "g trails u". The plan built
//! here is what the pipeline needs to wire barriers at start:
//!
//! - a topological order, so every group is wired after its upstream groups;
//! - the upstream indices of every group;
//! - the terminal groups (no downstream), which gate producers.

use super::error::ConfigurationError;
use std::collections::{HashMap, HashSet, VecDeque};

/// Wiring plan for a validated set of groups. Indices refer to registration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GraphPlan {
    /// Groups in dependency order, ties broken by registration order
    pub order: Vec<usize>,
    /// Upstream group indices per group
    pub upstream: Vec<Vec<usize>>,
    /// Groups without downstream groups, in registration order
    pub terminal: Vec<usize>,
}

impl GraphPlan {
    /// Indices of every group that trails `group`, directly or transitively.
    pub(crate) fn downstream_of(&self, group: usize) -> HashSet<usize> {
        let mut reached = HashSet::new();
        let mut queue = VecDeque::from([group]);
        while let Some(current) = queue.pop_front() {
            for (candidate, upstream) in self.upstream.iter().enumerate() {
                if upstream.contains(&current) && reached.insert(candidate) {
                    queue.push_back(candidate);
                }
            }
        }
        reached
    }
}

/// Validates `groups` (name and upstream names, in registration order) and builds
/// the wiring plan.
///
/// # Errors
///
/// Checks run in this order and the first failure is returned:
/// [`ConfigurationError::DuplicateGroup`], [`ConfigurationError::UnknownDependency`],
/// [`ConfigurationError::CyclicDependency`].
pub(crate) fn plan(groups: &[(&str, &[String])]) -> Result<GraphPlan, ConfigurationError> {
    let mut index_by_name: HashMap<&str, usize> = HashMap::with_capacity(groups.len());
    for (index, (name, _)) in groups.iter().enumerate() {
        if index_by_name.insert(*name, index).is_some() {
            return Err(ConfigurationError::DuplicateGroup {
                name: (*name).to_string(),
            });
        }
    }

    let mut upstream = Vec::with_capacity(groups.len());
    for (name, dependencies) in groups {
        let mut resolved = Vec::with_capacity(dependencies.len());
        for dependency in dependencies.iter() {
            let Some(&index) = index_by_name.get(dependency.as_str()) else {
                return Err(ConfigurationError::UnknownDependency {
                    group: (*name).to_string(),
                    dependency: dependency.clone(),
                });
            };
            if !resolved.contains(&index) {
                resolved.push(index);
            }
        }
        upstream.push(resolved);
    }

    let order = topological_order(&upstream).map_err(|stuck| ConfigurationError::CyclicDependency {
        cycle: find_cycle(&upstream, &stuck)
            .into_iter()
            .map(|index| groups[index].0.to_string())
            .collect(),
    })?;

    let mut has_downstream = vec![false; groups.len()];
    for dependencies in &upstream {
        for &index in dependencies {
            has_downstream[index] = true;
        }
    }
    let terminal = (0..groups.len()).filter(|&i| !has_downstream[i]).collect();

    Ok(GraphPlan {
        order,
        upstream,
        terminal,
    })
}

/// Kahn's algorithm. On a cycle, returns the groups that could not be ordered.
fn topological_order(upstream: &[Vec<usize>]) -> Result<Vec<usize>, Vec<usize>> {
    let count = upstream.len();
    let mut pending: Vec<usize> = upstream.iter().map(Vec::len).collect();
    let mut downstream = vec![Vec::new(); count];
    for (group, dependencies) in upstream.iter().enumerate() {
        for &dependency in dependencies {
            downstream[dependency].push(group);
        }
    }

    let mut ready: VecDeque<usize> = (0..count).filter(|&i| pending[i] == 0).collect();
    let mut order = Vec::with_capacity(count);
    while let Some(group) = ready.pop_front() {
        order.push(group);
        for &next in &downstream[group] {
            pending[next] -= 1;
            if pending[next] == 0 {
                ready.push_back(next);
            }
        }
    }

    if order.len() == count {
        Ok(order)
    } else {
        Err((0..count).filter(|&i| pending[i] > 0).collect())
    }
}

/// Follows upstream edges among `stuck` groups until a group repeats.
///
/// Every stuck group has at least one stuck upstream, so the walk always closes.
/// The returned path starts and ends with the same group.
fn find_cycle(upstream: &[Vec<usize>], stuck: &[usize]) -> Vec<usize> {
    let Some(&start) = stuck.first() else {
        return Vec::new();
    };
    let mut path = vec![start];
    let mut current = start;
    loop {
        let Some(&next) = upstream[current].iter().find(|i| stuck.contains(i)) else {
            return path;
        };
        if let Some(position) = path.iter().position(|&i| i == next) {
            let mut cycle = path.split_off(position);
            cycle.push(next);
            return cycle;
        }
        path.push(next);
        current = next;
    }
}
