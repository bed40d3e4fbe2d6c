// src/numa.rs
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! NUMA topology discovery.
//!
//! Feeds the execution planner (`planner.rs`) the raw facts it partitions
//! workers over: how many NUMA nodes exist and which logical CPUs belong to
//! each. Detection goes through `hwlocality` when the `numa` feature is
//! enabled; without it (or on a single-node machine) everything collapses
//! into one partition holding every CPU, matching the original engine's
//! "NUMA discovery is optional; without it report `isNuma=false`" contract.

use crate::error::{Error, Result};

/// One NUMA node and the logical CPUs that belong to it.
#[derive(Debug, Clone)]
pub struct NumaNode {
    pub node_id: usize,
    pub cpus: Vec<usize>,
}

/// System-wide NUMA topology, as seen at process start.
#[derive(Debug, Clone)]
pub struct NumaTopology {
    pub num_nodes: usize,
    pub physical_cores: usize,
    pub logical_cpus: usize,
    pub nodes: Vec<NumaNode>,
    pub is_uma: bool,
}

impl NumaTopology {
    /// Detects the host topology. Falls back to a single UMA node spanning
    /// every logical CPU when NUMA support is compiled out or the host
    /// exposes no NUMA nodes.
    #[cfg(feature = "numa")]
    pub fn detect() -> Result<Self> {
        use hwlocality::object::types::ObjectType;
        use hwlocality::Topology;

        tracing::debug!("detecting NUMA topology via hwlocality");

        let topology = Topology::new()
            .map_err(|e| Error::AllocationFailed(format!("hwloc topology init failed: {e}")))?;

        let numa_nodes: Vec<_> = topology.objects_with_type(ObjectType::NUMANode).collect();
        let num_nodes = numa_nodes.len().max(1);
        let is_uma = num_nodes == 1;

        tracing::info!(num_nodes, "NUMA nodes detected");

        let nodes: Vec<NumaNode> = if numa_nodes.is_empty() {
            vec![NumaNode {
                node_id: 0,
                cpus: (0..num_cpus::get()).collect(),
            }]
        } else {
            numa_nodes
                .iter()
                .filter_map(|node| {
                    let node_id = node.os_index()?;
                    let cpuset = node.cpuset()?;
                    let cpus: Vec<usize> = (0..topology.objects_with_type(ObjectType::PU).count())
                        .filter(|&cpu_id| cpuset.is_set(cpu_id))
                        .collect();
                    Some(NumaNode { node_id, cpus })
                })
                .collect()
        };

        Ok(Self {
            num_nodes,
            physical_cores: num_cpus::get_physical(),
            logical_cpus: num_cpus::get(),
            nodes,
            is_uma,
        })
    }

    #[cfg(not(feature = "numa"))]
    pub fn detect() -> Result<Self> {
        tracing::debug!("numa feature disabled, reporting a single UMA node");
        Ok(Self::single_node())
    }

    /// A one-node topology spanning every logical CPU, used when NUMA
    /// support is unavailable and by tests.
    pub fn single_node() -> Self {
        NumaTopology {
            num_nodes: 1,
            physical_cores: num_cpus::get_physical(),
            logical_cpus: num_cpus::get(),
            nodes: vec![NumaNode {
                node_id: 0,
                cpus: (0..num_cpus::get()).collect(),
            }],
            is_uma: true,
        }
    }

    pub fn should_enable_numa_pinning(&self) -> bool {
        self.num_nodes > 1
    }

    pub fn cpus_for_node(&self, node_id: usize) -> Option<&[usize]> {
        self.nodes
            .iter()
            .find(|n| n.node_id == node_id)
            .map(|n| n.cpus.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_reports_at_least_one_node() {
        if let Ok(topology) = NumaTopology::detect() {
            assert!(topology.num_nodes >= 1);
            assert!(topology.logical_cpus >= topology.physical_cores.max(1));
        }
    }

    #[test]
    fn single_node_covers_all_cpus() {
        let topology = NumaTopology::single_node();
        assert_eq!(topology.num_nodes, 1);
        assert!(topology.is_uma);
        assert_eq!(topology.nodes[0].cpus.len(), topology.logical_cpus);
    }
}
