//! Dependency graph builder
//!
//! Turns a batch of [`Classification`]s into an immutable [`MigrationPlan`]:
//! a total order in which every in-batch dependency precedes its dependent.
//!
//! Edges `A -> B` mean "A must be migrated before B" and come from two places:
//! - declared: `B`'s assessment lists `A` as a dependency
//! - inverted: `A`'s assessment lists `B` as a dependent (load balancer to
//!   the public IPs on its frontends)
//!
//! The order is a Kahn topological sort whose ready set is keyed by
//! `(priority tier, input position)`, so a given input always yields the same
//! plan.

use crate::assessment::{Classification, MigrationAssessment};
use crate::error::PlanError;
use azmig_resource::{MigrationType, ResourceIdentifier, ResourceRecord};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::fmt::{self, Display, Formatter};

/// Origin of a planned edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// From the dependent's own dependency set
    Declared,
    /// From the dependency's list of dependents
    Inverted,
}

/// Must-happen-before constraint between two plan entries
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlannedEdge {
    /// Migrated first
    pub from: ResourceIdentifier,
    /// Migrated after `from`
    pub to: ResourceIdentifier,
    /// Where the edge came from
    pub kind: EdgeKind,
}

impl Display for PlannedEdge {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} ({:?})", self.from, self.to, self.kind)
    }
}

/// One resource in plan order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEntry {
    /// Resource
    pub id: ResourceIdentifier,
    /// State read during classification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<ResourceRecord>,
    /// Classifier verdict
    pub assessment: MigrationAssessment,
    /// In-plan entries that must finish first, in plan order
    pub depends_on: Vec<ResourceIdentifier>,
    /// Dependencies outside the batch; must be confirmed clean at execution
    pub external_dependencies: Vec<ResourceIdentifier>,
    /// Position in the input batch
    pub input_index: usize,
}

impl PlanEntry {
    /// Shorthand for `assessment.needs_migration`
    #[inline]
    #[must_use]
    pub fn needs_migration(&self) -> bool {
        self.assessment.needs_migration
    }

    /// Shorthand for `assessment.migration_type`
    #[inline]
    #[must_use]
    pub fn migration_type(&self) -> MigrationType {
        self.assessment.migration_type
    }
}

/// Ordered, immutable migration plan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MigrationPlan {
    entries: Vec<PlanEntry>,
    edges: Vec<PlannedEdge>,
}

impl MigrationPlan {
    /// Build a plan from classified resources
    ///
    /// # Errors
    /// - [`PlanError::DuplicateResource`] if an identifier appears twice
    /// - [`PlanError::CyclicDependency`] naming the resources on a cycle
    pub fn build(classifications: Vec<Classification>) -> Result<Self, PlanError> {
        let mut graph: DiGraph<usize, EdgeKind> = DiGraph::with_capacity(classifications.len(), 0);
        let mut index: HashMap<&ResourceIdentifier, NodeIndex> = HashMap::new();

        for (i, c) in classifications.iter().enumerate() {
            let node = graph.add_node(i);
            if index.insert(&c.id, node).is_some() {
                return Err(PlanError::DuplicateResource(c.id.clone()));
            }
        }

        let mut external: Vec<Vec<ResourceIdentifier>> = vec![Vec::new(); classifications.len()];

        for (i, c) in classifications.iter().enumerate() {
            let node = NodeIndex::new(i);
            for dep in &c.assessment.dependencies {
                match index.get(dep) {
                    Some(&from) => {
                        if graph.find_edge(from, node).is_none() {
                            graph.add_edge(from, node, EdgeKind::Declared);
                        }
                    }
                    None => external[i].push(dep.clone()),
                }
            }
        }

        for (i, c) in classifications.iter().enumerate() {
            let node = NodeIndex::new(i);
            for dependent in &c.assessment.dependents {
                let Some(&to) = index.get(dependent) else {
                    continue;
                };
                if classifications[to.index()].assessment.dependency_check_skipped {
                    tracing::warn!(
                        from = %c.id,
                        to = %dependent,
                        "Inverted dependency edge suppressed by operator override"
                    );
                    continue;
                }
                if graph.find_edge(node, to).is_none() {
                    graph.add_edge(node, to, EdgeKind::Inverted);
                }
            }
        }

        let order = topological_order(&graph, &classifications)?;

        let mut position = vec![0usize; classifications.len()];
        for (pos, node) in order.iter().enumerate() {
            position[node.index()] = pos;
        }

        let mut edges: Vec<(usize, usize, PlannedEdge)> = graph
            .edge_references()
            .map(|e| {
                let (from, to) = (e.source().index(), e.target().index());
                (
                    position[from],
                    position[to],
                    PlannedEdge {
                        from: classifications[from].id.clone(),
                        to: classifications[to].id.clone(),
                        kind: *e.weight(),
                    },
                )
            })
            .collect();
        edges.sort_by_key(|(from, to, _)| (*from, *to));

        let ids: Vec<ResourceIdentifier> = classifications.iter().map(|c| c.id.clone()).collect();
        let mut slots: Vec<Option<Classification>> = classifications.into_iter().map(Some).collect();
        let mut entries = Vec::with_capacity(order.len());
        for node in order {
            let i = node.index();
            let Some(c) = slots[i].take() else {
                continue;
            };
            let mut preds: Vec<usize> = graph
                .neighbors_directed(node, Direction::Incoming)
                .map(NodeIndex::index)
                .collect();
            preds.sort_by_key(|p| position[*p]);
            entries.push(PlanEntry {
                id: c.id,
                record: c.record,
                assessment: c.assessment,
                depends_on: preds.into_iter().map(|p| ids[p].clone()).collect(),
                external_dependencies: std::mem::take(&mut external[i]),
                input_index: i,
            });
        }

        let edges: Vec<PlannedEdge> = edges.into_iter().map(|(_, _, e)| e).collect();

        tracing::info!(
            entries = entries.len(),
            edges = edges.len(),
            "Migration plan built"
        );
        Ok(Self { entries, edges })
    }

    /// Entries in execution order
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    /// Dependency edges, ordered by the position of their endpoints
    #[inline]
    #[must_use]
    pub fn edges(&self) -> &[PlannedEdge] {
        &self.edges
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if plan is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position of a resource in the plan
    #[must_use]
    pub fn position(&self, id: &ResourceIdentifier) -> Option<usize> {
        self.entries.iter().position(|e| &e.id == id)
    }

    /// Entry for a resource
    #[must_use]
    pub fn entry(&self, id: &ResourceIdentifier) -> Option<&PlanEntry> {
        self.entries.iter().find(|e| &e.id == id)
    }

    /// Entries that need migrating
    pub fn migrating(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries.iter().filter(|e| e.needs_migration())
    }
}

fn topological_order(
    graph: &DiGraph<usize, EdgeKind>,
    classifications: &[Classification],
) -> Result<Vec<NodeIndex>, PlanError> {
    let key = |node: NodeIndex| {
        let i = graph[node];
        Reverse((classifications[i].assessment.priority_tier, i))
    };

    let mut in_degree: Vec<usize> = graph
        .node_indices()
        .map(|n| graph.neighbors_directed(n, Direction::Incoming).count())
        .collect();

    let mut ready: BinaryHeap<(Reverse<(u8, usize)>, NodeIndex)> = graph
        .node_indices()
        .filter(|n| in_degree[n.index()] == 0)
        .map(|n| (key(n), n))
        .collect();

    let mut order = Vec::with_capacity(graph.node_count());
    while let Some((_, node)) = ready.pop() {
        order.push(node);
        for next in graph.neighbors_directed(node, Direction::Outgoing) {
            let degree = &mut in_degree[next.index()];
            *degree -= 1;
            if *degree == 0 {
                ready.push((key(next), next));
            }
        }
    }

    if order.len() == graph.node_count() {
        return Ok(order);
    }

    let mut participants: Vec<ResourceIdentifier> = tarjan_scc(graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.find_edge(scc[0], scc[0]).is_some())
        .flatten()
        .map(|n| classifications[graph[n]].id.clone())
        .collect();
    participants.sort();

    tracing::error!(participants = participants.len(), "Cyclic dependency detected");
    Err(PlanError::CyclicDependency { participants })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn id(resource_type: &str, name: &str) -> ResourceIdentifier {
        let provider = if resource_type == "virtualMachines" || resource_type == "availabilitySets" {
            "Microsoft.Compute"
        } else {
            "Microsoft.Network"
        };
        ResourceIdentifier::new("s", "rg", provider, resource_type, name).unwrap()
    }

    fn classified(id: ResourceIdentifier, assessment: MigrationAssessment) -> Classification {
        Classification::new(id, None, assessment)
    }

    fn vm(name: &str) -> Classification {
        classified(
            id("virtualMachines", name),
            MigrationAssessment::new(MigrationType::DiskConversion, true, "unmanaged"),
        )
    }

    fn lb(name: &str, pips: &[&str]) -> Classification {
        let assessment = pips.iter().fold(
            MigrationAssessment::new(MigrationType::LoadBalancerUpgrade, true, "Basic"),
            |a, p| a.with_dependent(id("publicIPAddresses", p)),
        );
        classified(id("loadBalancers", name), assessment)
    }

    fn pip(name: &str, lbs: &[&str]) -> Classification {
        let assessment = lbs.iter().fold(
            MigrationAssessment::new(MigrationType::PublicIpUpgrade, true, "Basic"),
            |a, l| a.with_dependency(id("loadBalancers", l)),
        );
        classified(id("publicIPAddresses", name), assessment)
    }

    fn names(plan: &MigrationPlan) -> Vec<&str> {
        plan.entries().iter().map(|e| e.id.resource_name()).collect()
    }

    #[test]
    fn tiers_order_the_example_batch() {
        let plan = MigrationPlan::build(vec![pip("pip1", &["lb1"]), lb("lb1", &["pip1"]), vm("vm1")]).unwrap();
        assert_eq!(names(&plan), vec!["vm1", "lb1", "pip1"]);

        let pip_entry = plan.entry(&id("publicIPAddresses", "pip1")).unwrap();
        assert_eq!(pip_entry.depends_on, vec![id("loadBalancers", "lb1")]);
        assert_eq!(pip_entry.input_index, 0);

        // Declared and inverted sources collapse into one edge
        assert_eq!(plan.edges().len(), 1);
        assert_eq!(plan.edges()[0].kind, EdgeKind::Declared);
    }

    #[test]
    fn inverted_edge_alone_orders_entries() {
        let plan = MigrationPlan::build(vec![pip("pip1", &[]), lb("lb1", &["pip1"])]).unwrap();
        assert_eq!(names(&plan), vec!["lb1", "pip1"]);
        assert_eq!(
            plan.edges(),
            &[PlannedEdge {
                from: id("loadBalancers", "lb1"),
                to: id("publicIPAddresses", "pip1"),
                kind: EdgeKind::Inverted,
            }]
        );
    }

    #[test]
    fn override_suppresses_inverted_edge() {
        let mut skipped = pip("pip1", &[]);
        skipped.assessment = skipped.assessment.with_dependency_check_skipped();
        let plan = MigrationPlan::build(vec![skipped, lb("lb1", &["pip1"])]).unwrap();
        assert!(plan.edges().is_empty());
        // Tier order still puts the load balancer first
        assert_eq!(names(&plan), vec!["lb1", "pip1"]);
        assert!(plan.entries()[1].depends_on.is_empty());
    }

    #[test]
    fn input_order_breaks_ties() {
        let plan = MigrationPlan::build(vec![vm("b"), vm("a"), vm("c")]).unwrap();
        assert_eq!(names(&plan), vec!["b", "a", "c"]);
    }

    #[test]
    fn skipped_entries_stay_in_plan() {
        let clean = classified(
            id("loadBalancers", "std"),
            MigrationAssessment::new(MigrationType::LoadBalancerUpgrade, false, "Standard"),
        );
        let unsupported = classified(
            ResourceIdentifier::new("s", "rg", "Microsoft.Storage", "storageAccounts", "acct").unwrap(),
            MigrationAssessment::unsupported(),
        );
        let plan = MigrationPlan::build(vec![unsupported, clean, vm("vm1")]).unwrap();
        assert_eq!(names(&plan), vec!["vm1", "std", "acct"]);
        assert_eq!(plan.migrating().count(), 1);
    }

    #[test]
    fn out_of_batch_dependencies_are_external() {
        let plan = MigrationPlan::build(vec![pip("pip1", &["lb-elsewhere"])]).unwrap();
        let entry = &plan.entries()[0];
        assert!(entry.depends_on.is_empty());
        assert_eq!(entry.external_dependencies, vec![id("loadBalancers", "lb-elsewhere")]);
        assert!(plan.edges().is_empty());
    }

    #[test]
    fn duplicates_are_rejected() {
        let err = MigrationPlan::build(vec![vm("vm1"), vm("vm1")]).unwrap_err();
        assert_eq!(err, PlanError::DuplicateResource(id("virtualMachines", "vm1")));
    }

    #[test]
    fn cycles_name_participants() {
        let a = classified(
            id("loadBalancers", "a"),
            MigrationAssessment::new(MigrationType::LoadBalancerUpgrade, true, "Basic")
                .with_dependency(id("loadBalancers", "b")),
        );
        let b = classified(
            id("loadBalancers", "b"),
            MigrationAssessment::new(MigrationType::LoadBalancerUpgrade, true, "Basic")
                .with_dependency(id("loadBalancers", "a")),
        );
        let err = MigrationPlan::build(vec![a, b, vm("bystander")]).unwrap_err();
        assert_eq!(
            err,
            PlanError::CyclicDependency {
                participants: vec![id("loadBalancers", "a"), id("loadBalancers", "b")],
            }
        );
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let a = classified(
            id("loadBalancers", "a"),
            MigrationAssessment::new(MigrationType::LoadBalancerUpgrade, true, "Basic")
                .with_dependency(id("loadBalancers", "a")),
        );
        assert!(matches!(
            MigrationPlan::build(vec![a]),
            Err(PlanError::CyclicDependency { .. })
        ));
    }

    #[test]
    fn empty_batch() {
        let plan = MigrationPlan::build(vec![]).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.len(), 0);
    }
}
