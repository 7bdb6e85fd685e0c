use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use serde::Serialize;
use strum_macros::{Display, EnumString};

use crate::graph::{Graph, NodeId, Operation};
use crate::warning::Warning;

/// Which nodes to include relative to the anchor set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ReachMode {
    /// Anchors plus their one-hop neighbors, in either direction.
    Direct,
    /// Everything reachable downstream of the anchors, following edge
    /// direction; the anchors themselves are not part of the result.
    Impacts,
    /// Everything reachable upstream of the anchors, following reversed
    /// edges; the anchors themselves are not part of the result.
    ImpactedBy,
    /// Union of `Impacts` and `ImpactedBy`.
    Both,
}

/// Coarse flow role of a node within a view. Self-loops are ignored, so a
/// table that only updates from itself still classifies as terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Source,
    Target,
    Both,
    Isolated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewNode {
    pub id: NodeId,
    pub name: String,
    pub is_volatile: bool,
    pub is_view: bool,
    pub owners: Vec<String>,
    pub role: NodeRole,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewEdge {
    pub from: NodeId,
    pub to: NodeId,
    pub operations: Vec<Operation>,
    /// Operation indices grouped by owning script, e.g. `etl_a.sh:0|2, etl_b.sh:1`.
    pub label: String,
}

/// The filtered `{nodes, edges}` answer to one reachability query.
#[derive(Debug, Clone, Serialize)]
pub struct GraphView {
    pub nodes: Vec<ViewNode>,
    pub edges: Vec<ViewEdge>,
    pub warnings: Vec<Warning>,
}

/// Answers one reachability query against the graph snapshot. Read-only and
/// recomputed in full per call, O(V+E).
pub fn query(
    graph: &Graph,
    anchors: &[String],
    mode: ReachMode,
    script_filter: Option<&[String]>,
) -> GraphView {
    let mut warnings = Vec::new();

    // Candidate nodes: ownership must intersect the script filter.
    let candidates: HashSet<&NodeId> = graph
        .nodes
        .iter()
        .filter(|(_, node)| match script_filter {
            Some(filter) => node.owners.iter().any(|owner| filter.contains(owner)),
            None => true,
        })
        .map(|(id, _)| id)
        .collect();

    // Surviving edges: both endpoints candidate, operation sets restricted
    // to the filter, edges left with no operations dropped.
    let mut surviving: Vec<(&NodeId, &NodeId, BTreeSet<Operation>)> = Vec::new();
    for edge in graph.edges.values() {
        if !candidates.contains(&edge.from) || !candidates.contains(&edge.to) {
            continue;
        }
        let operations: BTreeSet<Operation> = match script_filter {
            Some(filter) => edge
                .operations
                .iter()
                .filter(|operation| filter.contains(&operation.script))
                .cloned()
                .collect(),
            None => edge.operations.clone(),
        };
        if operations.is_empty() {
            continue;
        }
        surviving.push((&edge.from, &edge.to, operations));
    }

    // Anchors resolve by exact qualified id or case-normalized display name.
    // A bare name may hit several nodes when volatile shadowing is in play.
    let mut anchor_ids: Vec<&NodeId> = Vec::new();
    for anchor in anchors {
        let normalized = anchor.trim().to_uppercase();
        let mut matched = false;
        for (id, node) in &graph.nodes {
            if !candidates.contains(id) {
                continue;
            }
            if id.qualified() == anchor.trim() || node.name == normalized {
                anchor_ids.push(id);
                matched = true;
            }
        }
        if !matched {
            warnings.push(Warning::UnknownAnchor {
                name: anchor.clone(),
            });
        }
    }

    let mut forward: HashMap<&NodeId, Vec<&NodeId>> = HashMap::new();
    let mut reverse: HashMap<&NodeId, Vec<&NodeId>> = HashMap::new();
    for (from, to, _) in &surviving {
        forward.entry(*from).or_default().push(*to);
        reverse.entry(*to).or_default().push(*from);
    }

    let selected: HashSet<&NodeId> = match mode {
        ReachMode::Direct => direct(&anchor_ids, &forward, &reverse),
        ReachMode::Impacts => traverse(&anchor_ids, &forward),
        ReachMode::ImpactedBy => traverse(&anchor_ids, &reverse),
        ReachMode::Both => {
            let mut union = traverse(&anchor_ids, &forward);
            union.extend(traverse(&anchor_ids, &reverse));
            union
        }
    };

    let kept: Vec<(&NodeId, &NodeId, &BTreeSet<Operation>)> = surviving
        .iter()
        .filter(|(from, to, _)| selected.contains(*from) && selected.contains(*to))
        .map(|(from, to, operations)| (*from, *to, operations))
        .collect();

    // Degrees for role classification; self-loops never count.
    let mut out_degree: HashMap<&NodeId, usize> = HashMap::new();
    let mut in_degree: HashMap<&NodeId, usize> = HashMap::new();
    for &(from, to, _) in &kept {
        if from != to {
            *out_degree.entry(from).or_default() += 1;
            *in_degree.entry(to).or_default() += 1;
        }
    }

    let nodes = graph
        .nodes
        .iter()
        .filter(|(id, _)| selected.contains(*id))
        .map(|(id, node)| ViewNode {
            id: id.clone(),
            name: node.name.clone(),
            is_volatile: node.is_volatile,
            is_view: node.is_view,
            owners: node.owners.iter().cloned().collect(),
            role: match (
                out_degree.get(id).copied().unwrap_or(0) > 0,
                in_degree.get(id).copied().unwrap_or(0) > 0,
            ) {
                (true, true) => NodeRole::Both,
                (true, false) => NodeRole::Source,
                (false, true) => NodeRole::Target,
                (false, false) => NodeRole::Isolated,
            },
        })
        .collect();

    let edges = kept
        .iter()
        .map(|&(from, to, operations)| ViewEdge {
            from: from.clone(),
            to: to.clone(),
            label: operation_label(operations),
            operations: operations.iter().cloned().collect(),
        })
        .collect();

    GraphView {
        nodes,
        edges,
        warnings,
    }
}

fn direct<'a>(
    anchors: &[&'a NodeId],
    forward: &HashMap<&'a NodeId, Vec<&'a NodeId>>,
    reverse: &HashMap<&'a NodeId, Vec<&'a NodeId>>,
) -> HashSet<&'a NodeId> {
    let mut selected: HashSet<&NodeId> = anchors.iter().copied().collect();
    for anchor in anchors {
        if let Some(next) = forward.get(anchor) {
            selected.extend(next.iter().copied());
        }
        if let Some(previous) = reverse.get(anchor) {
            selected.extend(previous.iter().copied());
        }
    }
    selected
}

/// Breadth-first reachability from the anchors, excluding the anchors
/// themselves. The visited set makes cycles and self-loops terminate.
fn traverse<'a>(
    anchors: &[&'a NodeId],
    adjacency: &HashMap<&'a NodeId, Vec<&'a NodeId>>,
) -> HashSet<&'a NodeId> {
    let mut visited: HashSet<&NodeId> = anchors.iter().copied().collect();
    let mut queue: VecDeque<&NodeId> = anchors.iter().copied().collect();
    let mut collected: HashSet<&NodeId> = HashSet::new();
    while let Some(id) = queue.pop_front() {
        if let Some(next) = adjacency.get(id) {
            for &neighbor in next {
                if visited.insert(neighbor) {
                    collected.insert(neighbor);
                    queue.push_back(neighbor);
                }
            }
        }
    }
    collected
}

fn operation_label(operations: &BTreeSet<Operation>) -> String {
    let mut by_script: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for operation in operations {
        by_script
            .entry(operation.script.as_str())
            .or_default()
            .push(operation.index);
    }
    by_script
        .iter()
        .map(|(script, indices)| {
            let indices = indices
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("|");
            format!("{}:{}", script, indices)
        })
        .collect::<Vec<_>>()
        .join(", ")
}
