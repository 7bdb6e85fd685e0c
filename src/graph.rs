use std::collections::BTreeSet;
use std::fmt::{self, Display};

use indexmap::IndexMap;
use serde::{Serialize, Serializer};

use crate::script::{ScriptLineage, TableEntry};
use crate::warning::Warning;

/// Identity of a graph node. Volatile tables are scoped to their declaring
/// script and never unified across scripts; non-volatile tables share one
/// global identity per display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub script: Option<String>,
    pub table: String,
}

impl NodeId {
    pub fn global(table: &str) -> Self {
        Self {
            script: None,
            table: table.to_owned(),
        }
    }

    pub fn volatile(script: &str, table: &str) -> Self {
        Self {
            script: Some(script.to_owned()),
            table: table.to_owned(),
        }
    }

    /// Human-readable qualified form: `script::table` for volatile nodes,
    /// the bare display name otherwise. Display only, identity is the
    /// composite key itself.
    pub fn qualified(&self) -> String {
        match &self.script {
            Some(script) => format!("{}::{}", script, self.table),
            None => self.table.clone(),
        }
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified())
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One table in the consolidated graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: NodeId,
    pub name: String,
    pub is_volatile: bool,
    pub is_view: bool,
    /// Scripts that reference this table. Empty for placeholder nodes of
    /// unknown origin.
    pub owners: BTreeSet<String>,
}

/// One statement's contribution to an edge: the owning script and the
/// statement's operation index within it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Operation {
    pub script: String,
    pub index: usize,
}

/// A directed data-flow edge. Identity is `(from, to)`; contributions from
/// different scripts union their operation sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    pub from: NodeId,
    pub to: NodeId,
    pub operations: BTreeSet<Operation>,
}

/// The consolidated multi-script lineage graph. An immutable snapshot once
/// built; node and edge keys are sorted, so consolidating the same scripts
/// in any order yields an identical graph, serialization included.
#[derive(Debug, Clone, Serialize)]
pub struct Graph {
    #[serde(serialize_with = "values_only")]
    pub nodes: IndexMap<NodeId, GraphNode>,
    #[serde(serialize_with = "values_only")]
    pub edges: IndexMap<(NodeId, NodeId), GraphEdge>,
    pub warnings: Vec<Warning>,
}

fn values_only<K, V: Serialize, S: Serializer>(
    map: &IndexMap<K, V>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(map.values())
}

struct NameOwner {
    script: String,
    volatile: bool,
}

/// Merges per-script lineage documents into one graph. Two passes: all
/// nodes and the display-name index first, then edge resolution against the
/// complete index, which is what makes the result independent of input
/// order.
pub fn consolidate(scripts: &[ScriptLineage]) -> Graph {
    let mut warnings = Vec::new();
    let accepted: Vec<&ScriptLineage> = scripts
        .iter()
        .filter(|script| match validate(script) {
            Ok(()) => true,
            Err(message) => {
                log::warn!("skipping lineage document `{}`: {}", script.script_name, message);
                warnings.push(Warning::StructuralSkip {
                    script: script.script_name.clone(),
                    message,
                });
                false
            }
        })
        .collect();

    let mut nodes: IndexMap<NodeId, GraphNode> = IndexMap::new();
    let mut name_index: IndexMap<&str, Vec<NameOwner>> = IndexMap::new();

    // Pass 1: nodes and the display-name index.
    for script in &accepted {
        for (name, entry) in &script.tables {
            let id = entry_node_id(&script.script_name, name, entry);
            let node = nodes.entry(id.clone()).or_insert_with(|| GraphNode {
                id,
                name: name.clone(),
                is_volatile: entry.is_volatile,
                is_view: entry.is_view,
                owners: BTreeSet::new(),
            });
            node.owners.insert(script.script_name.clone());
            if !node.is_volatile {
                node.is_view |= entry.is_view;
            }
            name_index.entry(name.as_str()).or_default().push(NameOwner {
                script: script.script_name.clone(),
                volatile: entry.is_volatile,
            });
        }
    }

    // Pass 2: edges, resolved against the complete index.
    let mut edges: IndexMap<(NodeId, NodeId), GraphEdge> = IndexMap::new();
    let mut gaps: BTreeSet<(String, String)> = BTreeSet::new();
    for script in &accepted {
        for (name, entry) in &script.tables {
            let own_id = entry_node_id(&script.script_name, name, entry);
            for related in &entry.source {
                let from = resolve(&related.name, script, &name_index, &mut nodes, &mut gaps);
                add_edge(
                    &mut edges,
                    from,
                    own_id.clone(),
                    &script.script_name,
                    &related.operations,
                );
            }
            for related in &entry.target {
                let to = resolve(&related.name, script, &name_index, &mut nodes, &mut gaps);
                add_edge(
                    &mut edges,
                    own_id.clone(),
                    to,
                    &script.script_name,
                    &related.operations,
                );
            }
        }
    }

    for (script, table) in gaps {
        log::warn!("unresolved table `{}` referenced by `{}`", table, script);
        warnings.push(Warning::ResolutionGap { script, table });
    }

    // Canonical order, independent of the order scripts arrived in.
    nodes.sort_keys();
    edges.sort_keys();

    Graph {
        nodes,
        edges,
        warnings,
    }
}

fn validate(script: &ScriptLineage) -> Result<(), String> {
    if script.script_name.trim().is_empty() {
        return Err("missing script name".to_owned());
    }
    if script.tables.keys().any(|name| name.trim().is_empty()) {
        return Err("empty table name key".to_owned());
    }
    for entry in script.tables.values() {
        if entry
            .source
            .iter()
            .chain(entry.target.iter())
            .any(|related| related.name.trim().is_empty())
        {
            return Err("related table without a name".to_owned());
        }
    }
    Ok(())
}

fn entry_node_id(script: &str, name: &str, entry: &TableEntry) -> NodeId {
    if entry.is_volatile {
        NodeId::volatile(script, name)
    } else {
        NodeId::global(name)
    }
}

/// Resolves a related table name to its node id: the referencing script's
/// own table map wins (a script may shadow a global name with its own
/// volatile table), then the global index, preferring a non-volatile owner.
/// Names known nowhere get a placeholder node so the graph stays connected.
fn resolve(
    name: &str,
    script: &ScriptLineage,
    name_index: &IndexMap<&str, Vec<NameOwner>>,
    nodes: &mut IndexMap<NodeId, GraphNode>,
    gaps: &mut BTreeSet<(String, String)>,
) -> NodeId {
    if let Some(entry) = script.tables.get(name) {
        return entry_node_id(&script.script_name, name, entry);
    }
    if let Some(owners) = name_index.get(name) {
        if owners.iter().any(|owner| !owner.volatile) {
            return NodeId::global(name);
        }
        if let Some(owner) = owners.iter().min_by(|a, b| a.script.cmp(&b.script)) {
            return NodeId::volatile(&owner.script, name);
        }
    }
    let id = NodeId::global(name);
    nodes.entry(id.clone()).or_insert_with(|| GraphNode {
        id: id.clone(),
        name: name.to_owned(),
        is_volatile: false,
        is_view: false,
        owners: BTreeSet::new(),
    });
    gaps.insert((script.script_name.clone(), name.to_owned()));
    id
}

/// Creates or merges the `(from, to)` edge, unioning operation
/// contributions. A relation with no operation indices is not materialized.
fn add_edge(
    edges: &mut IndexMap<(NodeId, NodeId), GraphEdge>,
    from: NodeId,
    to: NodeId,
    script: &str,
    operations: &[usize],
) {
    if operations.is_empty() {
        return;
    }
    let edge = edges
        .entry((from.clone(), to.clone()))
        .or_insert_with(|| GraphEdge {
            from,
            to,
            operations: BTreeSet::new(),
        });
    for &index in operations {
        edge.operations.insert(Operation {
            script: script.to_owned(),
            index,
        });
    }
}
