use serde::{Serialize, Serializer};
use thiserror::Error;

/// Non-fatal problems accumulated while building or consolidating lineage.
///
/// No warning aborts processing: a statement that fails extraction is kept
/// with a partial relation, an unresolvable reference gets a placeholder
/// node, and a malformed document is skipped while the rest proceed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A statement could not be classified, or nothing meaningful could be
    /// extracted from it.
    #[error("line {line}: {message}")]
    Parse { line: u32, message: String },
    /// A referenced table name was not found in any script's table map; a
    /// placeholder node was created to keep the graph connected.
    #[error("unresolved table `{table}` referenced by `{script}`")]
    ResolutionGap { script: String, table: String },
    /// A lineage document was malformed and excluded from consolidation.
    #[error("skipped malformed lineage document `{script}`: {message}")]
    StructuralSkip { script: String, message: String },
    /// A query anchor did not match any node in the (filtered) graph.
    #[error("query anchor `{name}` does not match any node")]
    UnknownAnchor { name: String },
    /// The input contained no SQL at all.
    #[error("no SQL content found")]
    NoSqlContent,
}

impl Serialize for Warning {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

pub(crate) fn render(warnings: &[Warning]) -> Vec<String> {
    warnings.iter().map(|warning| warning.to_string()).collect()
}
