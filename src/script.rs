use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::extract::{Extractor, Relation};
use crate::segment::{FileKind, RawStatement, Segmenter};
use crate::warning;

/// A related table recorded on a [`TableEntry`], with the ordered,
/// deduplicated operation indices that established the relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedTable {
    pub name: String,
    #[serde(rename = "operation")]
    pub operations: Vec<usize>,
}

/// Per-script record of one table: which tables feed into it (`source`) and
/// which tables it feeds into (`target`). All fields default to empty, so
/// loader-supplied documents may omit any of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableEntry {
    pub source: Vec<RelatedTable>,
    pub target: Vec<RelatedTable>,
    pub is_volatile: bool,
    pub is_view: bool,
}

/// The complete lineage document for one input file. Immutable once built;
/// statement indices are the operation indices referenced by table entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptLineage {
    pub script_name: String,
    pub statements: Vec<RawStatement>,
    pub tables: IndexMap<String, TableEntry>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Segments the raw text, extracts one relation per statement, and
/// aggregates them into a per-script table map. Never fails: problems are
/// recorded as warnings on the returned document.
pub fn build_script_lineage(raw: &str, kind: FileKind, script_name: &str) -> ScriptLineage {
    let segmenter = Segmenter::new();
    let extractor = Extractor::new();

    let (statements, mut warnings) = segmenter.segment(raw, kind);
    let mut relations = Vec::with_capacity(statements.len());
    for statement in &statements {
        relations.push(extractor.relation(statement, &mut warnings));
    }

    ScriptLineage {
        script_name: script_name.to_owned(),
        tables: assemble_tables(&relations),
        statements,
        warnings: warning::render(&warnings),
    }
}

/// Folds statement relations into the symmetric per-table source/target
/// bookkeeping. Entries are ensured for every named table (so select-only
/// reads still surface); relationship lists are only written when the
/// relation has a target.
fn assemble_tables(relations: &[Relation]) -> IndexMap<String, TableEntry> {
    let mut tables: IndexMap<String, TableEntry> = IndexMap::new();
    for (index, relation) in relations.iter().enumerate() {
        for source in &relation.sources {
            tables.entry(source.clone()).or_default();
        }
        let Some(target) = &relation.target else {
            continue;
        };
        let entry = tables.entry(target.clone()).or_default();
        entry.is_volatile |= relation.is_volatile_target;
        entry.is_view |= relation.is_view_target;

        for source in &relation.sources {
            if let Some(entry) = tables.get_mut(target.as_str()) {
                record(&mut entry.source, source, index);
            }
            if let Some(entry) = tables.get_mut(source.as_str()) {
                record(&mut entry.target, target, index);
            }
        }
    }
    tables
}

/// Unions `index` into the related-table list, never duplicating entries.
fn record(list: &mut Vec<RelatedTable>, name: &str, index: usize) {
    if let Some(related) = list.iter_mut().find(|related| related.name == name) {
        if !related.operations.contains(&index) {
            related.operations.push(index);
        }
    } else {
        list.push(RelatedTable {
            name: name.to_owned(),
            operations: vec![index],
        });
    }
}
