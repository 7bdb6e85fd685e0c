use indexmap::IndexSet;
use regex::Regex;
use serde::Serialize;
use strum_macros::{Display, EnumString};

use crate::segment::RawStatement;
use crate::warning::Warning;

pub(crate) mod pattern;
pub(crate) mod structured;

use pattern::PatternStrategy;
use structured::StructuredStrategy;

/// Classification of a statement by its leading keywords. Teradata
/// abbreviations (`SEL`, `INS`, `UPD`, `DEL`) are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatementKind {
    CreateVolatile,
    CreateView,
    CreateTable,
    Insert,
    Update,
    Delete,
    Select,
    TransactionBoundary,
    Drop,
    Alter,
    Unrecognized,
}

impl StatementKind {
    /// Kinds that write somewhere, for which a missing target is worth a
    /// warning.
    fn writes(&self) -> bool {
        matches!(
            self,
            StatementKind::CreateVolatile
                | StatementKind::CreateView
                | StatementKind::CreateTable
                | StatementKind::Insert
                | StatementKind::Update
                | StatementKind::Delete
        )
    }
}

/// The source/target tables one statement reads from and writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub kind: StatementKind,
    pub target: Option<String>,
    pub sources: IndexSet<String>,
    pub is_volatile_target: bool,
    pub is_view_target: bool,
}

impl Relation {
    fn empty(kind: StatementKind) -> Self {
        Self {
            kind,
            target: None,
            sources: IndexSet::new(),
            is_volatile_target: false,
            is_view_target: false,
        }
    }
}

/// A single strategy's guess at the tables a statement writes and reads.
/// Candidates are raw, the [`Extractor`] filters and combines them.
#[derive(Debug, Default, Clone)]
pub(crate) struct Proposal {
    pub(crate) target: Option<String>,
    pub(crate) sources: Vec<String>,
}

/// One way of proposing a write target and source candidates for a
/// classified statement. Strategies stay permissive; filtering happens once,
/// on the union of their output.
pub(crate) trait ExtractStrategy {
    fn propose(&self, sql: &str, kind: StatementKind) -> Proposal;
}

/// Reserved words that must never be taken for table names. Teradata
/// flavoured; includes BTEQ transaction markers and clause keywords the
/// strategies use as list terminators.
const RESERVED_WORDS: &[&str] = &[
    "ALL", "ALTER", "AND", "ANY", "AS", "ASC", "BETWEEN", "BT", "BY", "CASE", "CAST",
    "CHARACTERS", "COALESCE", "COMMIT", "CREATE", "CROSS", "CURRENT_DATE", "CURRENT_TIMESTAMP",
    "DATA", "DELETE", "DESC", "DISTINCT", "DROP", "ELSE", "END", "ET", "EXCEPT", "EXISTS",
    "FROM", "FULL", "GROUP", "HAVING", "IN", "INNER", "INSERT", "INTERSECT", "INTO", "IS",
    "JOIN", "LEFT", "LIKE", "MERGE", "MINUS", "MULTISET", "NATURAL", "NOT", "NULL", "ON",
    "OR", "ORDER", "OUTER", "PRESERVE", "QUALIFY", "RIGHT", "ROWS", "SAMPLE", "SEL", "SELECT",
    "SET", "SUBSTR", "SUBSTRING", "TABLE", "THEN", "TOP", "TRIM", "UNION", "UPDATE", "USING",
    "VALUES", "VIEW", "VOLATILE", "WHEN", "WHERE", "WITH",
];

/// `word` must already be uppercased.
pub(crate) fn is_reserved(word: &str) -> bool {
    RESERVED_WORDS.iter().any(|reserved| *reserved == word)
}

/// Classifies a statement by its leading keywords.
pub fn classify(sql: &str) -> StatementKind {
    let words = leading_words(sql);
    let Some(first) = words.first() else {
        return StatementKind::Unrecognized;
    };
    match first.as_str() {
        "CREATE" => {
            let scope = &words[1..words.len().min(5)];
            if scope.iter().any(|w| w == "VOLATILE") {
                StatementKind::CreateVolatile
            } else if scope.iter().any(|w| w == "VIEW") {
                StatementKind::CreateView
            } else if scope.iter().any(|w| w == "TABLE") {
                StatementKind::CreateTable
            } else {
                StatementKind::Unrecognized
            }
        }
        "INSERT" | "INS" => StatementKind::Insert,
        "UPDATE" | "UPD" => StatementKind::Update,
        "DELETE" | "DEL" => StatementKind::Delete,
        "SELECT" | "SEL" => StatementKind::Select,
        "BT" | "ET" => StatementKind::TransactionBoundary,
        "DROP" => StatementKind::Drop,
        "ALTER" => StatementKind::Alter,
        _ => StatementKind::Unrecognized,
    }
}

fn leading_words(sql: &str) -> Vec<String> {
    sql.split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.'))
        .filter(|word| !word.is_empty())
        .take(6)
        .map(|word| word.to_uppercase())
        .collect()
}

/// Classifies statements and extracts their relations by running both
/// strategies and combining the results: source candidates are unioned for
/// recall, the structured strategy's target wins on disagreement.
pub struct Extractor {
    structured: StructuredStrategy,
    pattern: PatternStrategy,
    shape: Regex,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor {
    pub fn new() -> Self {
        Self {
            structured: StructuredStrategy::new(),
            pattern: PatternStrategy::new(),
            shape: Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").unwrap(),
        }
    }

    /// Extracts the [`Relation`] of one statement. Failures degrade to an
    /// empty relation plus a line-tagged warning, never an error.
    pub fn relation(&self, statement: &RawStatement, warnings: &mut Vec<Warning>) -> Relation {
        let kind = classify(&statement.text);
        match kind {
            StatementKind::TransactionBoundary | StatementKind::Drop | StatementKind::Alter => {
                return Relation::empty(kind);
            }
            StatementKind::Unrecognized => {
                let message = format!(
                    "could not classify statement `{}`",
                    snippet(&statement.text)
                );
                log::warn!("line {}: {}", statement.line, message);
                warnings.push(Warning::Parse {
                    line: statement.line,
                    message,
                });
                return Relation::empty(kind);
            }
            _ => {}
        }

        let structured = self.structured.propose(&statement.text, kind);
        let fallback = self.pattern.propose(&statement.text, kind);

        let target = structured
            .target
            .as_deref()
            .into_iter()
            .chain(fallback.target.as_deref())
            .find_map(|candidate| self.accept(candidate));

        let mut sources = IndexSet::new();
        for candidate in structured.sources.iter().chain(fallback.sources.iter()) {
            if let Some(name) = self.accept(candidate) {
                sources.insert(name);
            }
        }

        if kind.writes() && target.is_none() {
            let message = format!("could not determine the target table of a {} statement", kind);
            log::warn!("line {}: {}", statement.line, message);
            warnings.push(Warning::Parse {
                line: statement.line,
                message,
            });
        }

        Relation {
            is_volatile_target: kind == StatementKind::CreateVolatile && target.is_some(),
            is_view_target: kind == StatementKind::CreateView && target.is_some(),
            kind,
            target,
            sources,
        }
    }

    /// Candidate filter shared by both strategies: reserved words and
    /// single-character aliases are dropped, the dotted-or-bare identifier
    /// shape is enforced, and accepted names are case-normalized.
    fn accept(&self, candidate: &str) -> Option<String> {
        let name = candidate.trim().to_uppercase();
        if name.len() <= 1 || is_reserved(&name) || !self.shape.is_match(&name) {
            return None;
        }
        Some(name)
    }
}

fn snippet(sql: &str) -> String {
    let flat = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > 40 {
        format!("{}...", flat.chars().take(40).collect::<String>())
    } else {
        flat
    }
}
