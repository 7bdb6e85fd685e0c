use regex::Regex;

use super::{ExtractStrategy, Proposal, StatementKind};

/// Regular-expression fallback strategy, for syntax the clause walker cannot
/// make sense of. Scans token sequences after `FROM`/`JOIN` for source
/// candidates and matches one target pattern per statement kind.
pub(crate) struct PatternStrategy {
    from_join: Regex,
    insert: Regex,
    update_from: Regex,
    update: Regex,
    delete: Regex,
    create: Regex,
}

impl PatternStrategy {
    pub(crate) fn new() -> Self {
        Self {
            from_join: Regex::new(r"(?i)\b(?:FROM|JOIN)\s+([A-Za-z0-9_.]+)").unwrap(),
            insert: Regex::new(r"(?i)\bINS(?:ERT)?\s+(?:INTO\s+)?([A-Za-z0-9_.]+)").unwrap(),
            update_from: Regex::new(r"(?i)\bUPD(?:ATE)?\s+[A-Za-z0-9_.]+\s+FROM\s+([A-Za-z0-9_.]+)")
                .unwrap(),
            update: Regex::new(r"(?i)\bUPD(?:ATE)?\s+([A-Za-z0-9_.]+)").unwrap(),
            delete: Regex::new(r"(?i)\bDEL(?:ETE)?\s+(?:FROM\s+)?([A-Za-z0-9_.]+)").unwrap(),
            create: Regex::new(r"(?i)\bCREATE\s+(?:\w+\s+){0,3}?(?:TABLE|VIEW)\s+([A-Za-z0-9_.]+)")
                .unwrap(),
        }
    }

    fn first_capture(&self, regex: &Regex, sql: &str) -> Option<String> {
        regex
            .captures(sql)
            .and_then(|captures| captures.get(1))
            .map(|group| group.as_str().to_owned())
    }
}

impl ExtractStrategy for PatternStrategy {
    fn propose(&self, sql: &str, kind: StatementKind) -> Proposal {
        let target = match kind {
            StatementKind::CreateVolatile
            | StatementKind::CreateView
            | StatementKind::CreateTable => self.first_capture(&self.create, sql),
            StatementKind::Insert => self.first_capture(&self.insert, sql),
            StatementKind::Update => self
                .first_capture(&self.update_from, sql)
                .or_else(|| self.first_capture(&self.update, sql)),
            StatementKind::Delete => self.first_capture(&self.delete, sql),
            _ => None,
        };

        let sources = self
            .from_join
            .captures_iter(sql)
            .filter_map(|captures| captures.get(1))
            .map(|group| group.as_str().to_owned())
            .collect();

        Proposal { target, sources }
    }
}
