use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::warning::Warning;

/// How the raw bytes of an input file should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// A shell script wrapping its SQL in `bteq <<EOF ... EOF` heredoc blocks.
    Shell,
    /// A standalone SQL file.
    Sql,
}

/// One cleaned SQL statement, anchored to the 1-based line of its first
/// non-blank character in the original input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawStatementRepr")]
pub struct RawStatement {
    pub text: String,
    pub line: u32,
}

/// External loaders may supply statements as bare strings; older documents
/// carry the full `{text, line}` shape.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawStatementRepr {
    Full { text: String, line: u32 },
    Text(String),
}

impl From<RawStatementRepr> for RawStatement {
    fn from(repr: RawStatementRepr) -> Self {
        match repr {
            RawStatementRepr::Full { text, line } => RawStatement { text, line },
            RawStatementRepr::Text(text) => RawStatement { text, line: 1 },
        }
    }
}

struct SqlBlock {
    text: String,
    base_line: u32,
}

/// Isolates individual SQL statements from raw script text.
pub struct Segmenter {
    heredoc: Regex,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Segmenter {
    pub fn new() -> Self {
        Self {
            heredoc: Regex::new(r"(?is)bteq\s*<<-?\s*EOF[ \t]*\n(.*?)\nEOF").unwrap(),
        }
    }

    /// Splits the input into ordered statements. Never fails: inputs with no
    /// SQL content yield an empty list plus a warning.
    pub fn segment(&self, raw: &str, kind: FileKind) -> (Vec<RawStatement>, Vec<Warning>) {
        let mut warnings = Vec::new();
        let blocks = self.sql_blocks(raw, kind, &mut warnings);

        let mut statements = Vec::new();
        for block in &blocks {
            let cleaned = drop_directives(&strip_comments(&block.text), kind);
            split_statements(&cleaned, block.base_line, &mut statements);
        }
        (statements, warnings)
    }

    fn sql_blocks(&self, raw: &str, kind: FileKind, warnings: &mut Vec<Warning>) -> Vec<SqlBlock> {
        match kind {
            FileKind::Shell => {
                let blocks: Vec<SqlBlock> = self
                    .heredoc
                    .captures_iter(raw)
                    .filter_map(|captures| {
                        let body = captures.get(1)?;
                        Some(SqlBlock {
                            text: body.as_str().to_owned(),
                            base_line: raw[..body.start()].matches('\n').count() as u32 + 1,
                        })
                    })
                    .collect();
                if blocks.is_empty() {
                    log::warn!("no heredoc SQL blocks found in shell input");
                    warnings.push(Warning::NoSqlContent);
                }
                blocks
            }
            FileKind::Sql => {
                if raw.trim().is_empty() {
                    warnings.push(Warning::NoSqlContent);
                    vec![]
                } else {
                    vec![SqlBlock {
                        text: raw.to_owned(),
                        base_line: 1,
                    }]
                }
            }
        }
    }
}

/// Blanks `--` and `/* ... */` comments while preserving every newline, so
/// character offsets keep mapping to the original lines. Comment markers
/// inside single-quoted literals are left alone.
fn strip_comments(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\'' {
            out.push(c);
            i += 1;
            while i < chars.len() {
                out.push(chars[i]);
                if chars[i] == '\'' {
                    if chars.get(i + 1) == Some(&'\'') {
                        out.push('\'');
                        i += 2;
                        continue;
                    }
                    i += 1;
                    break;
                }
                i += 1;
            }
        } else if c == '-' && chars.get(i + 1) == Some(&'-') {
            while i < chars.len() && chars[i] != '\n' {
                out.push(' ');
                i += 1;
            }
        } else if c == '/' && chars.get(i + 1) == Some(&'*') {
            out.push_str("  ");
            i += 2;
            while i < chars.len() {
                if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                    out.push_str("  ");
                    i += 2;
                    break;
                }
                out.push(if chars[i] == '\n' { '\n' } else { ' ' });
                i += 1;
            }
        } else {
            out.push(c);
            i += 1;
        }
    }
    out
}

/// Blanks session-control lines: dot-prefixed BTEQ directives, logon/quit
/// style commands, and (for standalone SQL) leftover shell lines. The `BT`
/// and `ET` transaction markers stay, they are meaningful statement
/// separators.
fn drop_directives(text: &str, kind: FileKind) -> String {
    text.split('\n')
        .map(|line| {
            if is_directive_line(line, kind) { "" } else { line }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_directive_line(line: &str, kind: FileKind) -> bool {
    let trimmed = line.trim();
    if trimmed.starts_with('.') {
        return true;
    }
    if kind == FileKind::Sql && trimmed.starts_with('#') {
        return true;
    }
    let upper = trimmed.trim_end_matches(';').trim().to_uppercase();
    matches!(upper.as_str(), "QUIT" | "LOGOFF" | "EXIT")
        || upper.starts_with("SLEEP ")
        || upper == "SLEEP"
        || upper.starts_with("LOGON ")
}

/// Splits on `;` at parenthesis depth 0, string-literal aware, recording a
/// 1-based line anchor per statement.
fn split_statements(cleaned: &str, base_line: u32, out: &mut Vec<RawStatement>) {
    let chars: Vec<char> = cleaned.chars().collect();

    // Prefix newline counts, so anchors are O(1) per statement.
    let mut newlines = Vec::with_capacity(chars.len() + 1);
    newlines.push(0u32);
    for &c in &chars {
        let prev = *newlines.last().unwrap_or(&0);
        newlines.push(prev + u32::from(c == '\n'));
    }

    let mut depth: i32 = 0;
    let mut start = 0;
    let mut i = 0;
    loop {
        let terminal = i >= chars.len();
        let c = if terminal { ';' } else { chars[i] };
        match c {
            '\'' if !terminal => {
                i += 1;
                while i < chars.len() {
                    if chars[i] == '\'' {
                        if chars.get(i + 1) == Some(&'\'') {
                            i += 2;
                            continue;
                        }
                        break;
                    }
                    i += 1;
                }
            }
            '(' => depth += 1,
            ')' => depth -= 1,
            ';' if depth <= 0 => {
                push_statement(&chars, &newlines, start, i, base_line, out);
                start = i + 1;
            }
            _ => {}
        }
        if terminal {
            break;
        }
        i += 1;
    }
}

fn push_statement(
    chars: &[char],
    newlines: &[u32],
    start: usize,
    end: usize,
    base_line: u32,
    out: &mut Vec<RawStatement>,
) {
    let end = end.min(chars.len());
    let Some(offset) = chars[start..end].iter().position(|c| !c.is_whitespace()) else {
        return;
    };
    let anchor = start + offset;
    let text: String = chars[anchor..end].iter().collect();
    let text = text.trim_end().to_owned();
    if text.is_empty() {
        return;
    }
    out.push(RawStatement {
        text,
        line: base_line + newlines[anchor],
    });
}
