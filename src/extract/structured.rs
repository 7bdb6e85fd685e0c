use super::{ExtractStrategy, Proposal, StatementKind, is_reserved};

/// Clause-walking strategy: tokenizes the statement, parses parenthesized
/// groups into a tree, and collects every table reference following `FROM`
/// (including comma-separated FROM lists) and `JOIN`, recursing into every
/// subquery regardless of where it appears (FROM, WHERE `EXISTS`/`IN`,
/// SELECT-list scalars).
pub(crate) struct StructuredStrategy;

impl StructuredStrategy {
    pub(crate) fn new() -> Self {
        Self
    }
}

impl ExtractStrategy for StructuredStrategy {
    fn propose(&self, sql: &str, kind: StatementKind) -> Proposal {
        let tokens = tokenize(sql);
        let mut cursor = 0;
        let nodes = parse_nodes(&tokens, &mut cursor);

        let mut proposal = Proposal {
            target: extract_target(&tokens, kind),
            sources: Vec::new(),
        };
        collect_sources(&nodes, &mut proposal.sources);
        proposal
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tok {
    Word(String),
    LParen,
    RParen,
    Comma,
}

fn tokenize(sql: &str) -> Vec<Tok> {
    let chars: Vec<char> = sql.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            // Dotted identifiers are lexed whole: `db.table` is one word.
            while i < chars.len()
                && chars[i] == '.'
                && chars
                    .get(i + 1)
                    .is_some_and(|next| next.is_alphanumeric() || *next == '_')
            {
                i += 2;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
            }
            tokens.push(Tok::Word(chars[start..i].iter().collect()));
        } else if c == '\'' {
            i += 1;
            while i < chars.len() {
                if chars[i] == '\'' {
                    if chars.get(i + 1) == Some(&'\'') {
                        i += 2;
                        continue;
                    }
                    i += 1;
                    break;
                }
                i += 1;
            }
        } else {
            match c {
                '(' => tokens.push(Tok::LParen),
                ')' => tokens.push(Tok::RParen),
                ',' => tokens.push(Tok::Comma),
                _ => {}
            }
            i += 1;
        }
    }
    tokens
}

#[derive(Debug)]
enum Node {
    Word(String),
    Group(Vec<Node>),
    Comma,
}

fn parse_nodes(tokens: &[Tok], cursor: &mut usize) -> Vec<Node> {
    let mut nodes = Vec::new();
    while *cursor < tokens.len() {
        match &tokens[*cursor] {
            Tok::Word(word) => {
                nodes.push(Node::Word(word.clone()));
                *cursor += 1;
            }
            Tok::Comma => {
                nodes.push(Node::Comma);
                *cursor += 1;
            }
            Tok::LParen => {
                *cursor += 1;
                nodes.push(Node::Group(parse_nodes(tokens, cursor)));
            }
            Tok::RParen => {
                *cursor += 1;
                return nodes;
            }
        }
    }
    nodes
}

fn collect_sources(nodes: &[Node], out: &mut Vec<String>) {
    let mut i = 0;
    while i < nodes.len() {
        match &nodes[i] {
            Node::Group(inner) => collect_sources(inner, out),
            Node::Word(word) => {
                let upper = word.to_uppercase();
                if upper == "FROM" {
                    i = collect_from_list(nodes, i + 1, out);
                    continue;
                }
                if upper == "JOIN" {
                    if let Some(Node::Word(table)) = nodes.get(i + 1) {
                        if !is_reserved(&table.to_uppercase()) {
                            out.push(table.clone());
                        }
                        i += 2;
                        continue;
                    }
                    // `JOIN (subquery)`: the group is visited on its own.
                }
            }
            Node::Comma => {}
        }
        i += 1;
    }
}

/// Consumes a FROM list: `item [alias] (, item [alias])*` where an item is a
/// table name or a parenthesized subquery. Returns the index of the first
/// node past the list.
fn collect_from_list(nodes: &[Node], mut i: usize, out: &mut Vec<String>) -> usize {
    loop {
        match nodes.get(i) {
            Some(Node::Word(word)) if !is_reserved(&word.to_uppercase()) => {
                out.push(word.clone());
                i += 1;
            }
            Some(Node::Group(inner)) => {
                collect_sources(inner, out);
                i += 1;
            }
            _ => return i,
        }
        // Optional alias.
        if let Some(Node::Word(alias)) = nodes.get(i) {
            if !is_reserved(&alias.to_uppercase()) {
                i += 1;
            }
        }
        match nodes.get(i) {
            Some(Node::Comma) => i += 1,
            _ => return i,
        }
    }
}

/// Picks the write target from the statement head, per kind.
fn extract_target(tokens: &[Tok], kind: StatementKind) -> Option<String> {
    let words: Vec<&str> = tokens
        .iter()
        .filter_map(|token| match token {
            Tok::Word(word) => Some(word.as_str()),
            _ => None,
        })
        .take(10)
        .collect();
    let upper = |i: usize| words.get(i).map(|word| word.to_uppercase());

    let target = match kind {
        StatementKind::CreateVolatile | StatementKind::CreateTable => {
            let at = words
                .iter()
                .take(5)
                .position(|word| word.eq_ignore_ascii_case("table"))?;
            words.get(at + 1)
        }
        StatementKind::CreateView => {
            let at = words
                .iter()
                .take(5)
                .position(|word| word.eq_ignore_ascii_case("view"))?;
            words.get(at + 1)
        }
        StatementKind::Insert => {
            if upper(1).as_deref() == Some("INTO") {
                words.get(2)
            } else {
                words.get(1)
            }
        }
        StatementKind::Update => {
            // Teradata `UPDATE alias FROM target ...` names the real target
            // after FROM; standard `UPDATE target SET ...` names it directly.
            if upper(2).as_deref() == Some("FROM") {
                words.get(3)
            } else {
                words.get(1)
            }
        }
        StatementKind::Delete => {
            if upper(1).as_deref() == Some("FROM") {
                words.get(2)
            } else {
                words.get(1)
            }
        }
        _ => None,
    };
    target.map(|word| (*word).to_owned())
}
