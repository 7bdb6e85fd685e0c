use etlin::segment::{FileKind, RawStatement, Segmenter};
use etlin::warning::Warning;

const SHELL_SCRIPT: &str = r#"#!/bin/ksh
# nightly load
export LOGDIR=/var/log/etl

bteq <<EOF
.LOGON server/loader,secret;
BT;

CREATE VOLATILE TABLE stage AS (
    SELECT * FROM edw.orders
) WITH DATA;

INSERT INTO mart.orders
SELECT * FROM stage;

ET;
.QUIT
EOF

echo "done"
"#;

#[test]
fn test_heredoc_slicing_and_line_anchors() {
    let segmenter = Segmenter::new();
    let (statements, warnings) = segmenter.segment(SHELL_SCRIPT, FileKind::Shell);
    assert!(warnings.is_empty());

    let texts: Vec<&str> = statements
        .iter()
        .map(|statement| statement.text.as_str())
        .collect();
    assert_eq!(texts.len(), 4);
    assert_eq!(texts[0], "BT");
    assert!(texts[1].starts_with("CREATE VOLATILE TABLE stage AS ("));
    assert!(texts[2].starts_with("INSERT INTO mart.orders"));
    assert_eq!(texts[3], "ET");

    let lines: Vec<u32> = statements.iter().map(|statement| statement.line).collect();
    assert_eq!(lines, [7, 9, 13, 16]);
}

#[test]
fn test_shell_content_outside_heredoc_is_discarded() {
    let segmenter = Segmenter::new();
    let (statements, _) = segmenter.segment(SHELL_SCRIPT, FileKind::Shell);
    assert!(
        statements
            .iter()
            .all(|statement| !statement.text.contains("echo") && !statement.text.contains("export"))
    );
}

#[test]
fn test_multiple_heredoc_blocks_keep_statement_order() {
    let script = "bteq <<EOF\nINSERT INTO mart.a SELECT * FROM edw.x;\nEOF\n\nbteq <<EOF\nINSERT INTO mart.b SELECT * FROM edw.y;\nEOF\n";
    let segmenter = Segmenter::new();
    let (statements, warnings) = segmenter.segment(script, FileKind::Shell);
    assert!(warnings.is_empty());
    assert_eq!(statements.len(), 2);
    assert!(statements[0].text.contains("mart.a"));
    assert!(statements[1].text.contains("mart.b"));
    assert_eq!(statements[0].line, 2);
    assert_eq!(statements[1].line, 6);
}

#[test]
fn test_no_heredoc_is_a_warning_not_an_error() {
    let segmenter = Segmenter::new();
    let (statements, warnings) = segmenter.segment("#!/bin/sh\necho nothing here\n", FileKind::Shell);
    assert!(statements.is_empty());
    assert_eq!(warnings, [Warning::NoSqlContent]);
}

#[test]
fn test_empty_sql_input_is_a_warning() {
    let segmenter = Segmenter::new();
    let (statements, warnings) = segmenter.segment("   \n\n", FileKind::Sql);
    assert!(statements.is_empty());
    assert_eq!(warnings, [Warning::NoSqlContent]);
}

#[test]
fn test_comments_are_stripped_line_preserving() {
    let sql = "-- header comment\nSELECT *\nFROM edw.orders; /* trailing\nblock */ SELECT 1 FROM edw.dual;";
    let segmenter = Segmenter::new();
    let (statements, warnings) = segmenter.segment(sql, FileKind::Sql);
    assert!(warnings.is_empty());
    assert_eq!(statements.len(), 2);
    assert_eq!(statements[0].text, "SELECT *\nFROM edw.orders");
    assert_eq!(statements[0].line, 2);
    assert_eq!(statements[1].text, "SELECT 1 FROM edw.dual");
    assert_eq!(statements[1].line, 4);
}

#[test]
fn test_comment_markers_inside_string_literals_survive() {
    let sql = "INSERT INTO mart.notes SELECT '-- not; a comment' FROM edw.src;";
    let segmenter = Segmenter::new();
    let (statements, _) = segmenter.segment(sql, FileKind::Sql);
    assert_eq!(statements.len(), 1);
    assert!(statements[0].text.contains("'-- not; a comment'"));
}

#[test]
fn test_semicolons_inside_parens_do_not_split() {
    // No statement split inside the parenthesized body.
    let sql = "CREATE VOLATILE TABLE t AS (\nSELECT * FROM edw.a\n);\nINSERT INTO mart.b SELECT * FROM t;";
    let segmenter = Segmenter::new();
    let (statements, _) = segmenter.segment(sql, FileKind::Sql);
    assert_eq!(statements.len(), 2);
}

#[test]
fn test_directives_dropped_transaction_markers_kept() {
    let block = "bteq <<EOF\n.SET WIDTH 200;\n.LOGON x/y,z;\nBT;\nSLEEP 5;\nINSERT INTO mart.t SELECT * FROM edw.s;\nET;\n.LOGOFF;\nEOF\n";
    let segmenter = Segmenter::new();
    let (statements, _) = segmenter.segment(block, FileKind::Shell);
    let texts: Vec<&str> = statements
        .iter()
        .map(|statement| statement.text.as_str())
        .collect();
    assert_eq!(texts, ["BT", "INSERT INTO mart.t SELECT * FROM edw.s", "ET"]);
}

#[test]
fn test_statement_deserializes_from_bare_string() {
    let statement: RawStatement = serde_json::from_str(r#""SELECT * FROM edw.t""#).unwrap();
    assert_eq!(statement.text, "SELECT * FROM edw.t");
    assert_eq!(statement.line, 1);

    let statement: RawStatement =
        serde_json::from_str(r#"{"text": "SELECT 1", "line": 12}"#).unwrap();
    assert_eq!(statement.line, 12);
}
