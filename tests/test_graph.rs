use etlin::graph::{NodeId, consolidate};
use etlin::script::{RelatedTable, ScriptLineage, TableEntry, build_script_lineage};
use etlin::segment::FileKind;
use etlin::warning::Warning;
use indexmap::IndexMap;

fn lineage(name: &str, sql: &str) -> ScriptLineage {
    build_script_lineage(sql, FileKind::Sql, name)
}

#[test]
fn test_scenario_volatile_staging() {
    let sql = "CREATE VOLATILE TABLE temp.staging AS (SELECT * FROM source.table);\n\
               INSERT INTO warehouse.final SELECT * FROM temp.staging;";
    let graph = consolidate(&[lineage("S", sql)]);

    let ids: Vec<String> = graph.nodes.keys().map(NodeId::qualified).collect();
    assert_eq!(ids.len(), 3);
    assert!(ids.contains(&"SOURCE.TABLE".to_owned()));
    assert!(ids.contains(&"S::TEMP.STAGING".to_owned()));
    assert!(ids.contains(&"WAREHOUSE.FINAL".to_owned()));

    let staging = &graph.nodes[&NodeId::volatile("S", "TEMP.STAGING")];
    assert!(staging.is_volatile);

    let edge_keys: Vec<(String, String)> = graph
        .edges
        .keys()
        .map(|(from, to)| (from.qualified(), to.qualified()))
        .collect();
    // Canonical key order sorts global ids before script-scoped ones.
    assert_eq!(
        edge_keys,
        [
            ("SOURCE.TABLE".to_owned(), "S::TEMP.STAGING".to_owned()),
            ("S::TEMP.STAGING".to_owned(), "WAREHOUSE.FINAL".to_owned()),
        ]
    );

    let first = &graph.edges[&(
        NodeId::global("SOURCE.TABLE"),
        NodeId::volatile("S", "TEMP.STAGING"),
    )];
    let operations: Vec<(String, usize)> = first
        .operations
        .iter()
        .map(|operation| (operation.script.clone(), operation.index))
        .collect();
    assert_eq!(operations, [("S".to_owned(), 0)]);
}

#[test]
fn test_order_independence() {
    let a = lineage(
        "a.sql",
        "CREATE VOLATILE TABLE work AS (SELECT * FROM edw.dim);\n\
         INSERT INTO mart.fact SELECT * FROM work;",
    );
    let b = lineage(
        "b.sql",
        "INSERT INTO mart.fact SELECT * FROM edw.extra;\n\
         INSERT INTO mart.other SELECT * FROM work;",
    );
    let c = lineage(
        "c.sql",
        "UPDATE t FROM mart.fact t, edw.adjust a SET amount = a.amount;",
    );

    let forward = consolidate(&[a.clone(), b.clone(), c.clone()]);
    let backward = consolidate(&[c, b, a]);

    assert_eq!(forward.nodes, backward.nodes);
    assert_eq!(forward.edges, backward.edges);
    // Canonical order: the serialized form is identical too.
    assert_eq!(
        serde_json::to_string(&forward).unwrap(),
        serde_json::to_string(&backward).unwrap()
    );
}

#[test]
fn test_volatile_scoping_never_merges_across_scripts() {
    let a = lineage(
        "a.sql",
        "CREATE VOLATILE TABLE work_tbl AS (SELECT * FROM edw.src);",
    );
    let b = lineage(
        "b.sql",
        "CREATE VOLATILE TABLE work_tbl AS (SELECT * FROM edw.src);",
    );
    let graph = consolidate(&[a, b]);

    assert!(graph.nodes.contains_key(&NodeId::volatile("a.sql", "WORK_TBL")));
    assert!(graph.nodes.contains_key(&NodeId::volatile("b.sql", "WORK_TBL")));
    assert!(!graph.nodes.contains_key(&NodeId::global("WORK_TBL")));

    // The shared persistent table merged into exactly one node.
    let src = &graph.nodes[&NodeId::global("EDW.SRC")];
    assert_eq!(
        src.owners.iter().cloned().collect::<Vec<_>>(),
        ["a.sql", "b.sql"]
    );
}

#[test]
fn test_edge_consolidation_unions_contributions() {
    let a = lineage("a.sql", "INSERT INTO mart.out SELECT * FROM edw.src;");
    let b = lineage("b.sql", "INSERT INTO mart.out SELECT * FROM edw.src;");
    let graph = consolidate(&[a, b]);

    let edge = &graph.edges[&(NodeId::global("EDW.SRC"), NodeId::global("MART.OUT"))];
    let operations: Vec<(String, usize)> = edge
        .operations
        .iter()
        .map(|operation| (operation.script.clone(), operation.index))
        .collect();
    assert_eq!(
        operations,
        [("a.sql".to_owned(), 0), ("b.sql".to_owned(), 0)]
    );
    assert_eq!(graph.edges.len(), 1);
}

#[test]
fn test_local_volatile_shadows_global_name() {
    let a = lineage(
        "a.sql",
        "CREATE VOLATILE TABLE lookup AS (SELECT * FROM edw.dim);\n\
         INSERT INTO mart.f SELECT * FROM lookup;",
    );
    let b = lineage("b.sql", "INSERT INTO mart.g SELECT * FROM lookup;");
    let graph = consolidate(&[a, b]);

    // a.sql's references resolve to its own volatile table, b.sql's to the
    // global name it materialized itself.
    assert!(graph
        .edges
        .contains_key(&(NodeId::volatile("a.sql", "LOOKUP"), NodeId::global("MART.F"))));
    assert!(graph
        .edges
        .contains_key(&(NodeId::global("LOOKUP"), NodeId::global("MART.G"))));
}

fn handmade(script: &str, tables: IndexMap<String, TableEntry>) -> ScriptLineage {
    ScriptLineage {
        script_name: script.to_owned(),
        statements: vec![],
        tables,
        warnings: vec![],
    }
}

#[test]
fn test_unresolved_reference_gets_placeholder_and_warning() {
    let mut tables = IndexMap::new();
    tables.insert(
        "OUT_TBL".to_owned(),
        TableEntry {
            source: vec![RelatedTable {
                name: "MYSTERY".to_owned(),
                operations: vec![0],
            }],
            ..Default::default()
        },
    );
    let graph = consolidate(&[handmade("x.sql", tables)]);

    let placeholder = &graph.nodes[&NodeId::global("MYSTERY")];
    assert!(placeholder.owners.is_empty());
    assert!(graph
        .edges
        .contains_key(&(NodeId::global("MYSTERY"), NodeId::global("OUT_TBL"))));
    assert_eq!(
        graph.warnings,
        [Warning::ResolutionGap {
            script: "x.sql".to_owned(),
            table: "MYSTERY".to_owned(),
        }]
    );
}

#[test]
fn test_cross_script_resolution_falls_back_to_name_index() {
    // a.sql declares the volatile table; b.sql references it without a local
    // entry of its own, so the name index resolves it to a.sql's node.
    let a = lineage(
        "a.sql",
        "CREATE VOLATILE TABLE handoff AS (SELECT * FROM edw.src);",
    );
    let mut tables = IndexMap::new();
    tables.insert(
        "MART.SINK".to_owned(),
        TableEntry {
            source: vec![RelatedTable {
                name: "HANDOFF".to_owned(),
                operations: vec![0],
            }],
            ..Default::default()
        },
    );
    let graph = consolidate(&[a, handmade("b.sql", tables)]);

    assert!(graph
        .edges
        .contains_key(&(NodeId::volatile("a.sql", "HANDOFF"), NodeId::global("MART.SINK"))));
    assert!(graph.warnings.is_empty());
}

#[test]
fn test_malformed_document_is_skipped_not_fatal() {
    let good = lineage("good.sql", "INSERT INTO mart.out SELECT * FROM edw.src;");
    let bad = handmade("", IndexMap::new());
    let graph = consolidate(&[bad, good]);

    assert!(graph.nodes.contains_key(&NodeId::global("MART.OUT")));
    assert!(matches!(
        graph.warnings.as_slice(),
        [Warning::StructuralSkip { .. }]
    ));
}

#[test]
fn test_view_flag_ors_across_scripts() {
    let a = lineage(
        "a.sql",
        "CREATE VIEW reporting.v AS SELECT * FROM edw.src;",
    );
    let b = lineage("b.sql", "INSERT INTO mart.out SELECT * FROM reporting.v;");
    let graph = consolidate(&[b.clone(), a.clone()]);
    assert!(graph.nodes[&NodeId::global("REPORTING.V")].is_view);

    let graph = consolidate(&[a, b]);
    assert!(graph.nodes[&NodeId::global("REPORTING.V")].is_view);
}

#[test]
fn test_self_loop_from_correlated_update() {
    let graph = consolidate(&[lineage(
        "u.sql",
        "UPDATE t FROM acct.bal t, acct.delta d SET amount = d.amount WHERE t.id = d.id;",
    )]);
    assert!(graph
        .edges
        .contains_key(&(NodeId::global("ACCT.BAL"), NodeId::global("ACCT.BAL"))));
    assert!(graph
        .edges
        .contains_key(&(NodeId::global("ACCT.DELTA"), NodeId::global("ACCT.BAL"))));
}
