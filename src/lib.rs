//! # etlin
//!
//! A library for recovering table-level data-flow lineage from ETL artifacts
//! and answering impact-analysis queries over the consolidated lineage graph.
//!
//! # Features
//!
//! - Slice SQL out of BTEQ-style shell heredoc blocks or standalone SQL
//!   files, and segment it into statements with 1-based line anchors.
//! - Classify statements and extract per-statement source/target tables with
//!   two combined strategies: a clause-walking tokenizer and a
//!   pattern-matching fallback.
//! - Aggregate statement relations into one `ScriptLineage` document per
//!   input file, with symmetric per-table source/target bookkeeping.
//! - Consolidate any number of scripts into a single graph, scoping volatile
//!   tables per script while unifying persistent tables globally, in an
//!   order-independent two-pass merge.
//! - Answer direct/impacts/impacted-by/both reachability queries, optionally
//!   restricted to a set of owning scripts.
//!
//! # Example
//!
//! ```rust,no_run
//! use etlin::graph::consolidate;
//! use etlin::query::{ReachMode, query};
//! use etlin::script::build_script_lineage;
//! use etlin::segment::FileKind;
//!
//! fn main() {
//!     env_logger::init();
//!
//!     let sql = r#"
//!         CREATE VOLATILE TABLE staging AS (
//!             SELECT * FROM source.orders
//!         ) WITH DATA;
//!
//!         INSERT INTO warehouse.orders
//!         SELECT * FROM staging;
//!     "#;
//!
//!     let lineage = build_script_lineage(sql, FileKind::Sql, "load_orders.sql");
//!     let graph = consolidate(&[lineage]);
//!
//!     let view = query(
//!         &graph,
//!         &["WAREHOUSE.ORDERS".to_owned()],
//!         ReachMode::ImpactedBy,
//!         None,
//!     );
//!     for node in &view.nodes {
//!         println!("{} ({:?})", node.id, node.role);
//!     }
//! }
//! ```
pub mod extract;
pub mod graph;
pub mod query;
pub mod script;
pub mod segment;
pub mod warning;
