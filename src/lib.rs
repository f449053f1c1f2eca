//! testgen - Canvas conformance test generator
//!
//! This library turns declarative YAML test descriptions into ready-to-run
//! conformance tests for the three canvas execution contexts:
//! - Expand variant dimensions into per-file and in-file (grid) variants
//! - Rewrite `@...` assertion annotations into plain harness calls
//! - Render templates and raster fixtures and write the output tree

pub mod cli;
pub mod driver;
pub mod error;
pub mod expand;
pub mod grid;
pub mod ledger;
pub mod macros;
pub mod params;
pub mod paths;
pub mod raster;
pub mod template;
pub mod templates;
pub mod variant;
