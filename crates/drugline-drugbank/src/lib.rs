//! Drugline DrugBank - DrugBank XML to CSV converter
//!
//! Loads a DrugBank export into an element tree, extracts drug and target
//! fields with per-field defaults, flattens them into rows, and writes CSV.
//!
//! # Example
//!
//! ```ignore
//! use drugline_drugbank::{Config, run};
//! use drugline_core::ProgressContext;
//!
//! let config = Config {
//!     input: "drugbank.xml".into(),
//!     output: "targets.csv".into(),
//!     ..Default::default()
//! };
//!
//! let summary = run(&config, &ProgressContext::hidden())?;
//! println!("Wrote {} rows", summary.rows);
//! ```

pub mod config;
pub mod extract;
pub mod flatten;
pub mod parser;
pub mod runner;

// Re-exports
pub use config::Config;
pub use extract::{Drug, ExtractOptions, IdPrefix, Target, TargetRecord, extract_all, extract_drug};
pub use flatten::{DrugRow, Strategy, TargetRow, flatten, flatten_per_drug};
pub use parser::{Document, Element, parse_document};
pub use runner::{Summary, run};
