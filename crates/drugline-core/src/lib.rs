//! Drugline Core - Common infrastructure for the DrugBank table converter
//!
//! This crate provides the reusable pieces around extraction: reading
//! (optionally gzipped) input, writing CSV atomically, the fatal error
//! taxonomy, logging and progress display.

pub mod error;
pub mod logging;
pub mod progress;
pub mod sink;
pub mod source;

// Re-exports for convenience
pub use error::ConvertError;
pub use logging::{IndicatifLogger, init_logging};
pub use progress::{ProgressContext, fmt_num};
pub use sink::{CsvSink, TableRow, tmp_path_for};
pub use source::{decode_xml, is_gzip, read_input};
