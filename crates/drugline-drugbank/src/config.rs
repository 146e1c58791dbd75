//! DrugBank conversion configuration

use std::path::PathBuf;

use crate::extract::{ExtractOptions, IdPrefix};
use crate::flatten::Strategy;

/// Runtime configuration for one conversion run
#[derive(Debug, Clone)]
pub struct Config {
    /// DrugBank XML export (plain or gzip)
    pub input: PathBuf,
    /// CSV file to write
    pub output: PathBuf,
    /// Row layout
    pub strategy: Strategy,
    /// Prefix stripped from DrugBank IDs, if any
    pub id_prefix: Option<IdPrefix>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: PathBuf::from("drugbank.xml"),
            output: PathBuf::from("targets.csv"),
            strategy: Strategy::PerTarget,
            id_prefix: None,
        }
    }
}

impl Config {
    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            id_prefix: self.id_prefix.clone(),
        }
    }
}
