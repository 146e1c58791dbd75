//! Flatten extracted drugs into CSV rows
//!
//! Two layouts:
//! - [`Strategy::PerTarget`]: one row per (drug, target) with PubMed IDs
//!   joined into one field plus a count. A drug without targets still gets
//!   one row with target fields set to `N/A`.
//! - [`Strategy::PerDrug`]: one row per drug with target IDs and names
//!   joined into list columns. References are not carried.

use std::str::FromStr;

use anyhow::bail;
use drugline_core::TableRow;
use serde::{Deserialize, Serialize};

use crate::extract::{Drug, NOT_AVAILABLE, TargetRecord};

/// Separator for list-valued CSV fields
pub const LIST_SEPARATOR: &str = ";";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    #[default]
    PerTarget,
    PerDrug,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PerTarget => "per-target",
            Self::PerDrug => "per-drug",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "per-target" => Ok(Self::PerTarget),
            "per-drug" => Ok(Self::PerDrug),
            other => bail!("unknown strategy '{other}' (expected per-target or per-drug)"),
        }
    }
}

/// Row of the per-target layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetRow {
    pub drug: String,
    pub drugbank_id: String,
    pub smiles: String,
    pub pubchem_cid: String,
    pub pubchem_sid: String,
    pub target_id: String,
    pub target_name: String,
    pub uniprot_id: String,
    pub gene_name: String,
    pub pmids: String,
    pub pmid_count: usize,
}

impl TableRow for TargetRow {
    const HEADER: &'static [&'static str] = &[
        "Drug",
        "DrugBank ID",
        "SMILES",
        "PubChem CID",
        "PubChem SID",
        "Target ID",
        "Target Name",
        "UniProt ID",
        "Gene Name",
        "PMIDs",
        "PMID Count",
    ];
}

/// Row of the per-drug layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrugRow {
    pub drug: String,
    pub drugbank_id: String,
    pub smiles: String,
    pub pubchem_cid: String,
    pub pubchem_sid: String,
    pub target_ids: String,
    pub target_names: String,
    pub target_count: usize,
}

impl TableRow for DrugRow {
    const HEADER: &'static [&'static str] = &[
        "Drug",
        "DrugBank ID",
        "SMILES",
        "PubChem CID",
        "PubChem SID",
        "Target IDs",
        "Target Names",
        "Target Count",
    ];
}

fn target_row(drug: &Drug, target: &TargetRecord, references: &[String]) -> TargetRow {
    TargetRow {
        drug: drug.name.clone(),
        drugbank_id: drug.drugbank_id.clone(),
        smiles: drug.smiles.clone(),
        pubchem_cid: drug.pubchem_cid.clone(),
        pubchem_sid: drug.pubchem_sid.clone(),
        target_id: target.id.clone(),
        target_name: target.name.clone(),
        uniprot_id: target.uniprot_id.clone(),
        gene_name: target.gene_name.clone(),
        pmids: references.join(LIST_SEPARATOR),
        pmid_count: references.len(),
    }
}

/// Per-target rows for one drug, in target document order.
pub fn flatten(drug: &Drug) -> Vec<TargetRow> {
    if drug.targets.is_empty() {
        let placeholder = TargetRecord {
            id: NOT_AVAILABLE.to_string(),
            name: NOT_AVAILABLE.to_string(),
            uniprot_id: NOT_AVAILABLE.to_string(),
            gene_name: NOT_AVAILABLE.to_string(),
        };
        return vec![target_row(drug, &placeholder, &[])];
    }

    drug.targets
        .iter()
        .map(|t| target_row(drug, &t.record, &t.references))
        .collect()
}

fn join_targets(drug: &Drug, field: fn(&TargetRecord) -> &str) -> String {
    drug.targets
        .iter()
        .map(|t| field(&t.record))
        .collect::<Vec<_>>()
        .join(LIST_SEPARATOR)
}

/// Single per-drug row with target lists.
pub fn flatten_per_drug(drug: &Drug) -> DrugRow {
    DrugRow {
        drug: drug.name.clone(),
        drugbank_id: drug.drugbank_id.clone(),
        smiles: drug.smiles.clone(),
        pubchem_cid: drug.pubchem_cid.clone(),
        pubchem_sid: drug.pubchem_sid.clone(),
        target_ids: join_targets(drug, |r| r.id.as_str()),
        target_names: join_targets(drug, |r| r.name.as_str()),
        target_count: drug.targets.len(),
    }
}
