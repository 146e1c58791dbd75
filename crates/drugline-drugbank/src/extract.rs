//! Field extraction from parsed `<drug>` elements
//!
//! Every lookup is total: a missing container, element, attribute or empty
//! text falls back to a sentinel instead of failing. Sentinels by field kind:
//!
//! - identity and label fields (names, IDs, gene names): [`NOT_AVAILABLE`]
//! - optional looked-up properties (SMILES, PubChem IDs): empty string
//! - list fields (references): empty list

use std::str::FromStr;

use anyhow::{Result, bail};

use crate::parser::{Document, Element};

/// Sentinel for identity and label fields that are absent
pub const NOT_AVAILABLE: &str = "N/A";

/// `calculated-properties` kind holding the SMILES string
pub const KIND_SMILES: &str = "SMILES";
/// `external-identifiers` resource for PubChem compound IDs
pub const RESOURCE_PUBCHEM_COMPOUND: &str = "PubChem Compound";
/// `external-identifiers` resource for PubChem substance IDs
pub const RESOURCE_PUBCHEM_SUBSTANCE: &str = "PubChem Substance";

/// Fixed fields of one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRecord {
    pub id: String,
    pub name: String,
    pub uniprot_id: String,
    pub gene_name: String,
}

/// Target with its PubMed references in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub record: TargetRecord,
    pub references: Vec<String>,
}

/// Everything extracted from one `<drug>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drug {
    pub name: String,
    pub drugbank_id: String,
    pub smiles: String,
    pub pubchem_cid: String,
    pub pubchem_sid: String,
    pub targets: Vec<Target>,
}

impl Drug {
    pub fn reference_count(&self) -> usize {
        self.targets.iter().map(|t| t.references.len()).sum()
    }
}

/// Accession prefix removed from DrugBank IDs (e.g. `DB` in `DB00001`).
///
/// Stripping only happens when the ID actually starts with the prefix and
/// something is left afterwards; any other ID passes through unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdPrefix(String);

impl IdPrefix {
    pub fn new(prefix: &str) -> Result<Self> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            bail!("ID prefix must not be empty");
        }
        Ok(Self(prefix.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn strip<'a>(&self, id: &'a str) -> &'a str {
        match id.strip_prefix(self.0.as_str()) {
            Some(rest) if !rest.is_empty() => rest,
            _ => {
                if id != NOT_AVAILABLE {
                    log::debug!("{id}: no '{}' prefix, kept unchanged", self.0);
                }
                id
            }
        }
    }
}

impl FromStr for IdPrefix {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl std::fmt::Display for IdPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Knobs for [`extract_drug`].
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    pub id_prefix: Option<IdPrefix>,
}

fn or_not_available(value: Option<&str>) -> String {
    value.unwrap_or(NOT_AVAILABLE).to_string()
}

/// Value of the first `calculated-properties/property` whose kind is `kind`.
///
/// Empty string when the container, the property, or its value is missing.
pub fn extract_property(drug: &Element, kind: &str) -> String {
    drug.find_all(&["calculated-properties", "property"])
        .into_iter()
        .find(|p| p.child_text("kind") == Some(kind))
        .and_then(|p| p.child_text("value"))
        .unwrap_or_default()
        .to_string()
}

/// Identifier of the first `external-identifiers/external-identifier` whose
/// resource is `resource`. Empty string when absent.
pub fn extract_external_identifier(drug: &Element, resource: &str) -> String {
    drug.find_all(&["external-identifiers", "external-identifier"])
        .into_iter()
        .find(|e| e.child_text("resource") == Some(resource))
        .and_then(|e| e.child_text("identifier"))
        .unwrap_or_default()
        .to_string()
}

/// Drug display name.
pub fn extract_name(drug: &Element) -> String {
    or_not_available(drug.child_text("name"))
}

/// Primary DrugBank ID: the `drugbank-id` marked `primary="true"`, else the
/// first one listed. IDs with empty text are skipped.
pub fn extract_drugbank_id(drug: &Element, id_prefix: Option<&IdPrefix>) -> String {
    let ids = || {
        drug.children_named("drugbank-id")
            .filter_map(|e| e.text().map(|text| (e, text)))
    };
    let id = ids()
        .find(|(e, _)| e.attr("primary") == Some("true"))
        .or_else(|| ids().next())
        .map(|(_, text)| text);

    match (id, id_prefix) {
        (Some(id), Some(prefix)) => prefix.strip(id).to_string(),
        (id, _) => or_not_available(id),
    }
}

/// ID, name, and the UniProt ID / gene name carried by the first
/// `polypeptide` child.
pub fn extract_target_fields(target: &Element) -> TargetRecord {
    let polypeptide = target.child("polypeptide");

    TargetRecord {
        id: or_not_available(target.child_text("id")),
        name: or_not_available(target.child_text("name")),
        uniprot_id: or_not_available(
            polypeptide
                .and_then(|p| p.attr("id"))
                .map(str::trim)
                .filter(|id| !id.is_empty()),
        ),
        gene_name: or_not_available(polypeptide.and_then(|p| p.child_text("gene-name"))),
    }
}

/// PubMed IDs under `references/articles/article`, skipping articles with a
/// missing or empty `pubmed-id`.
pub fn extract_references(target: &Element) -> Vec<String> {
    target
        .find_all(&["references", "articles", "article"])
        .into_iter()
        .filter_map(|article| article.child_text("pubmed-id"))
        .map(str::to_string)
        .collect()
}

pub fn extract_target(target: &Element) -> Target {
    Target {
        record: extract_target_fields(target),
        references: extract_references(target),
    }
}

/// Extract one drug with all of its targets.
pub fn extract_drug(drug: &Element, options: &ExtractOptions) -> Drug {
    let extracted = Drug {
        name: extract_name(drug),
        drugbank_id: extract_drugbank_id(drug, options.id_prefix.as_ref()),
        smiles: extract_property(drug, KIND_SMILES),
        pubchem_cid: extract_external_identifier(drug, RESOURCE_PUBCHEM_COMPOUND),
        pubchem_sid: extract_external_identifier(drug, RESOURCE_PUBCHEM_SUBSTANCE),
        targets: drug
            .find_all(&["targets", "target"])
            .into_iter()
            .map(extract_target)
            .collect(),
    };

    if extracted.drugbank_id == NOT_AVAILABLE {
        log::debug!("Drug '{}' has no drugbank-id", extracted.name);
    }

    extracted
}

/// Extract every top-level drug in document order.
pub fn extract_all(doc: &Document, options: &ExtractOptions) -> Vec<Drug> {
    doc.drugs().map(|d| extract_drug(d, options)).collect()
}
