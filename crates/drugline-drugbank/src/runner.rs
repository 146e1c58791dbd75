//! Main runner: read → parse → extract → flatten → write

use std::time::{Duration, Instant};

use anyhow::Result;
use drugline_core::{ConvertError, CsvSink, ProgressContext, TableRow, fmt_num, read_input};
use indicatif::ProgressBar;

use crate::config::Config;
use crate::extract::{Drug, ExtractOptions, extract_drug};
use crate::flatten::{Strategy, flatten, flatten_per_drug};
use crate::parser::{Element, parse_document};

/// Conversion summary
#[derive(Debug, Default)]
pub struct Summary {
    pub drugs: usize,
    pub drugs_without_targets: usize,
    pub targets: usize,
    pub references: usize,
    pub rows: usize,
    pub elapsed: Duration,
}

impl Summary {
    fn record(&mut self, drug: &Drug) {
        self.drugs += 1;
        self.targets += drug.targets.len();
        self.references += drug.reference_count();
        if drug.targets.is_empty() {
            self.drugs_without_targets += 1;
        }
    }
}

/// Run one conversion.
///
/// Fatal failures surface as [`ConvertError`] inside the returned
/// `anyhow::Error`; the output file only appears once every row is written.
pub fn run(config: &Config, progress: &ProgressContext) -> Result<Summary> {
    let start = Instant::now();

    log::info!("Reading {}", config.input.display());
    let xml = read_input(&config.input)?;

    let doc = parse_document(&xml).map_err(|e| ConvertError::Parse {
        path: config.input.clone(),
        message: format!("{e:#}"),
    })?;
    drop(xml);

    let drugs: Vec<&Element> = doc.drugs().collect();
    if drugs.is_empty() {
        log::warn!(
            "{}: no <drug> elements in the DrugBank namespace",
            config.input.display()
        );
    } else {
        log::info!("Found {} drugs", fmt_num(drugs.len()));
    }

    let options = config.extract_options();
    let pb = progress.drug_bar(drugs.len());
    let mut summary = Summary::default();

    let rows = match config.strategy {
        Strategy::PerTarget => write_rows(&drugs, config, &options, &pb, &mut summary, flatten)?,
        Strategy::PerDrug => write_rows(&drugs, config, &options, &pb, &mut summary, |d| {
            vec![flatten_per_drug(d)]
        })?,
    };
    pb.finish_and_clear();

    summary.rows = rows;
    summary.elapsed = start.elapsed();

    log::info!("=== DrugBank Conversion Summary ===");
    log::info!(
        "Drugs: {} ({} without targets)",
        fmt_num(summary.drugs),
        fmt_num(summary.drugs_without_targets)
    );
    log::info!(
        "Targets: {}, references: {}",
        fmt_num(summary.targets),
        fmt_num(summary.references)
    );
    log::info!(
        "Rows: {} ({}) -> {}",
        fmt_num(summary.rows),
        config.strategy,
        config.output.display()
    );
    log::info!("Time: {:.1}s", summary.elapsed.as_secs_f64());

    Ok(summary)
}

/// Extract, flatten, and write every drug; returns rows written.
fn write_rows<R: TableRow>(
    drugs: &[&Element],
    config: &Config,
    options: &ExtractOptions,
    pb: &ProgressBar,
    summary: &mut Summary,
    to_rows: impl Fn(&Drug) -> Vec<R>,
) -> Result<usize, ConvertError> {
    let mut sink = CsvSink::<R>::create(&config.output)?;

    for element in drugs {
        let drug = extract_drug(element, options);
        summary.record(&drug);
        for row in to_rows(&drug) {
            sink.write_row(&row)?;
        }
        pb.inc(1);
    }

    let rows = sink.finalize()?;
    log::debug!("{}: {} rows finalized", config.output.display(), rows);
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TWO_DRUGS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<drugbank xmlns="http://www.drugbank.ca">
  <drug>
    <drugbank-id primary="true">DB00001</drugbank-id>
    <name>Lepirudin</name>
    <targets>
      <target>
        <id>BE0000048</id>
        <name>Prothrombin</name>
        <references><articles>
          <article><pubmed-id>10505536</pubmed-id></article>
        </articles></references>
        <polypeptide id="P00734"><gene-name>F2</gene-name></polypeptide>
      </target>
      <target><id>BE0000049</id><name>Other</name></target>
    </targets>
  </drug>
  <drug>
    <drugbank-id primary="true">DB00002</drugbank-id>
    <name>Cetuximab</name>
  </drug>
</drugbank>"#;

    fn setup(xml: &str, strategy: Strategy) -> (TempDir, Config) {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("drugbank.xml");
        std::fs::write(&input, xml).unwrap();
        let config = Config {
            input,
            output: dir.path().join("out.csv"),
            strategy,
            id_prefix: None,
        };
        (dir, config)
    }

    #[test]
    fn per_target_summary() {
        let (_dir, config) = setup(TWO_DRUGS, Strategy::PerTarget);
        let summary = run(&config, &ProgressContext::hidden()).unwrap();

        assert_eq!(summary.drugs, 2);
        assert_eq!(summary.drugs_without_targets, 1);
        assert_eq!(summary.targets, 2);
        assert_eq!(summary.references, 1);
        assert_eq!(summary.rows, 3);
        assert!(config.output.exists());
    }

    #[test]
    fn per_drug_summary() {
        let (_dir, config) = setup(TWO_DRUGS, Strategy::PerDrug);
        let summary = run(&config, &ProgressContext::hidden()).unwrap();
        assert_eq!(summary.rows, 2);
    }

    #[test]
    fn malformed_xml_leaves_no_output() {
        let (_dir, config) = setup(
            r#"<drugbank xmlns="http://www.drugbank.ca"><drug>"#,
            Strategy::PerTarget,
        );
        let err = run(&config, &ProgressContext::hidden()).unwrap_err();

        let convert = err.downcast_ref::<ConvertError>().unwrap();
        assert!(matches!(convert, ConvertError::Parse { .. }));
        assert_eq!(convert.path(), config.input.as_path());
        assert!(!config.output.exists());
    }

    #[test]
    fn declared_latin1_input_converts() {
        let (_dir, config) = setup("", Strategy::PerTarget);
        let mut xml = br#"<?xml version="1.0" encoding="ISO-8859-1"?>
<drugbank xmlns="http://www.drugbank.ca"><drug>
  <drugbank-id primary="true">DB00201</drugbank-id>
  <name>Caf"#
            .to_vec();
        xml.push(0xe9);
        xml.extend_from_slice(b"ine</name></drug></drugbank>");
        std::fs::write(&config.input, xml).unwrap();

        let summary = run(&config, &ProgressContext::hidden()).unwrap();
        assert_eq!(summary.drugs, 1);

        let text = std::fs::read_to_string(&config.output).unwrap();
        assert!(text.contains("Caf\u{e9}ine,DB00201,"));
    }

    #[test]
    fn undecodable_input_is_parse_error() {
        let (_dir, config) = setup("", Strategy::PerTarget);
        std::fs::write(&config.input, b"<drugbank><name>\xff\xfe</name></drugbank>").unwrap();

        let err = run(&config, &ProgressContext::hidden()).unwrap_err();
        let convert = err.downcast_ref::<ConvertError>().unwrap();
        assert!(matches!(convert, ConvertError::Parse { .. }));
        assert_eq!(convert.exit_code(), 65);
        assert!(!config.output.exists());
    }

    #[test]
    fn missing_input_is_read_error() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            input: dir.path().join("absent.xml"),
            output: dir.path().join("out.csv"),
            ..Default::default()
        };
        let err = run(&config, &ProgressContext::hidden()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConvertError>(),
            Some(ConvertError::Read { .. })
        ));
        assert!(!config.output.exists());
    }

    #[test]
    fn empty_drugbank_writes_header_only() {
        let (_dir, config) = setup(
            r#"<drugbank xmlns="http://www.drugbank.ca"/>"#,
            Strategy::PerTarget,
        );
        let summary = run(&config, &ProgressContext::hidden()).unwrap();
        assert_eq!(summary.rows, 0);

        let text = std::fs::read_to_string(&config.output).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("Drug,DrugBank ID,"));
    }
}
