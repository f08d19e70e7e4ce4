//! End-to-end search over a CSV table, as run by the CLI.
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::SearchConfig;
use crate::data_handling::FitParams;
use crate::feature_selection::selector::FeatureSelector;
use crate::io::{read_csv_dataset, CsvData, CsvReaderConfig};
use crate::report::SelectionReport;

/// Fit the configured search on already loaded data.
pub fn run_search(config: &SearchConfig, data: &CsvData) -> Result<FeatureSelector> {
    let mut selector = config
        .build_selector(&data.dataset)
        .context("Invalid search configuration")?;
    selector
        .fit(&data.dataset, &data.y, data.groups.as_deref(), &FitParams::default())
        .context("Feature selection failed")?;
    Ok(selector)
}

/// Load `data_path`, fit the search and summarize it.
pub fn run_search_on_file<P: AsRef<Path>>(
    config: &SearchConfig,
    data_path: P,
    reader: &CsvReaderConfig,
    confidence: f64,
) -> Result<SelectionReport> {
    let data = read_csv_dataset(data_path, reader)?;
    let selector = run_search(config, &data)?;
    let report = SelectionReport::from_selector(&selector, confidence)?;
    log::info!(
        "Best state {} ({}) with score {:.6}",
        report.best_state,
        report.best_feature_names.join(", "),
        report.best_score
    );
    Ok(report)
}

/// Write the report as pretty JSON to `output`, or stdout when `None`.
pub fn write_report(report: &SelectionReport, output: Option<&Path>) -> Result<()> {
    let mut writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create output file: {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    serde_json::to_writer_pretty(&mut writer, report).context("Failed to serialize report")?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
