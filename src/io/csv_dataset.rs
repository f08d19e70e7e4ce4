//! Delimited text reader for labelled feature tables.
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use csv::StringRecord;
use ndarray::{Array1, Array2};

use crate::data_handling::Dataset;

/// Parsed table ready for a search.
#[derive(Debug)]
pub struct CsvData {
    pub dataset: Dataset,
    pub y: Array1<f64>,
    pub groups: Option<Vec<i64>>,
}

/// Configuration for reading a feature table.
#[derive(Debug, Clone)]
pub struct CsvReaderConfig {
    pub delimiter: u8,
    /// Column holding the target values.
    pub label_column: String,
    /// Optional integer column used for grouped cross-validation.
    pub group_column: Option<String>,
    /// Optional list of feature columns to load (in order).
    /// When `None`, every column other than the label and group columns is a feature.
    pub feature_columns: Option<Vec<String>>,
    /// Columns to ignore when auto-selecting features.
    pub ignore_columns: Vec<String>,
}

impl Default for CsvReaderConfig {
    fn default() -> Self {
        Self {
            delimiter: b',',
            label_column: "y".to_string(),
            group_column: None,
            feature_columns: None,
            ignore_columns: Vec::new(),
        }
    }
}

/// Read a delimited file with a header row into a label-identified `Dataset`.
pub fn read_csv_dataset<P: AsRef<Path>>(path: P, config: &CsvReaderConfig) -> Result<CsvData> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(config.delimiter)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(&path)
        .with_context(|| format!("Failed to open data file: {}", path.as_ref().display()))?;

    let headers = reader
        .headers()
        .context("Failed to read header row")?
        .clone();

    let label_idx = find_column(&headers, &config.label_column)
        .ok_or_else(|| anyhow!("Missing label column '{}'", config.label_column))?;
    let group_idx = match &config.group_column {
        Some(name) => Some(find_column(&headers, name).ok_or_else(|| anyhow!("Missing group column '{}'", name))?),
        None => None,
    };

    let feature_indices = resolve_feature_indices(&headers, config, label_idx, group_idx)?;
    if feature_indices.is_empty() {
        return Err(anyhow!("No feature columns detected in header"));
    }

    let mut features = Vec::new();
    let mut labels = Vec::new();
    let mut groups = Vec::new();

    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read row {}", row_idx + 1))?;

        let label = record
            .get(label_idx)
            .ok_or_else(|| anyhow!("Missing label value at row {}", row_idx + 1))?
            .parse::<f64>()
            .with_context(|| format!("Invalid label at row {}", row_idx + 1))?;
        labels.push(label);

        if let Some(idx) = group_idx {
            let group = record
                .get(idx)
                .ok_or_else(|| anyhow!("Missing group value at row {}", row_idx + 1))?
                .parse::<i64>()
                .with_context(|| format!("Invalid group at row {}", row_idx + 1))?;
            groups.push(group);
        }

        for &idx in &feature_indices {
            let value = record
                .get(idx)
                .ok_or_else(|| anyhow!("Missing feature value at row {}", row_idx + 1))?;
            let parsed = parse_value(value).with_context(|| {
                format!(
                    "Invalid feature '{}' at row {}",
                    headers.get(idx).unwrap_or(""),
                    row_idx + 1
                )
            })?;
            features.push(parsed);
        }
    }

    let n_samples = labels.len();
    if n_samples == 0 {
        return Err(anyhow!("Data file {} has no rows", path.as_ref().display()));
    }
    let x = Array2::from_shape_vec((n_samples, feature_indices.len()), features)
        .context("Failed to build feature matrix")?;
    let feature_names = feature_indices
        .iter()
        .map(|&idx| headers.get(idx).unwrap_or("").to_string())
        .collect();
    let dataset = Dataset::with_labels(x, feature_names)?;

    log::debug!(
        "Read {} rows and {} feature columns from {}",
        n_samples,
        dataset.n_features(),
        path.as_ref().display()
    );

    Ok(CsvData {
        dataset,
        y: Array1::from_vec(labels),
        groups: group_idx.map(|_| groups),
    })
}

/// Empty cells and `NA`/`NaN` read as missing.
fn parse_value(value: &str) -> Result<f64> {
    if value.is_empty() || value.eq_ignore_ascii_case("na") || value.eq_ignore_ascii_case("nan") {
        return Ok(f64::NAN);
    }
    Ok(value.parse::<f64>()?)
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|header| header.eq_ignore_ascii_case(name))
}

fn resolve_feature_indices(
    headers: &StringRecord,
    config: &CsvReaderConfig,
    label_idx: usize,
    group_idx: Option<usize>,
) -> Result<Vec<usize>> {
    if let Some(names) = &config.feature_columns {
        let mut indices = Vec::with_capacity(names.len());
        for name in names {
            let idx = find_column(headers, name)
                .ok_or_else(|| anyhow!("Missing feature column '{}'", name))?;
            indices.push(idx);
        }
        return Ok(indices);
    }

    let indices = headers
        .iter()
        .enumerate()
        .filter(|&(idx, _)| idx != label_idx && Some(idx) != group_idx)
        .filter(|(_, header)| !config.ignore_columns.iter().any(|c| c.eq_ignore_ascii_case(header)))
        .map(|(idx, _)| idx)
        .collect();
    Ok(indices)
}
