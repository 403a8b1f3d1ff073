//! Structured run report for downstream tool consumption.
//!
//! Writes a JSON file alongside the output describing the run: inputs,
//! detected annotation dialect, samples and statistics.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::annotation::Dialect;
use crate::recode::{RecodeOptions, RecodeStats};
use crate::summary::HistogramConfig;

/// Complete report of a recode or summarize run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Tool version
    pub version: String,
    /// Timestamp of run (RFC 3339)
    pub timestamp: String,
    pub command: String,

    pub inputs: Vec<String>,
    pub output: String,

    pub dialect: Dialect,
    pub samples: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub recode: Option<RecodeSettings>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub histograms: Option<HistogramConfig>,

    pub statistics: Statistics,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecodeSettings {
    pub min_call_depth: u32,
    pub missing_data_char: String,
    pub missing_gt_char: String,
    pub multiallelic: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info_columns: Option<Vec<String>>,
}

impl From<&RecodeOptions> for RecodeSettings {
    fn from(o: &RecodeOptions) -> Self {
        RecodeSettings {
            min_call_depth: o.min_call_depth,
            missing_data_char: o.missing_data.clone(),
            missing_gt_char: o.missing_gt.clone(),
            multiallelic: o.multiallelic,
            info_columns: o.info_columns.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Statistics {
    pub total_records: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emitted_rows: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation_columns: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counters: Option<usize>,
}

impl RunReport {
    fn new(command: &str, inputs: &[PathBuf], output: &Path) -> Self {
        let now = time::OffsetDateTime::now_utc();
        let timestamp = now
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "unknown".to_string());

        RunReport {
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp,
            command: command.to_string(),
            inputs: inputs.iter().map(|p| p.display().to_string()).collect(),
            output: output.display().to_string(),
            dialect: Dialect::Unknown,
            samples: 0,
            recode: None,
            histograms: None,
            statistics: Statistics::default(),
        }
    }

    pub fn for_recode(
        input: &Path,
        output: &Path,
        options: &RecodeOptions,
        stats: &RecodeStats,
    ) -> Self {
        let mut report = Self::new("recode", &[input.to_path_buf()], output);
        report.dialect = stats.dialect;
        report.samples = stats.samples;
        report.recode = Some(RecodeSettings::from(options));
        report.statistics = Statistics {
            total_records: stats.total_records,
            emitted_rows: Some(stats.emitted_rows),
            annotation_columns: Some(stats.annotation_columns),
            counters: None,
        };
        report
    }

    pub fn for_summary(
        inputs: &[PathBuf],
        output: &Path,
        dialect: Dialect,
        histograms: HistogramConfig,
        samples: usize,
        total_records: usize,
        counters: usize,
    ) -> Self {
        let mut report = Self::new("summarize", inputs, output);
        report.dialect = dialect;
        report.samples = samples;
        report.histograms = Some(histograms);
        report.statistics = Statistics {
            total_records,
            counters: Some(counters),
            ..Statistics::default()
        };
        report
    }

    /// Path of the report for `output_path`: out.tsv -> out_report.json
    pub fn path_for(output_path: &Path) -> PathBuf {
        let stem = output_path
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy();
        output_path.with_file_name(format!("{}_report.json", stem))
    }

    /// Write the report as JSON to a file alongside the output.
    pub fn write(&self, output_path: &Path) -> std::io::Result<()> {
        let report_path = Self::path_for(output_path);

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        std::fs::write(&report_path, json)?;
        tracing::info!("Wrote run report to {}", report_path.display());

        Ok(())
    }
}
