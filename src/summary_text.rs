//! Sectioned, tab-delimited text form of a [`VcfSummary`].
//!
//! ```text
//! #COUNTS
//! Sample  Missing GT  Called GT  ...
//! S1      0           12         ...
//!
//! #DEPTH
//! Sample  0  1  ...  >500
//! ...
//! ```
//!
//! Sections appear in the order COUNTS, DEPTH, QUAL, AAFS, INSERT_LEN,
//! DELETE_LEN, separated by a blank line.

use std::{
    collections::HashSet,
    fmt::{self, Write as _},
    fs,
    path::Path,
    str::FromStr,
};

use anyhow::{Context, Result as AnyResult};

use crate::counters::CounterRegistry;
use crate::error::{Result, VcfQcError};
use crate::summary::{Histogram, HistogramConfig, VcfSummary};

const COUNTS_MARKER: &str = "#COUNTS";
const SAMPLE_COLUMN: &str = "Sample";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Counts,
    Histogram(Histogram),
}

impl Section {
    const ALL: [Section; 6] = [
        Section::Counts,
        Section::Histogram(Histogram::Depth),
        Section::Histogram(Histogram::Qual),
        Section::Histogram(Histogram::AlleleFrequency),
        Section::Histogram(Histogram::InsertLength),
        Section::Histogram(Histogram::DeleteLength),
    ];

    fn marker(self) -> &'static str {
        match self {
            Section::Counts => COUNTS_MARKER,
            Section::Histogram(Histogram::Depth) => "#DEPTH",
            Section::Histogram(Histogram::Qual) => "#QUAL",
            Section::Histogram(Histogram::AlleleFrequency) => "#AAFS",
            Section::Histogram(Histogram::InsertLength) => "#INSERT_LEN",
            Section::Histogram(Histogram::DeleteLength) => "#DELETE_LEN",
        }
    }

    fn from_marker(line: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|section| section.marker() == line)
    }
}

/// Column labels of a histogram section. Bounded histograms end with the
/// saturating `>max` label; the spectrum uses lower bin edges.
pub fn histogram_labels(kind: Histogram, config: &HistogramConfig) -> Vec<String> {
    match kind.bound(config) {
        Some(max) => (0..max)
            .map(|i| i.to_string())
            .chain(std::iter::once(format!(">{max}")))
            .collect(),
        None => {
            let bins = config.num_afs_bins;
            (0..bins).map(|i| (i as f64 / bins as f64).to_string()).collect()
        }
    }
}

impl fmt::Display for VcfSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, section) in Section::ALL.into_iter().enumerate() {
            if i > 0 {
                f.write_char('\n')?;
            }
            writeln!(f, "{}", section.marker())?;

            let labels = match section {
                Section::Counts => self.counter_names().to_vec(),
                Section::Histogram(kind) => histogram_labels(kind, self.config()),
            };
            write_row(f, SAMPLE_COLUMN, labels.iter())?;

            for name in self.sample_names() {
                let Some(sample) = self.sample(name) else {
                    continue;
                };
                let values = match section {
                    Section::Counts => sample.counts(),
                    Section::Histogram(kind) => sample.histogram(kind),
                };
                write_row(f, name, values.iter())?;
            }
        }
        Ok(())
    }
}

fn write_row<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    first: &str,
    rest: impl Iterator<Item = T>,
) -> fmt::Result {
    f.write_str(first)?;
    for cell in rest {
        write!(f, "\t{cell}")?;
    }
    f.write_char('\n')
}

#[derive(Debug)]
enum LineKind {
    Header,
    Row,
}

#[derive(Debug)]
struct Line<'a> {
    number: usize,
    section: Section,
    kind: LineKind,
    cells: Vec<&'a str>,
}

fn format_error(number: usize, message: impl fmt::Display) -> VcfQcError {
    VcfQcError::format(format!("summary line {number}: {message}"))
}

/// Attach a section and a header/row role to every non-blank line.
fn scan(text: &str) -> Result<Vec<Line<'_>>> {
    let mut lines = Vec::new();
    let mut section = None;
    let mut seen = HashSet::new();
    let mut expect_header = false;

    for (index, raw) in text.lines().enumerate() {
        let number = index + 1;
        let raw = raw.trim_end_matches('\r');
        if raw.trim().is_empty() {
            continue;
        }

        // Sample names may start with '#', so only the exact markers open a section.
        if let Some(next) = Section::from_marker(raw.trim_end()) {
            if !seen.insert(next.marker()) {
                return Err(format_error(
                    number,
                    format!("duplicate section {}", next.marker()),
                ));
            }
            section = Some(next);
            expect_header = true;
            continue;
        }

        let Some(current) = section else {
            return Err(format_error(number, "data before the first section marker"));
        };
        let cells: Vec<&str> = raw.split('\t').collect();

        let kind = if expect_header {
            expect_header = false;
            if cells[0] != SAMPLE_COLUMN {
                return Err(format_error(
                    number,
                    format!("section header must start with '{SAMPLE_COLUMN}'"),
                ));
            }
            LineKind::Header
        } else {
            LineKind::Row
        };

        lines.push(Line {
            number,
            section: current,
            kind,
            cells,
        });
    }

    Ok(lines)
}

/// Structural parameters recovered by the first pass.
#[derive(Debug, Default)]
struct Layout {
    counter_names: Option<Vec<String>>,
    sample_names: Vec<String>,
    max_depth: Option<usize>,
    max_qual: Option<usize>,
    num_afs_bins: Option<usize>,
    max_insert_len: Option<usize>,
    max_delete_len: Option<usize>,
}

impl Layout {
    fn recover(lines: &[Line<'_>]) -> Result<Self> {
        let mut layout = Layout::default();
        let mut samples = HashSet::new();

        for line in lines {
            let labels = &line.cells[1..];
            match (line.section, &line.kind) {
                (Section::Counts, LineKind::Header) => {
                    let mut unique = HashSet::new();
                    if let Some(dup) = labels.iter().find(|name| !unique.insert(**name)) {
                        return Err(format_error(line.number, format!("duplicate counter '{dup}'")));
                    }
                    layout.counter_names = Some(labels.iter().map(|s| s.to_string()).collect());
                }
                (Section::Counts, LineKind::Row) => {
                    let name = line.cells[0];
                    if !samples.insert(name) {
                        return Err(format_error(line.number, format!("duplicate sample '{name}'")));
                    }
                    layout.sample_names.push(name.to_string());
                }
                (Section::Histogram(kind), LineKind::Header) => {
                    let slot = match kind {
                        Histogram::AlleleFrequency => {
                            layout.num_afs_bins = Some(labels.len());
                            continue;
                        }
                        Histogram::Depth => &mut layout.max_depth,
                        Histogram::Qual => &mut layout.max_qual,
                        Histogram::InsertLength => &mut layout.max_insert_len,
                        Histogram::DeleteLength => &mut layout.max_delete_len,
                    };
                    *slot = Some(saturating_bound(line.number, labels)?);
                }
                (Section::Histogram(_), LineKind::Row) => {}
            }
        }

        Ok(layout)
    }

    fn finish(self) -> Result<(Vec<String>, Vec<String>, HistogramConfig)> {
        let missing: Vec<&str> = [
            ("counter names", self.counter_names.is_none()),
            ("max depth", self.max_depth.is_none()),
            ("max qual", self.max_qual.is_none()),
            ("AAFS bin count", self.num_afs_bins.is_none()),
            ("max insert length", self.max_insert_len.is_none()),
            ("max deletion length", self.max_delete_len.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();

        let (
            Some(counter_names),
            Some(max_depth),
            Some(max_qual),
            Some(num_afs_bins),
            Some(max_insert_len),
            Some(max_delete_len),
        ) = (
            self.counter_names,
            self.max_depth,
            self.max_qual,
            self.num_afs_bins,
            self.max_insert_len,
            self.max_delete_len,
        )
        else {
            return Err(VcfQcError::format(format!(
                "summary is missing required sections: {}",
                missing.join(", ")
            )));
        };

        if max_insert_len != max_delete_len {
            return Err(VcfQcError::format(format!(
                "insert and deletion length bounds differ: {max_insert_len} vs. {max_delete_len}"
            )));
        }

        let config = HistogramConfig {
            max_depth,
            max_qual,
            max_indel_len: max_insert_len,
            num_afs_bins,
        };
        Ok((self.sample_names, counter_names, config))
    }
}

/// `>N` as the last label means bins `0..=N`.
fn saturating_bound(number: usize, labels: &[&str]) -> Result<usize> {
    let last = labels
        .last()
        .ok_or_else(|| format_error(number, "histogram header has no labels"))?;
    let max = last
        .strip_prefix('>')
        .and_then(|n| n.parse::<usize>().ok())
        .ok_or_else(|| {
            format_error(number, format!("last histogram label '{last}' is not of the form >N"))
        })?;
    if max.checked_add(1) != Some(labels.len()) {
        return Err(format_error(
            number,
            format!("expected labels 0..={max}, found {} labels", labels.len()),
        ));
    }
    Ok(max)
}

/// Parse the text form back into a summary.
pub fn parse_summary(text: &str) -> Result<VcfSummary> {
    let lines = scan(text)?;
    let (sample_names, counter_names, config) = Layout::recover(&lines)?.finish()?;

    let mut summary = VcfSummary::with_counters(
        sample_names,
        config,
        CounterRegistry::with_names(counter_names),
    );

    for line in lines.iter().filter(|l| matches!(l.kind, LineKind::Row)) {
        let name = line.cells[0];
        let values = line.cells[1..]
            .iter()
            .map(|cell| {
                cell.trim().parse::<u64>().map_err(|_| {
                    format_error(line.number, format!("'{cell}' is not a non-negative integer"))
                })
            })
            .collect::<Result<Vec<u64>>>()?;

        let sample = summary.sample_mut(name).ok_or_else(|| {
            format_error(line.number, format!("sample '{name}' is not listed in {COUNTS_MARKER}"))
        })?;
        let target = match line.section {
            Section::Counts => sample.counts_mut(),
            Section::Histogram(kind) => sample.histogram_mut(kind),
        };
        if target.len() != values.len() {
            return Err(format_error(
                line.number,
                format!("expected {} values, found {}", target.len(), values.len()),
            ));
        }
        target.copy_from_slice(&values);
    }

    tracing::debug!(
        samples = summary.len(),
        counters = summary.counter_names().len(),
        "parsed summary"
    );
    Ok(summary)
}

impl FromStr for VcfSummary {
    type Err = VcfQcError;

    fn from_str(s: &str) -> Result<Self> {
        parse_summary(s)
    }
}

pub fn read_summary(path: &Path) -> AnyResult<VcfSummary> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read summary {}", path.display()))?;
    parse_summary(&text).with_context(|| format!("invalid summary file {}", path.display()))
}

pub fn write_summary(summary: &VcfSummary, path: &Path) -> AnyResult<()> {
    fs::write(path, summary.to_string())
        .with_context(|| format!("failed to write summary {}", path.display()))?;
    tracing::info!(path = %path.display(), samples = summary.len(), "wrote summary");
    Ok(())
}
