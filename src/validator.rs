//! Cheap line-based structural check run before any VCF is parsed.

use std::io::BufRead;
use std::path::Path;

use anyhow::{Context, Result};

pub const HEADER_FIELDS: [&str; 9] = [
    "CHROM", "POS", "ID", "REF", "ALT", "QUAL", "FILTER", "INFO", "FORMAT",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    FormatDeclaration,
    MetadataHeader,
    FirstRecord { samples: usize },
}

/// Checks the format declaration, the `##` metadata block, the fixed `#CHROM`
/// columns and the column count of the first record. Violations are logged
/// and reported as `false`; only I/O failures are errors.
pub fn is_valid_vcf(path: &Path) -> Result<bool> {
    let reader = crate::smart_reader::open_input(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let valid = validate_lines(reader)
        .with_context(|| format!("failed to read {}", path.display()))?;
    if valid {
        tracing::debug!(path = %path.display(), "VCF passed structural validation");
    }
    Ok(valid)
}

fn validate_lines<R: BufRead>(reader: R) -> std::io::Result<bool> {
    let mut state = State::FormatDeclaration;

    for line in reader.lines() {
        let line = line?;
        let line = line.trim_end_matches('\r');

        state = match state {
            State::FormatDeclaration => {
                if !line.starts_with("##fileformat=VCF") {
                    tracing::error!("first line of file doesn't look like '##fileformat=VCF'");
                    return Ok(false);
                }
                State::MetadataHeader
            }
            State::MetadataHeader => {
                if let Some(header) = line.strip_prefix("#CHROM") {
                    let columns: Vec<&str> = std::iter::once("CHROM")
                        .chain(header.split('\t').skip(1))
                        .collect();
                    let fixed = columns.len().min(HEADER_FIELDS.len());
                    if columns[..fixed] != HEADER_FIELDS[..] {
                        tracing::error!(
                            expected = %HEADER_FIELDS.join("\t"),
                            received = %columns[..fixed].join("\t"),
                            "invalid fixed column labels"
                        );
                        return Ok(false);
                    }
                    State::FirstRecord {
                        samples: columns.len() - HEADER_FIELDS.len(),
                    }
                } else if line.starts_with("##") {
                    State::MetadataHeader
                } else {
                    tracing::error!(line, "metadata header lines must begin with '##'");
                    return Ok(false);
                }
            }
            State::FirstRecord { samples } => {
                let expected = HEADER_FIELDS.len() + samples;
                let actual = line.split('\t').count();
                if actual != expected {
                    tracing::error!(
                        expected,
                        actual,
                        "first record does not have the same number of columns as the header"
                    );
                    return Ok(false);
                }
                return Ok(true);
            }
        };
    }

    match state {
        State::FirstRecord { .. } => Ok(true),
        State::FormatDeclaration => {
            tracing::error!("file is empty");
            Ok(false)
        }
        State::MetadataHeader => {
            tracing::error!("no #CHROM header line found");
            Ok(false)
        }
    }
}
