//! Error taxonomy shared by the recoding and summary pipelines.
//!
//! Every variant is fatal to the current run; callers log and propagate.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VcfQcError {
    /// Requested annotation columns are not declared by the file.
    #[error("annotation columns not declared in VCF: {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    /// Structural malformation of a VCF or a summary file.
    #[error("format error: {message}")]
    Format { message: String },

    #[error("multiallelic record at {chromosome}:{position} ({alleles} alternate alleles); split multiallelic sites first")]
    Multiallelic {
        chromosome: String,
        position: usize,
        alleles: usize,
    },

    #[error("cannot merge summaries: {reason}")]
    MergeIncompatible { reason: String },

    #[error("row for {chromosome}:{position} has {actual} cells but header has {expected}")]
    RowWidth {
        chromosome: String,
        position: usize,
        expected: usize,
        actual: usize,
    },

    /// Recoded tables with different columns cannot be concatenated.
    #[error("{file} does not have the same columns as {reference}")]
    HeaderMismatch { file: String, reference: String },

    #[error("counter '{0}' used before registration")]
    UnregisteredCounter(String),

    #[error("unknown sample '{0}'")]
    UnknownSample(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, VcfQcError>;

impl VcfQcError {
    pub fn format(message: impl Into<String>) -> Self {
        Self::Format {
            message: message.into(),
        }
    }

    pub fn merge(reason: impl Into<String>) -> Self {
        Self::MergeIncompatible {
            reason: reason.into(),
        }
    }
}
