#![doc = include_str!("../README.md")]

pub mod analyzer;
pub mod annotation;
pub mod cli;
pub mod concat;
pub mod counters;
pub mod error;
pub mod genotype;
pub mod input;
pub mod merge;
pub mod recode;
pub mod report;
pub mod smart_reader;
pub mod summarize;
pub mod summary;
pub mod summary_text;
pub mod validator;
pub mod variant;

pub use analyzer::{SummaryKind, VariantAnalyzer};
pub use annotation::{AnnotationSchema, Dialect};
pub use error::{Result, VcfQcError};
pub use genotype::GenotypeRecoder;
pub use recode::{RecodeConfig, RecodeOptions, RecodeStats, RecordRecoder, recode_vcf};
pub use summarize::{FileSummary, SummaryConfig, summarize_many, summarize_vcf};
pub use summary::{HistogramConfig, SampleSummary, VcfSummary};
