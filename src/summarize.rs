//! Drives summaries: one VCF streamed through an analyzer, or many VCFs
//! summarized independently and merged.

use std::path::PathBuf;

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::analyzer::SummaryKind;
use crate::annotation::{AnnotationSchema, Dialect};
use crate::counters::CounterRegistry;
use crate::error::VcfQcError;
use crate::input::{VariantSource, VcfSource};
use crate::merge;
use crate::summary::{HistogramConfig, VcfSummary};

const PROGRESS_INTERVAL: usize = 100_000;

#[derive(Debug, Clone)]
pub struct SummaryConfig {
    pub input: PathBuf,
    pub kind: SummaryKind,
    pub histograms: HistogramConfig,
    /// Stop after this many records.
    pub max_records: Option<usize>,
}

impl SummaryConfig {
    pub fn new(input: PathBuf) -> Self {
        Self {
            input,
            kind: SummaryKind::Multisample,
            histograms: HistogramConfig::default(),
            max_records: None,
        }
    }
}

/// Result of summarizing one file.
#[derive(Debug, Clone)]
pub struct FileSummary {
    pub summary: VcfSummary,
    pub records: usize,
    pub dialect: Dialect,
}

/// Stream every record of `source` through the analyzer for `kind`.
pub fn summarize_source<S>(
    source: &mut S,
    kind: SummaryKind,
    histograms: HistogramConfig,
) -> crate::error::Result<(VcfSummary, usize, Dialect)>
where
    S: VariantSource + ?Sized,
{
    let schema = AnnotationSchema::from_metadata(source.metadata())?;
    let analyzer = kind.analyzer(&schema);
    let mut summary = VcfSummary::with_counters(
        schema.sample_names().to_vec(),
        histograms,
        CounterRegistry::with_names(analyzer.baseline_counters()),
    );

    let mut processed = 0;
    while let Some(record) = source.next_record() {
        let record = record?;
        analyzer.analyze(&record, &mut summary)?;
        processed += 1;
        if processed % PROGRESS_INTERVAL == 0 {
            tracing::info!(processed, "summary progress");
        }
    }

    Ok((summary, processed, schema.dialect()))
}

pub fn summarize_vcf(config: &SummaryConfig) -> Result<FileSummary> {
    tracing::info!(
        input = %config.input.display(),
        kind = %config.kind,
        "starting summary"
    );

    if !crate::validator::is_valid_vcf(&config.input)? {
        return Err(VcfQcError::format(format!(
            "invalid VCF file: {}",
            config.input.display()
        )))
        .context("VCF failed structural validation");
    }

    let mut source = VcfSource::open(&config.input)
        .with_context(|| format!("failed to open {}", config.input.display()))?
        .with_max_records(config.max_records);

    let (summary, records, dialect) =
        summarize_source(&mut source, config.kind, config.histograms)
            .with_context(|| format!("failed to summarize {}", config.input.display()))?;

    tracing::info!(
        input = %config.input.display(),
        records,
        samples = summary.len(),
        %dialect,
        "summary finished"
    );

    Ok(FileSummary {
        summary,
        records,
        dialect,
    })
}

/// Summarize each file on its own worker, then merge in input order.
pub fn summarize_many(configs: &[SummaryConfig]) -> Result<Option<FileSummary>> {
    let per_file = configs
        .par_iter()
        .map(summarize_vcf)
        .collect::<Result<Vec<_>>>()?;

    let records = per_file.iter().map(|f| f.records).sum();
    let dialect = match per_file.first() {
        Some(first) if per_file.iter().all(|f| f.dialect == first.dialect) => first.dialect,
        _ => Dialect::Unknown,
    };
    let merged = merge::merge_all(per_file.into_iter().map(|f| f.summary))
        .context("failed to merge per-file summaries")?;

    Ok(merged.map(|summary| FileSummary {
        summary,
        records,
        dialect,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{CALLED_GT, MISSING_GT, SNPS};
    use std::io::Cursor;

    const VCF: &str = "##fileformat=VCFv4.2
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">
##FORMAT=<ID=AD,Number=R,Type=Integer,Description=\"Allele depths\">
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\tS2
1\t100\trs1\tA\tG\t50\tPASS\t.\tGT:AD\t0/1:3,7\t./.:.
1\t150\t.\tC\tA\t50\tPASS\t.\tGT:AD\t1/1:0,20\t0/0:15,0
";

    #[test]
    fn summarizes_in_memory_source() {
        let mut source = VcfSource::from_reader(Box::new(Cursor::new(VCF.as_bytes()))).unwrap();
        let (summary, records, dialect) =
            summarize_source(&mut source, SummaryKind::Multisample, HistogramConfig::default())
                .unwrap();

        assert_eq!(records, 2);
        assert_eq!(dialect, Dialect::Unknown);
        assert_eq!(summary.sample_names(), ["S1", "S2"]);
        assert_eq!(summary.count("S1", SNPS), Some(2));
        assert_eq!(summary.count("S2", MISSING_GT), Some(1));
        assert_eq!(summary.count("S2", CALLED_GT), Some(1));
        assert_eq!(summary.count("S1", "dbSNP"), Some(1));
    }
}
