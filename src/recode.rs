//! Flat tab-separated recoding of a VCF: fixed columns, annotation columns and
//! one confidence-scaled genotype code per sample.

use std::{
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result as AnyResult};
use serde::Serialize;

use crate::annotation::{AnnotationSchema, Dialect};
use crate::error::{Result, VcfQcError};
use crate::genotype::GenotypeRecoder;
use crate::input::{VariantSource, VcfSource};
use crate::variant::{FilterStatus, VariantRecord};

pub const FIXED_COLUMNS: [&str; 7] = ["CHROM", "POS", "ID", "REF", "ALT", "QUAL", "FILTER"];

const PROGRESS_INTERVAL: usize = 100_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecodeOptions {
    pub min_call_depth: u32,
    /// Placeholder for absent values in fixed and annotation columns.
    pub missing_data: String,
    /// Placeholder for uncalled genotypes.
    pub missing_gt: String,
    /// Allow records with more than one alternate allele.
    pub multiallelic: bool,
    /// Annotation columns to emit, in this order. `None` emits every column.
    pub info_columns: Option<Vec<String>>,
}

impl Default for RecodeOptions {
    fn default() -> Self {
        Self {
            min_call_depth: 10,
            missing_data: String::from("."),
            missing_gt: String::from("NA"),
            multiallelic: false,
            info_columns: None,
        }
    }
}

/// Turns one record into one output row.
#[derive(Debug)]
pub struct RecordRecoder<'s> {
    schema: &'s AnnotationSchema,
    genotypes: GenotypeRecoder,
    missing_data: String,
    multiallelic: bool,
    /// Schema indices of the emitted annotation columns, `None` for all.
    selected: Option<Vec<usize>>,
    header: Vec<String>,
}

impl<'s> RecordRecoder<'s> {
    /// Fails with a schema error if any requested column is not declared.
    pub fn new(schema: &'s AnnotationSchema, options: &RecodeOptions) -> Result<Self> {
        let selected = match &options.info_columns {
            None => None,
            Some(requested) => {
                let missing = schema.undeclared(requested);
                if !missing.is_empty() {
                    tracing::error!(?missing, "requested INFO columns do not appear in the VCF");
                    return Err(VcfQcError::Schema {
                        missing: missing.into_iter().map(String::from).collect(),
                    });
                }
                Some(
                    requested
                        .iter()
                        .filter_map(|name| schema.fields().iter().position(|f| f == name))
                        .collect::<Vec<_>>(),
                )
            }
        };

        let mut header: Vec<String> = FIXED_COLUMNS.iter().map(|c| c.to_string()).collect();
        match &selected {
            Some(indices) => header.extend(indices.iter().map(|&i| schema.fields()[i].clone())),
            None => header.extend(schema.fields().iter().cloned()),
        }
        header.extend(schema.sample_names().iter().cloned());

        tracing::debug!(columns = header.len(), "recoded table header assembled");

        Ok(Self {
            schema,
            genotypes: GenotypeRecoder::new(options.min_call_depth, options.missing_gt.clone()),
            missing_data: options.missing_data.clone(),
            multiallelic: options.multiallelic,
            selected,
            header,
        })
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn recode(&self, record: &VariantRecord) -> Result<Vec<String>> {
        if record.is_multiallelic() && !self.multiallelic {
            tracing::error!(
                chromosome = %record.chromosome,
                position = record.position,
                alternates = ?record.alternates,
                "multiallelic record; all records must have a single alternate allele"
            );
            return Err(VcfQcError::Multiallelic {
                chromosome: record.chromosome.clone(),
                position: record.position,
                alleles: record.alternates.len(),
            });
        }

        let mut row = Vec::with_capacity(self.header.len());
        row.push(record.chromosome.clone());
        row.push(record.position.to_string());
        row.push(record.id().unwrap_or_else(|| self.missing_data.clone()));
        row.push(record.reference.clone());
        row.push(
            record
                .alternates
                .first()
                .cloned()
                .unwrap_or_else(|| self.missing_data.clone()),
        );
        row.push(
            record
                .quality
                .map(|q| q.to_string())
                .unwrap_or_else(|| self.missing_data.clone()),
        );
        row.push(match &record.filter {
            FilterStatus::Missing => self.missing_data.clone(),
            FilterStatus::Pass => String::from("PASSED"),
            FilterStatus::Failed(names) => names.join(","),
        });

        let info = self.schema.get_info(record);
        let values = info.values();
        let cell = |value: &Option<String>| {
            value.clone().unwrap_or_else(|| self.missing_data.clone())
        };
        match &self.selected {
            Some(indices) => row.extend(indices.iter().map(|&i| cell(&values[i]))),
            None => row.extend(values.iter().map(cell)),
        }

        row.extend(record.calls.iter().map(|call| self.genotypes.recode(call)));

        if row.len() != self.header.len() {
            tracing::error!(
                chromosome = %record.chromosome,
                position = record.position,
                expected = self.header.len(),
                actual = row.len(),
                "record does not contain the same number of columns as the header"
            );
            return Err(VcfQcError::RowWidth {
                chromosome: record.chromosome.clone(),
                position: record.position,
                expected: self.header.len(),
                actual: row.len(),
            });
        }

        Ok(row)
    }
}

/// Inputs for a recoding run.
#[derive(Debug, Clone)]
pub struct RecodeConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub options: RecodeOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecodeStats {
    pub total_records: usize,
    pub emitted_rows: usize,
    pub samples: usize,
    pub annotation_columns: usize,
    pub dialect: Dialect,
}

/// Recode a VCF file into a tab-separated table.
pub fn recode_vcf(config: &RecodeConfig) -> AnyResult<RecodeStats> {
    tracing::info!(
        input = %config.input.display(),
        output = %config.output.display(),
        min_call_depth = config.options.min_call_depth,
        "starting recode",
    );

    if !crate::validator::is_valid_vcf(&config.input)? {
        return Err(VcfQcError::format(format!(
            "invalid VCF file: {}",
            config.input.display()
        )))
        .context("VCF failed structural validation");
    }

    let mut source = VcfSource::open(&config.input)
        .with_context(|| format!("failed to open {}", config.input.display()))?;
    let schema = AnnotationSchema::from_metadata(source.metadata())?;
    let recoder = RecordRecoder::new(&schema, &config.options)?;

    let output = fs::File::create(&config.output)
        .with_context(|| format!("failed to create output {}", config.output.display()))?;
    let mut writer = BufWriter::new(output);

    let (total_records, emitted_rows) = recode_records(&mut source, &recoder, &mut writer)
        .with_context(|| format!("failed to recode {}", config.input.display()))?;
    writer.flush().context("failed to flush recoded table")?;

    tracing::info!(total_records, emitted_rows, "recode finished");

    Ok(RecodeStats {
        total_records,
        emitted_rows,
        samples: schema.sample_names().len(),
        annotation_columns: recoder.header().len() - FIXED_COLUMNS.len() - schema.sample_names().len(),
        dialect: schema.dialect(),
    })
}

/// Write the header and one row per record. Returns (records read, rows written).
pub fn recode_records<S, W>(
    source: &mut S,
    recoder: &RecordRecoder<'_>,
    writer: &mut W,
) -> Result<(usize, usize)>
where
    S: VariantSource + ?Sized,
    W: Write,
{
    writeln!(writer, "{}", recoder.header().join("\t"))?;

    let mut processed = 0;
    let mut emitted = 0;
    while let Some(record) = source.next_record() {
        let record = record?;
        processed += 1;

        let row = recoder.recode(&record)?;
        writeln!(writer, "{}", row.join("\t"))?;
        emitted += 1;

        if processed % PROGRESS_INTERVAL == 0 {
            tracing::info!(processed, "recoding progress");
        }
    }

    Ok((processed, emitted))
}

/// Read an annotation column allow-list: one name per line, blank lines
/// ignored. A file without names means "all columns".
pub fn read_column_list(path: &Path) -> AnyResult<Option<Vec<String>>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read column list {}", path.display()))?;
    Ok(parse_column_list(&text))
}

fn parse_column_list(text: &str) -> Option<Vec<String>> {
    let names: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect();
    tracing::debug!(?names, "column list");
    if names.is_empty() { None } else { Some(names) }
}
