//! VCF input: header metadata plus a streaming source of [`VariantRecord`]s
//! backed by noodles.

use std::io::BufRead;
use std::path::Path;

use noodles::vcf;
use noodles::vcf::variant::record::samples::keys::key as format_key;
use noodles::vcf::variant::record_buf::{
    RecordBuf,
    info::field::{Value as InfoFieldValue, value::Array as InfoArray},
    samples::sample::{Value as SampleValue, value::Array as SampleArray},
};

use crate::error::{Result, VcfQcError};
use crate::variant::{FilterStatus, GenotypeCall, InfoValue, VariantRecord};

const ALLELE_DEPTHS: &str = "AD";
const GENOTYPE_QUALITY: &str = "GQ";

/// One `##INFO` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoDeclaration {
    pub name: String,
    pub description: String,
}

/// File-level metadata needed by the annotation schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VcfMetadata {
    /// INFO declarations in header order.
    pub infos: Vec<InfoDeclaration>,
    pub sample_names: Vec<String>,
}

impl VcfMetadata {
    fn from_header(header: &vcf::Header) -> Self {
        let infos = header
            .infos()
            .iter()
            .map(|(name, info)| InfoDeclaration {
                name: name.clone(),
                description: info.description().to_string(),
            })
            .collect();
        let sample_names = header.sample_names().iter().cloned().collect();

        Self {
            infos,
            sample_names,
        }
    }
}

/// Trait for a source of variant records.
pub trait VariantSource {
    fn metadata(&self) -> &VcfMetadata;

    /// Next record, or `None` at end of input.
    fn next_record(&mut self) -> Option<Result<VariantRecord>>;
}

impl<T: VariantSource + ?Sized> VariantSource for Box<T> {
    fn metadata(&self) -> &VcfMetadata {
        (**self).metadata()
    }

    fn next_record(&mut self) -> Option<Result<VariantRecord>> {
        (**self).next_record()
    }
}

/// Streams records from a VCF one at a time, reusing a single record buffer.
pub struct VcfSource {
    reader: vcf::io::Reader<Box<dyn BufRead + Send>>,
    header: vcf::Header,
    metadata: VcfMetadata,
    buffer: RecordBuf,
    records_read: usize,
    max_records: Option<usize>,
}

impl VcfSource {
    /// Open a plain or gzip-compressed VCF.
    pub fn open(path: &Path) -> Result<Self> {
        let reader = crate::smart_reader::open_input(path).map_err(|e| {
            VcfQcError::format(format!("failed to open {}: {e}", path.display()))
        })?;
        Self::from_reader(reader)
    }

    pub fn from_reader(reader: Box<dyn BufRead + Send>) -> Result<Self> {
        let mut reader = vcf::io::Reader::new(reader);
        let header = reader
            .read_header()
            .map_err(|e| VcfQcError::format(format!("invalid VCF header: {e}")))?;
        let metadata = VcfMetadata::from_header(&header);

        Ok(Self {
            reader,
            header,
            metadata,
            buffer: RecordBuf::default(),
            records_read: 0,
            max_records: None,
        })
    }

    /// Stop after `limit` records.
    pub fn with_max_records(mut self, limit: Option<usize>) -> Self {
        self.max_records = limit;
        self
    }

    pub fn records_read(&self) -> usize {
        self.records_read
    }
}

impl VariantSource for VcfSource {
    fn metadata(&self) -> &VcfMetadata {
        &self.metadata
    }

    fn next_record(&mut self) -> Option<Result<VariantRecord>> {
        if let Some(limit) = self.max_records
            && self.records_read >= limit
        {
            tracing::info!(limit, "reached max_records limit, stopping read");
            return None;
        }

        match self.reader.read_record_buf(&self.header, &mut self.buffer) {
            Ok(0) => None,
            Ok(_) => {
                self.records_read += 1;
                Some(Ok(convert_record(&self.buffer)))
            }
            Err(e) => Some(Err(VcfQcError::format(format!(
                "record {}: {e}",
                self.records_read + 1
            )))),
        }
    }
}

fn convert_record(record: &RecordBuf) -> VariantRecord {
    let filters = record.filters().as_ref();
    let filter = if filters.is_empty() {
        FilterStatus::Missing
    } else if filters.len() == 1 && filters.contains("PASS") {
        FilterStatus::Pass
    } else {
        FilterStatus::Failed(filters.iter().cloned().collect())
    };

    let info = record
        .info()
        .as_ref()
        .iter()
        .filter_map(|(key, value)| value.as_ref().map(|v| (key.clone(), info_value(v))))
        .collect();

    let calls = record.samples().values().map(|sample| {
        let alleles = sample
            .get(format_key::GENOTYPE)
            .flatten()
            .map(genotype_alleles)
            .unwrap_or_default();
        let mut call = GenotypeCall::from_alleles(&alleles);
        if let Some((reference, alternate)) =
            sample.get(ALLELE_DEPTHS).flatten().and_then(allele_depths)
        {
            call = call.with_depths(reference, alternate);
        }
        if let Some(quality) = sample.get(GENOTYPE_QUALITY).flatten().and_then(genotype_quality) {
            call = call.with_quality(quality);
        }
        call
    });

    VariantRecord {
        chromosome: record.reference_sequence_name().to_string(),
        position: record.variant_start().map(usize::from).unwrap_or(0),
        ids: record.ids().as_ref().iter().cloned().collect(),
        reference: record.reference_bases().to_string(),
        alternates: record.alternate_bases().as_ref().to_vec(),
        quality: record.quality_score(),
        filter,
        info,
        calls: calls.collect(),
    }
}

fn info_value(value: &InfoFieldValue) -> InfoValue {
    match value {
        InfoFieldValue::Flag => InfoValue::Flag,
        InfoFieldValue::Integer(n) => InfoValue::Scalar(n.to_string()),
        InfoFieldValue::Float(n) => InfoValue::Scalar(n.to_string()),
        InfoFieldValue::Character(c) => InfoValue::Scalar(c.to_string()),
        InfoFieldValue::String(s) => InfoValue::Scalar(s.clone()),
        InfoFieldValue::Array(array) => InfoValue::List(match array {
            InfoArray::Integer(values) => render_all(values),
            InfoArray::Float(values) => render_all(values),
            InfoArray::Character(values) => render_all(values),
            InfoArray::String(values) => values.clone(),
        }),
    }
}

fn render_all<T: ToString>(values: &[Option<T>]) -> Vec<Option<String>> {
    values
        .iter()
        .map(|value| value.as_ref().map(ToString::to_string))
        .collect()
}

fn genotype_alleles(value: &SampleValue) -> Vec<Option<usize>> {
    match value {
        SampleValue::Genotype(genotype) => genotype
            .as_ref()
            .iter()
            .map(|allele| allele.position())
            .collect(),
        SampleValue::String(raw) => parse_genotype(raw),
        _ => Vec::new(),
    }
}

/// Parse a raw `GT` string such as `0/1` or `1|.`.
pub fn parse_genotype(raw: &str) -> Vec<Option<usize>> {
    raw.split(['/', '|'])
        .map(|allele| allele.parse::<usize>().ok())
        .collect()
}

fn allele_depths(value: &SampleValue) -> Option<(u32, u32)> {
    let depths: Vec<Option<i32>> = match value {
        SampleValue::Array(SampleArray::Integer(values)) => values.clone(),
        SampleValue::Integer(n) => vec![Some(*n)],
        SampleValue::String(raw) => raw.split(',').map(|s| s.parse().ok()).collect(),
        _ => return None,
    };

    let reference = depths.first().copied().flatten()?;
    let alternate = depths.get(1).copied().flatten().unwrap_or(0);
    Some((non_negative(reference), non_negative(alternate)))
}

fn genotype_quality(value: &SampleValue) -> Option<u32> {
    match value {
        SampleValue::Integer(n) => u32::try_from(*n).ok(),
        SampleValue::Float(f) if f.is_finite() && *f >= 0.0 => Some(f.round() as u32),
        SampleValue::String(raw) => raw.parse().ok(),
        _ => None,
    }
}

fn non_negative(n: i32) -> u32 {
    u32::try_from(n).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::Zygosity;
    use std::io::Cursor;

    const VCF: &str = "##fileformat=VCFv4.2
##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Total depth\">
##INFO=<ID=AF,Number=A,Type=Float,Description=\"Allele frequency\">
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">
##FORMAT=<ID=AD,Number=R,Type=Integer,Description=\"Allele depths\">
##FORMAT=<ID=GQ,Number=1,Type=Integer,Description=\"Genotype quality\">
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\tS2
1\t100\trs1\tA\tT\t50\tPASS\tDP=20;AF=0.5\tGT:AD:GQ\t0/1:3,7:30\t./.:.:.
1\t200\t.\tG\t.\t.\tq10\t.\tGT:AD\t0/0:12,0\t0/0:9,0
";

    fn source(text: &'static str) -> VcfSource {
        VcfSource::from_reader(Box::new(Cursor::new(text.as_bytes()))).unwrap()
    }

    #[test]
    fn exposes_header_metadata_in_order() {
        let source = source(VCF);
        let names: Vec<_> = source.metadata().infos.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["DP", "AF"]);
        assert_eq!(source.metadata().infos[0].description, "Total depth");
        assert_eq!(source.metadata().sample_names, ["S1", "S2"]);
    }

    #[test]
    fn converts_records_and_calls() {
        let mut source = source(VCF);
        let first = source.next_record().unwrap().unwrap();
        assert_eq!(first.chromosome, "1");
        assert_eq!(first.position, 100);
        assert_eq!(first.id().as_deref(), Some("rs1"));
        assert_eq!(first.alternates, ["T"]);
        assert_eq!(first.quality, Some(50.0));
        assert_eq!(first.filter, FilterStatus::Pass);
        assert_eq!(first.info["DP"], InfoValue::Scalar("20".into()));
        assert_eq!(first.calls[0].zygosity, Some(Zygosity::Het));
        assert_eq!(first.calls[0].allele_depths.map(|d| d.alternate), Some(7));
        assert_eq!(first.calls[0].quality, Some(30));
        assert!(!first.calls[1].is_called());

        let second = source.next_record().unwrap().unwrap();
        assert!(second.alternates.is_empty());
        assert_eq!(second.filter, FilterStatus::Failed(vec!["q10".into()]));
        assert_eq!(second.calls[1].zygosity, Some(Zygosity::HomRef));
        assert_eq!(second.calls[1].allele_depths.map(|d| d.reference), Some(9));
        assert!(source.next_record().is_none());
        assert_eq!(source.records_read(), 2);
    }

    #[test]
    fn max_records_truncates_stream() {
        let mut source = source(VCF).with_max_records(Some(1));
        assert!(source.next_record().is_some());
        assert!(source.next_record().is_none());
    }

    #[test]
    fn parses_raw_genotype_strings() {
        assert_eq!(parse_genotype("0/1"), vec![Some(0), Some(1)]);
        assert_eq!(parse_genotype("1|."), vec![Some(1), None]);
        assert_eq!(parse_genotype("."), vec![None]);
    }
}
