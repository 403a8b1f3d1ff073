//! Variant analyzers: turn one record into counter and histogram updates on a
//! [`VcfSummary`].

use std::fmt;

use clap::ValueEnum;

use crate::annotation::{AnnotationSchema, Dialect, InfoView};
use crate::error::{Result, VcfQcError};
use crate::summary::VcfSummary;
use crate::variant::{Substitution, VariantClass, VariantRecord, Zygosity};

pub const MISSING_GT: &str = "Missing GT";
pub const CALLED_GT: &str = "Called GT";
pub const VARIANT_GT: &str = "Variant GT";
pub const HETEROZYGOUS: &str = "Heterozygous";
pub const HOMOZYGOUS_ALT: &str = "Homozygous-Alt";
pub const DELETIONS: &str = "Deletions";
pub const INSERTIONS: &str = "Insertions";
pub const MONOMORPHS: &str = "Monomorphs";
pub const SNPS: &str = "SNPs";
pub const TRANSITIONS: &str = "Ts";
pub const TRANSVERSIONS: &str = "Tv";
pub const DBSNP: &str = "dbSNP";
pub const STRUCTURAL: &str = "Structural Variants";
pub const UNKNOWN_TYPE: &str = "Unknown Variant Type";

const SNPEFF_EFFECT_FIELD: &str = "Annotation";
const SNPEFF_IMPACT_FIELD: &str = "Annotation_Impact";
const SNPEFF_IMPACTS: [&str; 4] = ["MODIFIER", "LOW", "MODERATE", "HIGH"];
const SNPEFF_EFFECTS: [&str; 10] = [
    "missense_variant",
    "synonymous_variant",
    "stop_gained",
    "stop_lost",
    "start_lost",
    "frameshift_variant",
    "inframe_insertion",
    "inframe_deletion",
    "splice_acceptor_variant",
    "splice_donor_variant",
];

const ANNOVAR_EXONIC_FIELD: &str = "ExonicFunc.refGene";
const ANNOVAR_REGION_FIELD: &str = "Func.refGene";
const ANNOVAR_EXONIC_FUNCTIONS: [&str; 8] = [
    "synonymous_SNV",
    "nonsynonymous_SNV",
    "stopgain",
    "stoploss",
    "frameshift_insertion",
    "frameshift_deletion",
    "nonframeshift_insertion",
    "nonframeshift_deletion",
];

/// Analyses that can be requested for a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SummaryKind {
    /// Per-sample genotype, variant type and annotation counts.
    #[value(name = "Multisample", alias = "multisample")]
    Multisample,
}

impl SummaryKind {
    pub fn analyzer<'s>(self, schema: &'s AnnotationSchema) -> Box<dyn VariantAnalyzer + 's> {
        match self {
            SummaryKind::Multisample => Box::new(MultiSampleAnalyzer::new(schema)),
        }
    }
}

impl fmt::Display for SummaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryKind::Multisample => f.write_str("Multisample"),
        }
    }
}

pub trait VariantAnalyzer {
    /// Counters declared up front so independently produced summaries stay
    /// counter-compatible.
    fn baseline_counters(&self) -> Vec<String>;

    fn analyze(&self, record: &VariantRecord, summary: &mut VcfSummary) -> Result<()>;
}

/// Site-level facts, computed once per record.
#[derive(Debug, Clone, PartialEq)]
struct SiteSignals {
    class: VariantClass,
    aaf: Option<f64>,
    dbsnp: bool,
    functional_class: Option<String>,
    impact: Option<String>,
}

pub struct MultiSampleAnalyzer<'s> {
    schema: &'s AnnotationSchema,
}

impl<'s> MultiSampleAnalyzer<'s> {
    pub fn new(schema: &'s AnnotationSchema) -> Self {
        Self { schema }
    }

    fn signals(&self, record: &VariantRecord) -> SiteSignals {
        let info = self.schema.get_info(record);

        let annotated_rsid = match self.schema.dialect() {
            Dialect::Annovar => info.iter().any(|(name, value)| {
                let name = name.to_ascii_lowercase();
                (name.starts_with("avsnp") || name.starts_with("snp"))
                    && value.is_some_and(|v| v.starts_with("rs"))
            }),
            _ => false,
        };
        let dbsnp = annotated_rsid || record.ids.iter().any(|id| id.starts_with("rs"));

        let (functional_class, impact) = match self.schema.dialect() {
            Dialect::SnpEff => (
                info.get(SNPEFF_EFFECT_FIELD)
                    .and_then(|effect| effect.split('&').next())
                    .map(str::to_string),
                info.get(SNPEFF_IMPACT_FIELD).map(str::to_string),
            ),
            Dialect::Annovar => (annovar_function(&info), None),
            Dialect::Unknown => (None, None),
        };

        SiteSignals {
            class: record.classify(),
            aaf: record.alternate_allele_frequency(),
            dbsnp,
            functional_class,
            impact,
        }
    }
}

fn annovar_function(info: &InfoView<'_>) -> Option<String> {
    let usable = |value: &&str| !value.is_empty() && *value != ".";
    info.get(ANNOVAR_EXONIC_FIELD)
        .filter(usable)
        .or_else(|| info.get(ANNOVAR_REGION_FIELD).filter(usable))
        .map(str::to_string)
}

impl VariantAnalyzer for MultiSampleAnalyzer<'_> {
    fn baseline_counters(&self) -> Vec<String> {
        let mut names: Vec<String> = [
            MISSING_GT,
            CALLED_GT,
            VARIANT_GT,
            HETEROZYGOUS,
            HOMOZYGOUS_ALT,
            DELETIONS,
            INSERTIONS,
            MONOMORPHS,
            SNPS,
            TRANSITIONS,
            TRANSVERSIONS,
        ]
        .iter()
        .map(|name| name.to_string())
        .collect();
        names.extend(Substitution::all().map(|s| s.label()));
        names.extend([DBSNP, STRUCTURAL, UNKNOWN_TYPE].map(String::from));

        match self.schema.dialect() {
            Dialect::SnpEff => {
                if self.schema.contains(SNPEFF_IMPACT_FIELD) {
                    names.extend(SNPEFF_IMPACTS.map(String::from));
                }
                names.extend(SNPEFF_EFFECTS.map(String::from));
            }
            Dialect::Annovar => names.extend(ANNOVAR_EXONIC_FUNCTIONS.map(String::from)),
            Dialect::Unknown => {}
        }
        names
    }

    fn analyze(&self, record: &VariantRecord, summary: &mut VcfSummary) -> Result<()> {
        if record.is_multiallelic() {
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

        let site = self.signals(record);

        for (index, call) in record.calls.iter().enumerate() {
            let Some(zygosity) = call.zygosity else {
                summary.increment_at(index, MISSING_GT)?;
                continue;
            };
            summary.increment_at(index, CALLED_GT)?;

            if let Some(sample) = summary.sample_at_mut(index) {
                if let Some(depths) = call.allele_depths {
                    sample.add_depth(depths.total() as usize);
                }
                if let Some(quality) = call.quality {
                    sample.add_qual(quality as usize);
                }
            }

            if !call.is_variant() {
                continue;
            }

            summary.increment_at(index, VARIANT_GT)?;
            if let (Some(aaf), Some(sample)) = (site.aaf, summary.sample_at_mut(index)) {
                sample.add_aaf(aaf);
            }
            summary.increment_at(
                index,
                if zygosity == Zygosity::Het {
                    HETEROZYGOUS
                } else {
                    HOMOZYGOUS_ALT
                },
            )?;

            match site.class {
                VariantClass::Deletion { length } => {
                    summary.increment_at(index, DELETIONS)?;
                    if let Some(sample) = summary.sample_at_mut(index) {
                        sample.add_delete(length);
                    }
                }
                VariantClass::Insertion { length } => {
                    summary.increment_at(index, INSERTIONS)?;
                    if let Some(sample) = summary.sample_at_mut(index) {
                        sample.add_insert(length);
                    }
                }
                VariantClass::Snp(substitution) => {
                    summary.increment_at(index, SNPS)?;
                    summary.increment_at(index, &substitution.label())?;
                    summary.increment_at(
                        index,
                        if substitution.is_transition() {
                            TRANSITIONS
                        } else {
                            TRANSVERSIONS
                        },
                    )?;
                }
                VariantClass::Monomorphic => summary.increment_at(index, MONOMORPHS)?,
                VariantClass::Structural => summary.increment_at(index, STRUCTURAL)?,
                VariantClass::Unknown => summary.increment_at(index, UNKNOWN_TYPE)?,
            }

            if site.dbsnp {
                summary.increment_at(index, DBSNP)?;
            }
            for category in [&site.functional_class, &site.impact].into_iter().flatten() {
                summary.register(category.as_str());
                summary.increment_at(index, category)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counters::CounterRegistry;
    use crate::input::{InfoDeclaration, VcfMetadata};
    use crate::summary::{Histogram, HistogramConfig};
    use crate::variant::{GenotypeCall, InfoValue};

    const ANN: &str = "Functional annotations: 'Allele | Annotation | Annotation_Impact | Gene_Name'";

    fn schema(infos: &[(&str, &str)], samples: &[&str]) -> AnnotationSchema {
        let metadata = VcfMetadata {
            infos: infos
                .iter()
                .map(|(name, description)| InfoDeclaration {
                    name: name.to_string(),
                    description: description.to_string(),
                })
                .collect(),
            sample_names: samples.iter().map(|s| s.to_string()).collect(),
        };
        AnnotationSchema::from_metadata(&metadata).unwrap()
    }

    fn summary_for(schema: &AnnotationSchema, analyzer: &dyn VariantAnalyzer) -> VcfSummary {
        VcfSummary::with_counters(
            schema.sample_names().to_vec(),
            HistogramConfig::default(),
            CounterRegistry::with_names(analyzer.baseline_counters()),
        )
    }

    fn site(reference: &str, alternate: &str, calls: Vec<GenotypeCall>) -> VariantRecord {
        let mut record = VariantRecord::new("1", 100, reference);
        record.alternates = vec![alternate.to_string()];
        record.calls = calls;
        record
    }

    fn call(a: usize, b: usize) -> GenotypeCall {
        GenotypeCall::from_alleles(&[Some(a), Some(b)])
    }

    #[test]
    fn baseline_has_substitutions_and_dialect_buckets() {
        let plain = schema(&[], &["S1"]);
        let names = SummaryKind::Multisample.analyzer(&plain).baseline_counters();
        assert!(names.contains(&String::from("A>G")));
        assert!(names.contains(&String::from(DBSNP)));
        assert!(!names.contains(&String::from("HIGH")));

        let snpeff = schema(&[("ANN", ANN)], &["S1"]);
        let names = SummaryKind::Multisample.analyzer(&snpeff).baseline_counters();
        assert!(names.contains(&String::from("HIGH")));
        assert!(names.contains(&String::from("missense_variant")));

        let annovar = schema(&[("ANNOVAR_DATE", "date")], &["S1"]);
        let names = SummaryKind::Multisample.analyzer(&annovar).baseline_counters();
        assert!(names.contains(&String::from("nonsynonymous_SNV")));
    }

    #[test]
    fn counts_genotype_states_per_sample() {
        let schema = schema(&[], &["S1", "S2", "S3"]);
        let analyzer = MultiSampleAnalyzer::new(&schema);
        let mut summary = summary_for(&schema, &analyzer);

        let record = site(
            "A",
            "G",
            vec![
                call(0, 1).with_depths(4, 6).with_quality(40),
                call(0, 0).with_depths(12, 0),
                GenotypeCall::uncalled(),
            ],
        );
        analyzer.analyze(&record, &mut summary).unwrap();

        assert_eq!(summary.count("S1", CALLED_GT), Some(1));
        assert_eq!(summary.count("S1", VARIANT_GT), Some(1));
        assert_eq!(summary.count("S1", HETEROZYGOUS), Some(1));
        assert_eq!(summary.count("S1", SNPS), Some(1));
        assert_eq!(summary.count("S1", "A>G"), Some(1));
        assert_eq!(summary.count("S1", TRANSITIONS), Some(1));
        assert_eq!(summary.count("S1", TRANSVERSIONS), Some(0));

        assert_eq!(summary.count("S2", CALLED_GT), Some(1));
        assert_eq!(summary.count("S2", VARIANT_GT), Some(0));
        assert_eq!(summary.count("S2", SNPS), Some(0));

        assert_eq!(summary.count("S3", MISSING_GT), Some(1));
        assert_eq!(summary.count("S3", CALLED_GT), Some(0));

        let s1 = summary.sample("S1").unwrap();
        assert_eq!(s1.histogram(Histogram::Depth)[10], 1);
        assert_eq!(s1.histogram(Histogram::Qual)[40], 1);
        assert_eq!(s1.histogram(Histogram::AlleleFrequency)[0], 1);
        let s2 = summary.sample("S2").unwrap();
        assert_eq!(s2.histogram(Histogram::Depth)[12], 1);
        assert_eq!(s2.histogram(Histogram::AlleleFrequency).iter().sum::<u64>(), 0);
    }

    #[test]
    fn indels_fill_length_histograms() {
        let schema = schema(&[], &["S1"]);
        let analyzer = MultiSampleAnalyzer::new(&schema);
        let mut summary = summary_for(&schema, &analyzer);

        analyzer
            .analyze(&site("A", "ATTT", vec![call(1, 1)]), &mut summary)
            .unwrap();
        analyzer
            .analyze(&site("ACG", "A", vec![call(0, 1)]), &mut summary)
            .unwrap();

        assert_eq!(summary.count("S1", INSERTIONS), Some(1));
        assert_eq!(summary.count("S1", DELETIONS), Some(1));
        assert_eq!(summary.count("S1", HOMOZYGOUS_ALT), Some(1));
        let sample = summary.sample("S1").unwrap();
        assert_eq!(sample.histogram(Histogram::InsertLength)[3], 1);
        assert_eq!(sample.histogram(Histogram::DeleteLength)[2], 1);
    }

    #[test]
    fn multiallelic_rejected_before_counting() {
        let schema = schema(&[], &["S1"]);
        let analyzer = MultiSampleAnalyzer::new(&schema);
        let mut summary = summary_for(&schema, &analyzer);

        let mut record = site("A", "G", vec![call(0, 1)]);
        record.alternates.push("T".into());
        assert!(matches!(
            analyzer.analyze(&record, &mut summary),
            Err(VcfQcError::Multiallelic { .. })
        ));
        assert_eq!(summary.count("S1", CALLED_GT), Some(0));
    }

    #[test]
    fn snpeff_annotations_register_lazily() {
        let schema = schema(&[("ANN", ANN)], &["S1", "S2"]);
        let analyzer = MultiSampleAnalyzer::new(&schema);
        let mut summary = summary_for(&schema, &analyzer);

        let mut record = site("C", "T", vec![call(0, 1), call(0, 0)]);
        record.ids = vec!["rs42".into()];
        record.info.insert(
            "ANN".into(),
            InfoValue::List(vec![Some("T|5_prime_UTR_premature_start_codon_gain_variant&intron_variant|LOW|ABC".into())]),
        );
        analyzer.analyze(&record, &mut summary).unwrap();

        assert_eq!(summary.count("S1", DBSNP), Some(1));
        assert_eq!(summary.count("S1", "LOW"), Some(1));
        assert_eq!(
            summary.count("S1", "5_prime_UTR_premature_start_codon_gain_variant"),
            Some(1)
        );
        assert_eq!(
            summary.count("S2", "5_prime_UTR_premature_start_codon_gain_variant"),
            Some(0)
        );
    }

    #[test]
    fn annovar_prefers_exonic_function_and_avsnp() {
        let schema = schema(
            &[
                ("ANNOVAR_DATE", "date"),
                ("Func.refGene", "region"),
                ("ExonicFunc.refGene", "exonic"),
                ("avsnp150", "dbSNP"),
            ],
            &["S1"],
        );
        let analyzer = MultiSampleAnalyzer::new(&schema);
        let mut summary = summary_for(&schema, &analyzer);

        let mut record = site("G", "T", vec![call(0, 1)]);
        record.info.insert("Func.refGene".into(), InfoValue::Scalar("exonic".into()));
        record.info.insert("ExonicFunc.refGene".into(), InfoValue::Scalar("stopgain".into()));
        record.info.insert("avsnp150".into(), InfoValue::Scalar("rs99".into()));
        analyzer.analyze(&record, &mut summary).unwrap();

        let mut intronic = site("G", "C", vec![call(0, 1)]);
        intronic.info.insert("Func.refGene".into(), InfoValue::Scalar("intronic".into()));
        intronic.info.insert("ExonicFunc.refGene".into(), InfoValue::Scalar(".".into()));
        analyzer.analyze(&intronic, &mut summary).unwrap();

        assert_eq!(summary.count("S1", "stopgain"), Some(1));
        assert_eq!(summary.count("S1", "intronic"), Some(1));
        assert_eq!(summary.count("S1", DBSNP), Some(1));
        assert_eq!(summary.count("S1", TRANSVERSIONS), Some(2));
    }
}
