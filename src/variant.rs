//! Read-only view of one VCF data line as seen by the recoding and summary code.
//!
//! Records are produced by [`crate::input::VcfSource`]; nothing downstream
//! mutates them.

use std::collections::HashMap;

/// A single INFO value. Multi-valued keys keep every element here; consumers
/// that need a scalar use [`InfoValue::first`].
#[derive(Debug, Clone, PartialEq)]
pub enum InfoValue {
    Flag,
    Scalar(String),
    List(Vec<Option<String>>),
}

impl InfoValue {
    /// Scalar rendering of the value. Lists collapse to their first element
    /// and a present flag renders as `True`.
    pub fn first(&self) -> Option<String> {
        match self {
            InfoValue::Flag => Some(String::from("True")),
            InfoValue::Scalar(value) => Some(value.clone()),
            InfoValue::List(values) => values.first().cloned().flatten(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterStatus {
    /// `.` in the FILTER column.
    Missing,
    Pass,
    Failed(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zygosity {
    HomRef,
    Het,
    HomAlt,
}

impl Zygosity {
    /// Classify a genotype from its allele indices. Any missing allele means
    /// the sample is not called.
    pub fn from_alleles(alleles: &[Option<usize>]) -> Option<Self> {
        if alleles.is_empty() {
            return None;
        }
        let indices: Option<Vec<usize>> = alleles.iter().copied().collect();
        let indices = indices?;

        if indices.iter().all(|&i| i == 0) {
            Some(Zygosity::HomRef)
        } else if indices.windows(2).all(|w| w[0] == w[1]) {
            Some(Zygosity::HomAlt)
        } else {
            Some(Zygosity::Het)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AlleleDepths {
    pub reference: u32,
    pub alternate: u32,
}

impl AlleleDepths {
    pub fn total(&self) -> u32 {
        self.reference.saturating_add(self.alternate)
    }
}

/// One sample's call at one site.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenotypeCall {
    pub zygosity: Option<Zygosity>,
    pub allele_depths: Option<AlleleDepths>,
    pub quality: Option<u32>,
    /// Number of non-reference alleles in the call.
    pub alt_alleles: usize,
    /// Number of called alleles.
    pub ploidy: usize,
}

impl GenotypeCall {
    pub fn from_alleles(alleles: &[Option<usize>]) -> Self {
        let zygosity = Zygosity::from_alleles(alleles);
        let (alt_alleles, ploidy) = if zygosity.is_some() {
            (
                alleles.iter().filter(|a| matches!(a, Some(i) if *i > 0)).count(),
                alleles.len(),
            )
        } else {
            (0, 0)
        };

        Self {
            zygosity,
            allele_depths: None,
            quality: None,
            alt_alleles,
            ploidy,
        }
    }

    pub fn uncalled() -> Self {
        Self::default()
    }

    pub fn with_depths(mut self, reference: u32, alternate: u32) -> Self {
        self.allele_depths = Some(AlleleDepths {
            reference,
            alternate,
        });
        self
    }

    pub fn with_quality(mut self, quality: u32) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn is_called(&self) -> bool {
        self.zygosity.is_some()
    }

    pub fn is_variant(&self) -> bool {
        matches!(self.zygosity, Some(Zygosity::Het | Zygosity::HomAlt))
    }
}

/// A directional single-nucleotide substitution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Substitution {
    pub reference: char,
    pub alternate: char,
}

pub const NUCLEOTIDES: [char; 4] = ['A', 'C', 'G', 'T'];

impl Substitution {
    pub fn is_transition(&self) -> bool {
        matches!(
            (self.reference, self.alternate),
            ('A', 'G') | ('G', 'A') | ('C', 'T') | ('T', 'C')
        )
    }

    pub fn label(&self) -> String {
        format!("{}>{}", self.reference, self.alternate)
    }

    /// All twelve ordered substitutions, reference-major.
    pub fn all() -> impl Iterator<Item = Substitution> {
        NUCLEOTIDES.into_iter().flat_map(|reference| {
            NUCLEOTIDES
                .into_iter()
                .filter(move |&alternate| alternate != reference)
                .map(move |alternate| Substitution {
                    reference,
                    alternate,
                })
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantClass {
    Snp(Substitution),
    Insertion { length: usize },
    Deletion { length: usize },
    Monomorphic,
    Structural,
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantRecord {
    pub chromosome: String,
    pub position: usize,
    pub ids: Vec<String>,
    pub reference: String,
    pub alternates: Vec<String>,
    pub quality: Option<f32>,
    pub filter: FilterStatus,
    pub info: HashMap<String, InfoValue>,
    pub calls: Vec<GenotypeCall>,
}

impl VariantRecord {
    pub fn new(chromosome: impl Into<String>, position: usize, reference: impl Into<String>) -> Self {
        Self {
            chromosome: chromosome.into(),
            position,
            ids: Vec::new(),
            reference: reference.into(),
            alternates: Vec::new(),
            quality: None,
            filter: FilterStatus::Missing,
            info: HashMap::new(),
            calls: Vec::new(),
        }
    }

    /// Joined ID column, `None` when the record carries no identifier.
    pub fn id(&self) -> Option<String> {
        if self.ids.is_empty() {
            None
        } else {
            Some(self.ids.join(";"))
        }
    }

    pub fn is_multiallelic(&self) -> bool {
        self.alternates.len() > 1
    }

    /// Alternate allele frequency across all called samples.
    pub fn alternate_allele_frequency(&self) -> Option<f64> {
        let (alt, total) = self
            .calls
            .iter()
            .filter(|call| call.is_called())
            .fold((0usize, 0usize), |(alt, total), call| {
                (alt + call.alt_alleles, total + call.ploidy)
            });
        if total == 0 {
            None
        } else {
            Some(alt as f64 / total as f64)
        }
    }

    /// Classify the site by its first alternate allele.
    pub fn classify(&self) -> VariantClass {
        let alternate = match self.alternates.first() {
            Some(alt) if alt != "." && alt != "*" => alt.to_ascii_uppercase(),
            _ => return VariantClass::Monomorphic,
        };
        let reference = self.reference.to_ascii_uppercase();

        if self.info.contains_key("SVTYPE") || is_symbolic(&alternate) {
            return VariantClass::Structural;
        }
        if !is_sequence(&reference) || !is_sequence(&alternate) {
            return VariantClass::Unknown;
        }
        if reference == alternate {
            return VariantClass::Monomorphic;
        }

        match (reference.len(), alternate.len()) {
            (1, 1) => {
                let r = reference.chars().next().unwrap_or('N');
                let a = alternate.chars().next().unwrap_or('N');
                if NUCLEOTIDES.contains(&r) && NUCLEOTIDES.contains(&a) {
                    VariantClass::Snp(Substitution {
                        reference: r,
                        alternate: a,
                    })
                } else {
                    VariantClass::Unknown
                }
            }
            (r, a) if a > r => VariantClass::Insertion { length: a - r },
            (r, a) if a < r => VariantClass::Deletion { length: r - a },
            _ => VariantClass::Unknown,
        }
    }
}

fn is_symbolic(allele: &str) -> bool {
    allele.starts_with('<') || allele.contains('[') || allele.contains(']')
}

fn is_sequence(allele: &str) -> bool {
    !allele.is_empty() && allele.chars().all(|c| matches!(c, 'A' | 'C' | 'G' | 'T' | 'N'))
}
