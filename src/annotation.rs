//! Annotation schema: reconciles ANNOVAR-style flat INFO fields and the SnpEff
//! compound `ANN` field into one ordered list of field names.

use std::fmt;

use serde::Serialize;

use crate::error::{Result, VcfQcError};
use crate::input::VcfMetadata;
use crate::variant::{InfoValue, VariantRecord};

pub const ANNOVAR_MARKER: &str = "ANNOVAR_DATE";
pub const SNPEFF_FIELD: &str = "ANN";
const SNPEFF_DESCRIPTION_PREFIX: &str = "Functional annotations";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Annovar,
    SnpEff,
    Unknown,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dialect::Annovar => "ANNOVAR",
            Dialect::SnpEff => "SNPEFF",
            Dialect::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationSchema {
    dialect: Dialect,
    fields: Vec<String>,
    /// Sub-field names of the compound field, in declaration order.
    compound_fields: Vec<String>,
    /// Index in `fields` where the compound sub-fields start.
    compound_start: Option<usize>,
    sample_names: Vec<String>,
}

impl AnnotationSchema {
    pub fn from_metadata(metadata: &VcfMetadata) -> Result<Self> {
        let dialect = detect_dialect(metadata);
        let mut fields: Vec<String> = metadata.infos.iter().map(|i| i.name.clone()).collect();
        let mut compound_fields = Vec::new();
        let mut compound_start = None;

        if dialect == Dialect::SnpEff {
            let position = fields
                .iter()
                .position(|name| name == SNPEFF_FIELD)
                .ok_or_else(|| VcfQcError::format("SnpEff ANN field vanished from header"))?;
            let description = &metadata.infos[position].description;
            compound_fields = parse_compound_description(description)?;

            fields.splice(position..=position, compound_fields.iter().cloned());
            compound_start = Some(position);
        }

        tracing::debug!(
            %dialect,
            fields = fields.len(),
            samples = metadata.sample_names.len(),
            "built annotation schema"
        );

        Ok(Self {
            dialect,
            fields,
            compound_fields,
            compound_start,
            sample_names: metadata.sample_names.clone(),
        })
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn compound_fields(&self) -> &[String] {
        &self.compound_fields
    }

    pub fn sample_names(&self) -> &[String] {
        &self.sample_names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|field| field == name)
    }

    /// Names from `requested` that the schema does not declare, in request order.
    pub fn undeclared<'a>(&self, requested: &'a [String]) -> Vec<&'a str> {
        requested
            .iter()
            .filter(|name| !self.contains(name))
            .map(String::as_str)
            .collect()
    }

    /// Values for every declared field, in schema order. Absent values are `None`.
    pub fn get_info<'s>(&'s self, record: &VariantRecord) -> InfoView<'s> {
        let compound = match self.compound_start {
            Some(_) => unpack_compound(record.info.get(SNPEFF_FIELD)),
            None => Vec::new(),
        };
        let compound_range = self
            .compound_start
            .map(|start| start..start + self.compound_fields.len());

        let values = self
            .fields
            .iter()
            .enumerate()
            .map(|(index, name)| match &compound_range {
                Some(range) if range.contains(&index) => {
                    compound.get(index - range.start).cloned().flatten()
                }
                _ => record.info.get(name).and_then(InfoValue::first),
            })
            .collect();

        InfoView {
            schema: self,
            values,
        }
    }
}

/// A record's annotation values laid out in schema order.
#[derive(Debug, Clone)]
pub struct InfoView<'s> {
    schema: &'s AnnotationSchema,
    values: Vec<Option<String>>,
}

impl InfoView<'_> {
    pub fn get(&self, name: &str) -> Option<&str> {
        let index = self.schema.fields.iter().position(|field| field == name)?;
        self.values[index].as_deref()
    }

    pub fn values(&self) -> &[Option<String>] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.schema
            .fields
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(Option::as_deref))
    }
}

fn detect_dialect(metadata: &VcfMetadata) -> Dialect {
    if metadata.infos.iter().any(|info| info.name == ANNOVAR_MARKER) {
        return Dialect::Annovar;
    }
    let snpeff = metadata.infos.iter().any(|info| {
        info.name == SNPEFF_FIELD && info.description.starts_with(SNPEFF_DESCRIPTION_PREFIX)
    });
    if snpeff { Dialect::SnpEff } else { Dialect::Unknown }
}

/// Sub-field names live in a single-quoted, pipe-delimited list inside the
/// description, e.g. `Functional annotations: 'Allele | Annotation | ...'`.
fn parse_compound_description(description: &str) -> Result<Vec<String>> {
    let quoted = description.split('\'').nth(1).ok_or_else(|| {
        VcfQcError::format(format!(
            "ANN description has no quoted sub-field list: {description}"
        ))
    })?;

    Ok(quoted.split('|').map(|name| name.trim().to_string()).collect())
}

/// Only the first annotation of a multi-annotation ANN value is unpacked.
fn unpack_compound(value: Option<&InfoValue>) -> Vec<Option<String>> {
    let raw = match value {
        Some(InfoValue::Scalar(raw)) => raw.split(',').next().map(str::to_string),
        Some(InfoValue::List(values)) => values.first().cloned().flatten(),
        Some(InfoValue::Flag) | None => None,
    };

    raw.map(|raw| {
        raw.split('|')
            .map(|segment| {
                if segment.is_empty() {
                    None
                } else {
                    Some(segment.to_string())
                }
            })
            .collect()
    })
    .unwrap_or_default()
}
