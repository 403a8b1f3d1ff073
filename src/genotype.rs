//! Confidence-scaled genotype codes.
//!
//! The sign carries the call direction (negative for reference, positive for
//! variant) and the magnitude is the supporting read depth relative to the
//! minimum call depth, capped at 1.

use crate::variant::{GenotypeCall, Zygosity};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenotypeRecoder {
    pub min_call_depth: u32,
    /// Placeholder for uncalled genotypes.
    pub missing_gt: String,
}

impl Default for GenotypeRecoder {
    fn default() -> Self {
        Self {
            min_call_depth: 10,
            missing_gt: String::from("NA"),
        }
    }
}

impl GenotypeRecoder {
    pub fn new(min_call_depth: u32, missing_gt: impl Into<String>) -> Self {
        Self {
            min_call_depth,
            missing_gt: missing_gt.into(),
        }
    }

    pub fn recode(&self, call: &GenotypeCall) -> String {
        let depths = call.allele_depths.unwrap_or_default();

        match call.zygosity {
            None => self.missing_gt.clone(),
            Some(Zygosity::HomRef) => {
                let dp = depths.reference;
                if dp >= self.min_call_depth {
                    String::from("-1")
                } else if dp == 0 {
                    String::from("-0")
                } else {
                    (-self.fraction(dp)).to_string()
                }
            }
            Some(Zygosity::Het | Zygosity::HomAlt) => {
                let dp = depths.alternate;
                if dp >= self.min_call_depth {
                    String::from("1")
                } else if dp == 0 {
                    String::from("0")
                } else {
                    self.fraction(dp).to_string()
                }
            }
        }
    }

    fn fraction(&self, depth: u32) -> f64 {
        f64::from(depth) / f64::from(self.min_call_depth)
    }
}
