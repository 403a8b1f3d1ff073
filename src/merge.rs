//! Combining independently produced summaries.

use crate::error::{Result, VcfQcError};
use crate::summary::{SampleSummary, VcfSummary};

/// Summaries merge only when every histogram bound agrees.
pub fn can_merge(a: &VcfSummary, b: &VcfSummary) -> std::result::Result<(), String> {
    let (x, y) = (a.config(), b.config());
    if x.max_indel_len != y.max_indel_len {
        return Err(format!(
            "differing max indel lengths: {} vs. {}",
            x.max_indel_len, y.max_indel_len
        ));
    }
    if x.max_depth != y.max_depth {
        return Err(format!("differing max depths: {} vs. {}", x.max_depth, y.max_depth));
    }
    if x.max_qual != y.max_qual {
        return Err(format!("differing max qual: {} vs. {}", x.max_qual, y.max_qual));
    }
    if x.num_afs_bins != y.num_afs_bins {
        return Err(format!(
            "differing number of AAFS bins: {} vs. {}",
            x.num_afs_bins, y.num_afs_bins
        ));
    }
    Ok(())
}

/// Fold `b` into `a`.
///
/// Counter names known to only one side are registered on the other at zero,
/// then shared samples are summed element-wise and samples unique to `b` are
/// appended after `a`'s samples.
pub fn merge(mut a: VcfSummary, b: VcfSummary) -> Result<VcfSummary> {
    if let Err(reason) = can_merge(&a, &b) {
        tracing::error!(%reason, "unable to merge summaries");
        return Err(VcfQcError::merge(reason));
    }

    for name in b.counter_names() {
        a.register(name.as_str());
    }
    // b's slot -> a's slot
    let remap: Vec<usize> = b
        .counter_names()
        .iter()
        .filter_map(|name| a.counters().slot(name))
        .collect();

    for name in b.sample_names() {
        let Some(incoming) = b.sample(name) else {
            continue;
        };
        let aligned = realign(incoming, &remap, &a);

        match a.sample_mut(name) {
            Some(existing) => existing.absorb(&aligned),
            None => a.push_sample(name.clone(), aligned),
        }
    }

    tracing::debug!(
        samples = a.len(),
        counters = a.counter_names().len(),
        "merged summaries"
    );
    Ok(a)
}

/// Merge any number of summaries left to right.
pub fn merge_all<I>(summaries: I) -> Result<Option<VcfSummary>>
where
    I: IntoIterator<Item = VcfSummary>,
{
    let mut merged: Option<VcfSummary> = None;
    for summary in summaries {
        merged = Some(match merged {
            None => summary,
            Some(acc) => merge(acc, summary)?,
        });
    }
    Ok(merged)
}

/// Copy of `sample` with counters moved to `target`'s slot layout; histograms
/// are unchanged.
fn realign(sample: &SampleSummary, remap: &[usize], target: &VcfSummary) -> SampleSummary {
    let mut aligned = sample.clone();
    let mut counts = vec![0; target.counter_names().len()];
    for (from, &to) in remap.iter().enumerate() {
        counts[to] = sample.counts()[from];
    }
    aligned.set_counts(counts);
    aligned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counters::CounterRegistry;
    use crate::summary::{Histogram, HistogramConfig};

    fn summary(samples: &[&str], counters: &[&str]) -> VcfSummary {
        VcfSummary::with_counters(
            samples.iter().map(|s| s.to_string()).collect(),
            HistogramConfig::default(),
            CounterRegistry::with_names(counters.iter().copied()),
        )
    }

    #[test]
    fn rejects_mismatched_bounds() {
        let a = summary(&["S1"], &[]);
        let b = VcfSummary::new(
            vec!["S1".into()],
            HistogramConfig {
                max_depth: 100,
                ..HistogramConfig::default()
            },
        );
        let reason = can_merge(&a, &b).unwrap_err();
        assert!(reason.contains("max depths: 500 vs. 100"));
        assert!(matches!(
            merge(a, b),
            Err(VcfQcError::MergeIncompatible { .. })
        ));
    }

    #[test]
    fn sums_shared_samples_and_appends_new_ones() {
        let mut a = summary(&["S1", "S2"], &["SNPs"]);
        a.increment("S1", "SNPs").unwrap();
        a.sample_at_mut(0).unwrap().add_depth(7);

        let mut b = summary(&["S3", "S1"], &["Insertions", "SNPs"]);
        b.increment("S1", "SNPs").unwrap();
        b.increment("S1", "Insertions").unwrap();
        b.increment("S3", "Insertions").unwrap();
        b.sample_at_mut(1).unwrap().add_depth(7);

        let merged = merge(a, b).unwrap();
        assert_eq!(merged.sample_names(), ["S1", "S2", "S3"]);
        assert_eq!(merged.counter_names(), ["SNPs", "Insertions"]);
        assert_eq!(merged.count("S1", "SNPs"), Some(2));
        assert_eq!(merged.count("S1", "Insertions"), Some(1));
        assert_eq!(merged.count("S2", "Insertions"), Some(0));
        assert_eq!(merged.count("S3", "Insertions"), Some(1));
        assert_eq!(merged.count("S3", "SNPs"), Some(0));
        assert_eq!(merged.sample("S1").unwrap().histogram(Histogram::Depth)[7], 2);
    }

    #[test]
    fn merge_all_folds_in_order() {
        let mut parts = Vec::new();
        for name in ["S1", "S2", "S1"] {
            let mut part = summary(&[name], &["Called GT"]);
            part.increment(name, "Called GT").unwrap();
            parts.push(part);
        }
        let merged = merge_all(parts).unwrap().unwrap();
        assert_eq!(merged.sample_names(), ["S1", "S2"]);
        assert_eq!(merged.count("S1", "Called GT"), Some(2));
        assert!(merge_all(Vec::new()).unwrap().is_none());
    }
}
