//! Per-sample counters and histograms accumulated over one or more VCFs.

use std::collections::HashMap;

use serde::Serialize;

use crate::counters::{CounterRegistry, Registration};
use crate::error::{Result, VcfQcError};

/// Histogram bounds shared by every sample of one summary. Two summaries can
/// only be merged when these are identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HistogramConfig {
    pub max_depth: usize,
    pub max_qual: usize,
    pub max_indel_len: usize,
    pub num_afs_bins: usize,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            max_depth: 500,
            max_qual: 250,
            max_indel_len: 100,
            num_afs_bins: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Histogram {
    Depth,
    Qual,
    AlleleFrequency,
    InsertLength,
    DeleteLength,
}

impl Histogram {
    /// Serialization order.
    pub const ALL: [Histogram; 5] = [
        Histogram::Depth,
        Histogram::Qual,
        Histogram::AlleleFrequency,
        Histogram::InsertLength,
        Histogram::DeleteLength,
    ];

    /// Saturating bound, or `None` for the allele frequency spectrum.
    pub fn bound(self, config: &HistogramConfig) -> Option<usize> {
        match self {
            Histogram::Depth => Some(config.max_depth),
            Histogram::Qual => Some(config.max_qual),
            Histogram::InsertLength | Histogram::DeleteLength => Some(config.max_indel_len),
            Histogram::AlleleFrequency => None,
        }
    }

    pub fn len(self, config: &HistogramConfig) -> usize {
        match self.bound(config) {
            Some(max) => max + 1,
            None => config.num_afs_bins,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleSummary {
    counts: Vec<u64>,
    depths: Vec<u64>,
    quals: Vec<u64>,
    afs: Vec<u64>,
    inserts: Vec<u64>,
    deletes: Vec<u64>,
}

impl SampleSummary {
    pub fn new(config: &HistogramConfig, num_counters: usize) -> Self {
        Self {
            counts: vec![0; num_counters],
            depths: vec![0; Histogram::Depth.len(config)],
            quals: vec![0; Histogram::Qual.len(config)],
            afs: vec![0; Histogram::AlleleFrequency.len(config)],
            inserts: vec![0; Histogram::InsertLength.len(config)],
            deletes: vec![0; Histogram::DeleteLength.len(config)],
        }
    }

    /// Counter values in registry slot order.
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn histogram(&self, kind: Histogram) -> &[u64] {
        match kind {
            Histogram::Depth => &self.depths,
            Histogram::Qual => &self.quals,
            Histogram::AlleleFrequency => &self.afs,
            Histogram::InsertLength => &self.inserts,
            Histogram::DeleteLength => &self.deletes,
        }
    }

    /// Slices so that callers can overwrite bins but never resize.
    pub(crate) fn histogram_mut(&mut self, kind: Histogram) -> &mut [u64] {
        match kind {
            Histogram::Depth => &mut self.depths,
            Histogram::Qual => &mut self.quals,
            Histogram::AlleleFrequency => &mut self.afs,
            Histogram::InsertLength => &mut self.inserts,
            Histogram::DeleteLength => &mut self.deletes,
        }
    }

    pub(crate) fn counts_mut(&mut self) -> &mut [u64] {
        &mut self.counts
    }

    /// Replace the counter vector, e.g. after remapping to another registry.
    pub(crate) fn set_counts(&mut self, counts: Vec<u64>) {
        self.counts = counts;
    }

    fn increment_slot(&mut self, slot: usize) {
        self.counts[slot] += 1;
    }

    fn push_counter(&mut self) {
        self.counts.push(0);
    }

    pub fn add_depth(&mut self, depth: usize) {
        saturating_bin(&mut self.depths, depth);
    }

    pub fn add_qual(&mut self, qual: usize) {
        saturating_bin(&mut self.quals, qual);
    }

    pub fn add_insert(&mut self, length: usize) {
        saturating_bin(&mut self.inserts, length);
    }

    pub fn add_delete(&mut self, length: usize) {
        saturating_bin(&mut self.deletes, length);
    }

    /// Bin index is `floor(aaf / num_bins)`, clamped to the last bin.
    pub fn add_aaf(&mut self, aaf: f64) {
        let Some(last) = self.afs.len().checked_sub(1) else {
            return;
        };
        let bin = (aaf / self.afs.len() as f64).floor();
        // NaN and negatives cast to 0
        let bin = (bin as usize).min(last);
        self.afs[bin] += 1;
    }

    /// Element-wise sum. Both sides must share counter layout and histogram
    /// configuration.
    pub(crate) fn absorb(&mut self, other: &SampleSummary) {
        sum_into(&mut self.counts, &other.counts);
        for kind in Histogram::ALL {
            sum_into(self.histogram_mut(kind), other.histogram(kind));
        }
    }
}

fn saturating_bin(bins: &mut [u64], value: usize) {
    if let Some(last) = bins.len().checked_sub(1) {
        bins[value.min(last)] += 1;
    }
}

fn sum_into(target: &mut [u64], source: &[u64]) {
    for (t, s) in target.iter_mut().zip(source) {
        *t += s;
    }
}

/// Summary of one or more VCFs: one [`SampleSummary`] per sample, all keyed by
/// a single shared [`CounterRegistry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcfSummary {
    config: HistogramConfig,
    counters: CounterRegistry,
    sample_names: Vec<String>,
    samples: Vec<SampleSummary>,
    index: HashMap<String, usize>,
}

impl VcfSummary {
    pub fn new(sample_names: Vec<String>, config: HistogramConfig) -> Self {
        Self::with_counters(sample_names, config, CounterRegistry::new())
    }

    pub fn with_counters(
        sample_names: Vec<String>,
        config: HistogramConfig,
        counters: CounterRegistry,
    ) -> Self {
        let mut summary = Self {
            config,
            counters,
            sample_names: Vec::with_capacity(sample_names.len()),
            samples: Vec::with_capacity(sample_names.len()),
            index: HashMap::with_capacity(sample_names.len()),
        };
        for name in sample_names {
            let sample = SampleSummary::new(&config, summary.counters.len());
            summary.push_sample(name, sample);
        }
        summary
    }

    pub fn config(&self) -> &HistogramConfig {
        &self.config
    }

    pub fn counters(&self) -> &CounterRegistry {
        &self.counters
    }

    pub fn counter_names(&self) -> &[String] {
        self.counters.names()
    }

    /// Samples in canonical order.
    pub fn sample_names(&self) -> &[String] {
        &self.sample_names
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Register a counter, back-filling a zero on every sample when new.
    pub fn register(&mut self, name: impl Into<String>) -> usize {
        let registration = self.counters.register(name);
        if let Registration::Added(_) = registration {
            for sample in &mut self.samples {
                sample.push_counter();
            }
        }
        registration.slot()
    }

    pub fn increment(&mut self, sample: &str, counter: &str) -> Result<()> {
        let index = self.sample_index(sample)?;
        self.increment_at(index, counter)
    }

    /// Increment `counter` for the sample at `index` in canonical order.
    pub fn increment_at(&mut self, index: usize, counter: &str) -> Result<()> {
        let slot = self
            .counters
            .slot(counter)
            .ok_or_else(|| VcfQcError::UnregisteredCounter(counter.to_string()))?;
        let sample = self
            .samples
            .get_mut(index)
            .ok_or_else(|| VcfQcError::UnknownSample(format!("#{index}")))?;
        sample.increment_slot(slot);
        Ok(())
    }

    pub fn sample(&self, name: &str) -> Option<&SampleSummary> {
        self.index.get(name).map(|&i| &self.samples[i])
    }

    pub fn sample_at_mut(&mut self, index: usize) -> Option<&mut SampleSummary> {
        self.samples.get_mut(index)
    }

    pub(crate) fn sample_mut(&mut self, name: &str) -> Option<&mut SampleSummary> {
        let index = *self.index.get(name)?;
        Some(&mut self.samples[index])
    }

    pub fn count(&self, sample: &str, counter: &str) -> Option<u64> {
        let slot = self.counters.slot(counter)?;
        self.sample(sample).map(|s| s.counts()[slot])
    }

    /// Counter values for one sample keyed by name.
    pub fn counts_by_name(&self, sample: &str) -> Option<HashMap<&str, u64>> {
        let summary = self.sample(sample)?;
        Some(
            self.counters
                .names()
                .iter()
                .map(String::as_str)
                .zip(summary.counts().iter().copied())
                .collect(),
        )
    }

    /// Append a sample whose counters already follow this summary's slot
    /// layout.
    pub(crate) fn push_sample(&mut self, name: String, sample: SampleSummary) {
        if self.index.contains_key(&name) {
            tracing::warn!(sample = %name, "duplicate sample name ignored");
            return;
        }
        self.index.insert(name.clone(), self.samples.len());
        self.sample_names.push(name);
        self.samples.push(sample);
    }

    fn sample_index(&self, name: &str) -> Result<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| VcfQcError::UnknownSample(name.to_string()))
    }
}
