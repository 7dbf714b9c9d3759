//! Frequency tables and summary statistics over streak lengths

use serde::{Deserialize, Serialize};

use crate::{ChessError, Result};

/// One bucket of the dense half-step frequency grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBin {
    #[serde(rename = "Xi")]
    pub value: f64,
    #[serde(rename = "Fi")]
    pub count: u64,
}

/// Dense frequency table over streak lengths, from 2.0 up to the maximum
/// observed length in half steps. Buckets with zero observations are kept
/// so the grid stays contiguous.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyTable {
    pub bins: Vec<FrequencyBin>,
}

impl FrequencyTable {
    pub fn from_lengths(lengths: &[f64]) -> Result<Self> {
        if lengths.is_empty() {
            return Err(ChessError::EmptyStreaks);
        }

        // Compare in half units to dodge float equality
        let halves: Vec<i64> = lengths.iter().map(|&l| (l * 2.0).round() as i64).collect();
        let Some(max) = halves.iter().copied().max() else {
            return Err(ChessError::EmptyStreaks);
        };

        let mut bins = Vec::new();
        let mut h = 4i64; // 2.0
        while h <= max {
            let count = halves.iter().filter(|&&x| x == h).count() as u64;
            bins.push(FrequencyBin {
                value: h as f64 / 2.0,
                count,
            });
            h += 1;
        }
        Ok(FrequencyTable { bins })
    }

    pub fn from_bins(bins: Vec<FrequencyBin>) -> Self {
        FrequencyTable { bins }
    }

    /// Highest grid value
    pub fn max_value(&self) -> Option<f64> {
        self.bins.last().map(|b| b.value)
    }

    pub fn total_count(&self) -> u64 {
        self.bins.iter().map(|b| b.count).sum()
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }
}

/// Sort streak lengths ascending
pub fn sort_lengths(lengths: &[f64]) -> Vec<f64> {
    let mut sorted = lengths.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Summary statistics computed from an expanded frequency table
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionSummary {
    pub mean: f64,
    pub median: f64,
    /// Grid value with the highest frequency (first on ties)
    pub mode: f64,
    pub p1: f64,
    pub p5: f64,
    pub q1: f64,
    pub q3: f64,
    pub p99: f64,
    /// Highest grid value and its frequency
    pub max_value: f64,
    pub max_frequency: u64,
}

impl DistributionSummary {
    pub fn from_table(table: &FrequencyTable) -> Result<Self> {
        let mut data = Vec::with_capacity(table.total_count() as usize);
        for bin in &table.bins {
            for _ in 0..bin.count {
                data.push(bin.value);
            }
        }
        if data.is_empty() {
            return Err(ChessError::EmptyStreaks);
        }
        // Grid order means data is already ascending

        let mean = data.iter().sum::<f64>() / data.len() as f64;

        // Ties resolve to the first bin
        let mode = table
            .bins
            .iter()
            .find(|b| table.bins.iter().all(|other| other.count <= b.count))
            .map(|b| b.value)
            .unwrap_or(0.0);

        let (max_value, max_frequency) = match table.bins.last() {
            Some(bin) => (bin.value, bin.count),
            None => return Err(ChessError::EmptyStreaks),
        };

        Ok(DistributionSummary {
            mean: round2(mean),
            median: round2(percentile(&data, 50.0)),
            mode,
            p1: round2(percentile(&data, 1.0)),
            p5: round2(percentile(&data, 5.0)),
            q1: round2(percentile(&data, 25.0)),
            q3: round2(percentile(&data, 75.0)),
            p99: round2(percentile(&data, 99.0)),
            max_value,
            max_frequency,
        })
    }
}

/// Linearly interpolated percentile over ascending data
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    let frac = rank - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
