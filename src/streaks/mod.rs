//! Weighted winning-streak detection and aggregation
//!
//! A streak is a run of wins over consecutively numbered games. Draws
//! inside a run add half a point to the next win. Runs must reach a
//! length above one to count.

pub mod aggregate;
pub mod scanner;

pub use aggregate::{sort_lengths, DistributionSummary, FrequencyBin, FrequencyTable};
pub use scanner::{scan, GameOutcome, RecordTable, ScanOutput, ScanRecord, StreakDetail};
