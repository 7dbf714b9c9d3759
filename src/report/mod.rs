//! CSV output for streaks, details, and frequency tables
//!
//! Per-player files are named after the display name with spaces removed,
//! e.g. `MagnusCarlsen_streaks_ordered.csv`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::streaks::{sort_lengths, FrequencyBin, FrequencyTable, StreakDetail};
use crate::Result;

#[derive(Serialize)]
struct StreakRow {
    #[serde(rename = "Streak")]
    streak: f64,
}

#[derive(Serialize, Deserialize)]
struct FrequencyRow {
    #[serde(rename = "Xi")]
    xi: f64,
    #[serde(rename = "Fi")]
    fi: u64,
}

#[derive(Serialize)]
struct CombinedRow {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Xi")]
    xi: f64,
    #[serde(rename = "Fi")]
    fi: u64,
}

/// Writes analysis outputs under one output directory
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir)?;
        Ok(ReportWriter { output_dir })
    }

    fn player_path(&self, display_name: &str, suffix: &str) -> PathBuf {
        let stem = display_name.replace(' ', "");
        self.output_dir.join(format!("{}_{}", stem, suffix))
    }

    /// Write streak lengths in emission order, and a second file sorted
    /// ascending. Returns the ordered file's path.
    pub fn write_streaks(&self, display_name: &str, lengths: &[f64]) -> Result<PathBuf> {
        let unordered = self.player_path(display_name, "streaks_unordered.csv");
        let mut writer = csv::Writer::from_path(&unordered)?;
        for &streak in lengths {
            writer.serialize(StreakRow { streak })?;
        }
        writer.flush()?;

        let ordered = self.player_path(display_name, "streaks_ordered.csv");
        let mut writer = csv::Writer::from_path(&ordered)?;
        for streak in sort_lengths(lengths) {
            writer.serialize(StreakRow { streak })?;
        }
        writer.flush()?;
        Ok(ordered)
    }

    pub fn write_details(&self, display_name: &str, details: &[StreakDetail]) -> Result<PathBuf> {
        let path = self.player_path(display_name, "streak_details.csv");
        let mut writer = csv::Writer::from_path(&path)?;
        for detail in details {
            writer.serialize(detail)?;
        }
        writer.flush()?;
        Ok(path)
    }

    pub fn write_frequencies(
        &self,
        display_name: &str,
        table: &FrequencyTable,
    ) -> Result<PathBuf> {
        let path = self.player_path(display_name, "frequencies.csv");
        let mut writer = csv::Writer::from_path(&path)?;
        for bin in &table.bins {
            writer.serialize(FrequencyRow {
                xi: bin.value,
                fi: bin.count,
            })?;
        }
        writer.flush()?;
        Ok(path)
    }

    /// Read a previously written per-player frequency file
    pub fn read_frequencies(&self, display_name: &str) -> Result<FrequencyTable> {
        let path = self.player_path(display_name, "frequencies.csv");
        let mut reader = csv::Reader::from_path(&path)?;
        let mut bins = Vec::new();
        for row in reader.deserialize() {
            let row: FrequencyRow = row?;
            bins.push(FrequencyBin {
                value: row.xi,
                count: row.fi,
            });
        }
        Ok(FrequencyTable::from_bins(bins))
    }

    /// Concatenate per-player frequency tables into one file with an ID
    /// column carrying the display name
    pub fn write_combined(&self, entries: &[(String, FrequencyTable)]) -> Result<PathBuf> {
        let path = self.output_dir.join("combined_frequencies.csv");
        let mut writer = csv::Writer::from_path(&path)?;
        for (name, table) in entries {
            for bin in &table.bins {
                writer.serialize(CombinedRow {
                    id: name.clone(),
                    xi: bin.value,
                    fi: bin.count,
                })?;
            }
        }
        writer.flush()?;
        Ok(path)
    }

    pub fn write_import_log(
        &self,
        display_name: &str,
        log: &crate::data::pgn::ImportLog,
    ) -> Result<PathBuf> {
        let path = self.player_path(display_name, "import_log.txt");
        std::fs::write(&path, log.render())?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_streaks_ordered_and_unordered() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path()).unwrap();

        writer
            .write_streaks("Magnus Carlsen", &[3.0, 2.0, 2.5])
            .unwrap();

        let unordered =
            std::fs::read_to_string(dir.path().join("MagnusCarlsen_streaks_unordered.csv"))
                .unwrap();
        assert_eq!(unordered, "Streak\n3.0\n2.0\n2.5\n");

        let ordered =
            std::fs::read_to_string(dir.path().join("MagnusCarlsen_streaks_ordered.csv")).unwrap();
        assert_eq!(ordered, "Streak\n2.0\n2.5\n3.0\n");
    }

    #[test]
    fn test_write_details_header() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path()).unwrap();

        let details = vec![StreakDetail {
            id: 7,
            opponent_elo: 2850,
            elo_diff: -12,
        }];
        let path = writer.write_details("Hikaru Nakamura", &details).unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content, "ID,Opponent_ELO,ELO_Difference\n7,2850,-12\n");
    }

    #[test]
    fn test_frequencies_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path()).unwrap();

        let table = FrequencyTable::from_lengths(&[2.0, 2.0, 3.0]).unwrap();
        writer.write_frequencies("Fabiano Caruana", &table).unwrap();

        let read_back = writer.read_frequencies("Fabiano Caruana").unwrap();
        assert_eq!(read_back, table);
    }

    #[test]
    fn test_write_combined() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path()).unwrap();

        let entries = vec![
            (
                "Magnus Carlsen".to_string(),
                FrequencyTable::from_lengths(&[2.0]).unwrap(),
            ),
            (
                "Hikaru Nakamura".to_string(),
                FrequencyTable::from_lengths(&[2.0, 2.5]).unwrap(),
            ),
        ];
        let path = writer.write_combined(&entries).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(
            content,
            "ID,Xi,Fi\nMagnus Carlsen,2.0,1\nHikaru Nakamura,2.0,1\nHikaru Nakamura,2.5,1\n"
        );
    }
}
