//! Single forward pass streak detection over sequential game records

use serde::Serialize;
use std::collections::HashMap;

use crate::{ChessError, GameRecord, Result};

/// Outcome of a game from the tracked player's perspective
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    Win,
    Draw,
    Loss,
}

/// A single game as the scanner sees it
#[derive(Debug, Clone)]
pub struct ScanRecord {
    pub id: i64,
    pub outcome: GameOutcome,
    pub opponent_elo: i64,
    pub elo_diff: i64,
}

/// Per-game detail emitted for every game inside a counted streak
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreakDetail {
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(rename = "Opponent_ELO")]
    pub opponent_elo: i64,
    #[serde(rename = "ELO_Difference")]
    pub elo_diff: i64,
}

/// Ordered table of scan records with by-id lookup
pub struct RecordTable {
    records: Vec<ScanRecord>,
    index: HashMap<i64, usize>,
}

impl RecordTable {
    /// Sorts records ascending by id
    pub fn new(mut records: Vec<ScanRecord>) -> Self {
        records.sort_by_key(|r| r.id);
        let index = records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id, i))
            .collect();
        RecordTable { records, index }
    }

    /// Build from processed games, resolving the winner column against the
    /// literal name the player appears under in PGN headers. A winner of
    /// "Draw" is a draw; anything else, including no winner, is a loss.
    pub fn from_games(games: &[GameRecord], winner_name: &str) -> Self {
        let records = games
            .iter()
            .map(|g| ScanRecord {
                id: g.seq,
                outcome: match g.winner.as_deref() {
                    Some(w) if w == winner_name => GameOutcome::Win,
                    Some("Draw") => GameOutcome::Draw,
                    _ => GameOutcome::Loss,
                },
                opponent_elo: g.opponent_elo,
                elo_diff: g.elo_diff,
            })
            .collect();
        Self::new(records)
    }

    pub fn get(&self, id: i64) -> Option<&ScanRecord> {
        self.index.get(&id).map(|&i| &self.records[i])
    }

    pub fn records(&self) -> &[ScanRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Result of a scan: streak lengths in emission order plus the per-game
/// details of every counted streak
#[derive(Debug, Default)]
pub struct ScanOutput {
    pub lengths: Vec<f64>,
    pub details: Vec<StreakDetail>,
}

/// Detect weighted winning streaks in one forward pass.
///
/// A win over a consecutive id opens or extends a streak; a draw inside an
/// open streak defers half a point to the next win; a loss or an id gap
/// closes the streak. Only streaks longer than one game are emitted.
///
/// A draw inside an open streak contributes its detail row immediately,
/// even when no further win arrives and the half point is never banked.
/// Downstream per-streak sums therefore include trailing draws; this
/// matches the historical output and is covered by tests.
pub fn scan(table: &RecordTable) -> Result<ScanOutput> {
    let mut lengths = Vec::new();
    let mut details = Vec::new();

    let mut current_streak = 0.0f64;
    let mut streak_open_id: Option<i64> = None;
    let mut streak_details: Vec<StreakDetail> = Vec::new();
    let mut last_id: Option<i64> = None;
    let mut pending_draw = 0.0f64;

    for record in table.records() {
        let id = record.id;
        let is_sequential = last_id.map_or(true, |last| id == last + 1);

        match record.outcome {
            GameOutcome::Win => {
                if streak_open_id.is_none() || !is_sequential {
                    if current_streak > 1.0 {
                        lengths.push(current_streak);
                        details.append(&mut streak_details);
                    }
                    current_streak = 1.0;
                    streak_open_id = Some(id);
                    streak_details = vec![StreakDetail {
                        id,
                        opponent_elo: record.opponent_elo,
                        elo_diff: record.elo_diff,
                    }];
                    pending_draw = 0.0;
                } else {
                    current_streak += 1.0 + pending_draw;
                    // Every id since the previous game belongs to the streak
                    // and must be present in the table.
                    let from = match last_id {
                        Some(last) => last + 1,
                        None => id,
                    };
                    for detail_id in from..=id {
                        let rec = table
                            .get(detail_id)
                            .ok_or(ChessError::MissingGame(detail_id))?;
                        streak_details.push(StreakDetail {
                            id: detail_id,
                            opponent_elo: rec.opponent_elo,
                            elo_diff: rec.elo_diff,
                        });
                    }
                    pending_draw = 0.0;
                }
            }
            GameOutcome::Draw if is_sequential => {
                if streak_open_id.is_some() {
                    pending_draw = 0.5;
                    streak_details.push(StreakDetail {
                        id,
                        opponent_elo: record.opponent_elo,
                        elo_diff: record.elo_diff,
                    });
                } else {
                    // A draw before any win does not open a streak
                    pending_draw = 0.0;
                }
            }
            _ => {
                if current_streak > 1.0 {
                    lengths.push(current_streak);
                    details.append(&mut streak_details);
                }
                current_streak = 0.0;
                streak_open_id = None;
                streak_details.clear();
                pending_draw = 0.0;
            }
        }

        last_id = Some(id);
    }

    // Flush a streak still open at end of input
    if current_streak > 1.0 {
        lengths.push(current_streak);
        details.append(&mut streak_details);
    }

    Ok(ScanOutput { lengths, details })
}
