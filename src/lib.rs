//! Chess winning-streak analysis from chess.com archives
//!
//! Downloads monthly PGN archives for a set of tracked players, classifies
//! games by time control and venue, and computes weighted winning streaks
//! with their frequency distributions.

pub mod classify;
pub mod data;
pub mod report;
pub mod streaks;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Unique identifier for a tracked player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub i64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Player({})", self.0)
    }
}

/// Time control class of a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeClass {
    Bullet,
    Blitz,
    Rapid,
    Classical,
    Daily,
}

impl TimeClass {
    pub fn code(&self) -> &'static str {
        match self {
            TimeClass::Bullet => "bullet",
            TimeClass::Blitz => "blitz",
            TimeClass::Rapid => "rapid",
            TimeClass::Classical => "classical",
            TimeClass::Daily => "daily",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_lowercase().as_str() {
            "bullet" => Some(TimeClass::Bullet),
            "blitz" => Some(TimeClass::Blitz),
            "rapid" => Some(TimeClass::Rapid),
            "classical" => Some(TimeClass::Classical),
            "daily" => Some(TimeClass::Daily),
            _ => None,
        }
    }
}

impl fmt::Display for TimeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Where a game was played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Venue {
    Online,
    Offline,
}

impl Venue {
    pub fn code(&self) -> &'static str {
        match self {
            Venue::Online => "online",
            Venue::Offline => "offline",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_lowercase().as_str() {
            "online" => Some(Venue::Online),
            "offline" => Some(Venue::Offline),
            _ => None,
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Side the tracked player played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn code(&self) -> &'static str {
        match self {
            Color::White => "white",
            Color::Black => "black",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_lowercase().as_str() {
            "white" => Some(Color::White),
            "black" => Some(Color::Black),
            _ => None,
        }
    }
}

/// A tracked player with the names they appear under in PGN headers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub username: String,
    pub display_name: String,
    /// Literal name the player carries in the winner column of processed
    /// games (the chess.com header name)
    pub winner_name: String,
    pub aliases: Vec<String>,
}

impl Player {
    pub fn matches_name(&self, name: &str) -> bool {
        let name_lower = name.to_lowercase();
        self.username.to_lowercase() == name_lower
            || self.display_name.to_lowercase() == name_lower
            || self.aliases.iter().any(|a| a.to_lowercase() == name_lower)
    }

    /// Token-based match against a White/Black PGN header.
    ///
    /// An alias matches when every one of its tokens (split on commas and
    /// whitespace, case-insensitive) appears among the header's tokens, so
    /// "Magnus Carlsen" matches the header "Carlsen, Magnus".
    pub fn matches_header_name(&self, header_name: &str) -> bool {
        let header_tokens = name_tokens(header_name);
        std::iter::once(self.display_name.as_str())
            .chain(self.aliases.iter().map(|a| a.as_str()))
            .any(|alias| {
                let alias_tokens = name_tokens(alias);
                !alias_tokens.is_empty()
                    && alias_tokens.iter().all(|t| header_tokens.contains(t))
            })
    }
}

fn name_tokens(name: &str) -> Vec<String> {
    name.to_lowercase()
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

/// A single processed game from the tracked player's perspective
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRecord {
    /// Sequential id assigned in chronological order (1-based)
    pub seq: i64,
    pub date: Option<NaiveDate>,
    pub event: String,
    pub site: String,
    pub white: String,
    pub black: String,
    pub color: Color,
    /// Name of the winning side as it appears in the headers, or "Draw"
    pub winner: Option<String>,
    pub player_elo: i64,
    pub opponent_elo: i64,
    /// Player Elo minus opponent Elo
    pub elo_diff: i64,
    pub moves: u32,
    pub time_class: TimeClass,
    pub venue: Venue,
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum ChessError {
    #[error("Archive retrieval failed for {username}: {message}")]
    Archive { username: String, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Unknown player: {0}")]
    UnknownPlayer(String),

    #[error("Game {0} missing from record table")]
    MissingGame(i64),

    #[error("No streaks longer than one game were found")]
    EmptyStreaks,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, ChessError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub players: Vec<PlayerConfig>,
    pub data: DataConfig,
    pub analysis: AnalysisConfig,
}

/// One tracked player as configured
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// chess.com username used for archive retrieval
    pub username: String,
    pub display_name: String,
    /// Name the player appears under in the winner column
    pub winner_name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub database_path: String,
    pub archive_dir: String,
    pub output_dir: String,
    /// TOML file with ordered event-keyword classification rules
    pub time_control_rules: String,
    pub api_base: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Time class the streak analysis runs over
    pub time_class: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            players: vec![
                PlayerConfig {
                    username: "magnuscarlsen".to_string(),
                    display_name: "Magnus Carlsen".to_string(),
                    winner_name: "MagnusCarlsen".to_string(),
                    aliases: vec![
                        "Carlsen".to_string(),
                        "Carlsen Magnus (NOR)".to_string(),
                        "Carlsen, Magnus".to_string(),
                        "Carlsen,M".to_string(),
                        "Carlsen, M.".to_string(),
                        "Magnus".to_string(),
                        "Magnus C.".to_string(),
                        "C., Magnus".to_string(),
                        "MagnusCarlsen".to_string(),
                    ],
                },
                PlayerConfig {
                    username: "hikaru".to_string(),
                    display_name: "Hikaru Nakamura".to_string(),
                    winner_name: "Hikaru".to_string(),
                    aliases: vec![
                        "Nakamura, Hi".to_string(),
                        "Nakamura, Hikaru".to_string(),
                        "Hikaru".to_string(),
                        "Nakamura".to_string(),
                    ],
                },
                PlayerConfig {
                    username: "fabianocaruana".to_string(),
                    display_name: "Fabiano Caruana".to_string(),
                    winner_name: "FabianoCaruana".to_string(),
                    aliases: vec![
                        "Caruana, Fabiano".to_string(),
                        "Caruana, F.".to_string(),
                        "Fabiano C.".to_string(),
                        "Caruana Fabiano (ITA)".to_string(),
                        "Caruana".to_string(),
                        "FabianoCaruana".to_string(),
                    ],
                },
            ],
            data: DataConfig {
                database_path: "data/chess.db".to_string(),
                archive_dir: "data/archives".to_string(),
                output_dir: "data/analysis".to_string(),
                time_control_rules: "data/time_control_rules.toml".to_string(),
                api_base: "https://api.chess.com".to_string(),
            },
            analysis: AnalysisConfig {
                time_class: "blitz".to_string(),
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ChessError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| ChessError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ChessError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Find a configured player by username or display name
    pub fn find_player(&self, name: &str) -> Option<&PlayerConfig> {
        let name_lower = name.to_lowercase();
        self.players.iter().find(|p| {
            p.username.to_lowercase() == name_lower || p.display_name.to_lowercase() == name_lower
        })
    }

    /// The time class analysis runs over, validated
    pub fn analysis_time_class(&self) -> Result<TimeClass> {
        TimeClass::from_code(&self.analysis.time_class).ok_or_else(|| {
            ChessError::Config(format!(
                "Unknown time class '{}' in [analysis]",
                self.analysis.time_class
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn carlsen() -> Player {
        Player {
            id: PlayerId(1),
            username: "magnuscarlsen".to_string(),
            display_name: "Magnus Carlsen".to_string(),
            winner_name: "MagnusCarlsen".to_string(),
            aliases: vec![
                "Carlsen, Magnus".to_string(),
                "Carlsen,M".to_string(),
                "MagnusCarlsen".to_string(),
            ],
        }
    }

    #[test]
    fn test_matches_header_name_token_order() {
        let player = carlsen();
        assert!(player.matches_header_name("Carlsen, Magnus"));
        assert!(player.matches_header_name("Magnus Carlsen"));
        assert!(player.matches_header_name("MagnusCarlsen"));
    }

    #[test]
    fn test_matches_header_name_rejects_other_players() {
        let player = carlsen();
        assert!(!player.matches_header_name("Nakamura, Hikaru"));
        assert!(!player.matches_header_name("Carlsen"));
    }

    #[test]
    fn test_matches_name_exact() {
        let player = carlsen();
        assert!(player.matches_name("magnuscarlsen"));
        assert!(player.matches_name("Magnus Carlsen"));
        assert!(!player.matches_name("Magnus"));
    }

    #[test]
    fn test_time_class_codes_round_trip() {
        for class in [
            TimeClass::Bullet,
            TimeClass::Blitz,
            TimeClass::Rapid,
            TimeClass::Classical,
            TimeClass::Daily,
        ] {
            assert_eq!(TimeClass::from_code(class.code()), Some(class));
        }
        assert_eq!(TimeClass::from_code("correspondence"), None);
    }

    #[test]
    fn test_default_config_has_three_players() {
        let config = Config::default();
        assert_eq!(config.players.len(), 3);
        assert!(config.find_player("hikaru").is_some());
        assert!(config.find_player("Fabiano Caruana").is_some());
        assert!(config.find_player("nobody").is_none());
        assert_eq!(config.analysis_time_class().unwrap(), TimeClass::Blitz);
    }
}
