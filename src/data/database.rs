//! SQLite storage for tracked players and their processed games

use crate::{
    ChessError, Color, GameRecord, Player, PlayerConfig, PlayerId, Result, TimeClass, Venue,
};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Database connection and operations
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS players (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                display_name TEXT NOT NULL,
                winner_name TEXT NOT NULL,
                aliases TEXT DEFAULT '[]'
            );

            CREATE TABLE IF NOT EXISTS games (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                player_id INTEGER NOT NULL REFERENCES players(id),
                seq INTEGER NOT NULL,
                date TEXT,
                event TEXT NOT NULL,
                site TEXT NOT NULL,
                white TEXT NOT NULL,
                black TEXT NOT NULL,
                color TEXT NOT NULL,
                winner TEXT,
                player_elo INTEGER NOT NULL,
                opponent_elo INTEGER NOT NULL,
                elo_diff INTEGER NOT NULL,
                moves INTEGER NOT NULL,
                time_class TEXT NOT NULL,
                venue TEXT NOT NULL,
                UNIQUE(player_id, seq)
            );

            CREATE INDEX IF NOT EXISTS idx_games_player_class ON games(player_id, time_class);
            "#,
        )?;
        Ok(())
    }

    // ==================== Player Operations ====================

    /// Get or create a player from its configuration
    pub fn get_or_create_player(&self, config: &PlayerConfig) -> Result<Player> {
        if let Some(player) = self.find_player_by_name(&config.username)? {
            return Ok(player);
        }

        let aliases_json = serde_json::to_string(&config.aliases)
            .map_err(|e| ChessError::Parse(e.to_string()))?;
        self.conn.execute(
            "INSERT INTO players (username, display_name, winner_name, aliases)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                config.username,
                config.display_name,
                config.winner_name,
                aliases_json
            ],
        )?;

        let id = PlayerId(self.conn.last_insert_rowid());
        Ok(Player {
            id,
            username: config.username.clone(),
            display_name: config.display_name.clone(),
            winner_name: config.winner_name.clone(),
            aliases: config.aliases.clone(),
        })
    }

    /// Find a player by username, display name, or alias
    pub fn find_player_by_name(&self, name: &str) -> Result<Option<Player>> {
        let name_lower = name.to_lowercase();

        let player: Option<Player> = self
            .conn
            .query_row(
                "SELECT id, username, display_name, winner_name, aliases FROM players
                 WHERE LOWER(username) = ?1 OR LOWER(display_name) = ?1",
                params![&name_lower],
                Self::row_to_player,
            )
            .optional()?;

        if player.is_some() {
            return Ok(player);
        }

        // Check aliases
        let players = self.get_all_players()?;
        for player in players {
            if player.matches_name(name) {
                return Ok(Some(player));
            }
        }

        Ok(None)
    }

    /// Get player by ID
    pub fn get_player(&self, id: PlayerId) -> Result<Player> {
        self.conn
            .query_row(
                "SELECT id, username, display_name, winner_name, aliases FROM players
                 WHERE id = ?1",
                params![id.0],
                Self::row_to_player,
            )
            .map_err(|_| ChessError::UnknownPlayer(id.to_string()))
    }

    /// Get all players
    pub fn get_all_players(&self) -> Result<Vec<Player>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, username, display_name, winner_name, aliases FROM players
             ORDER BY username",
        )?;

        let players = stmt
            .query_map([], Self::row_to_player)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(players)
    }

    fn row_to_player(row: &rusqlite::Row) -> rusqlite::Result<Player> {
        let aliases_json: String = row.get(4)?;
        let aliases: Vec<String> = serde_json::from_str(&aliases_json).unwrap_or_default();
        Ok(Player {
            id: PlayerId(row.get(0)?),
            username: row.get(1)?,
            display_name: row.get(2)?,
            winner_name: row.get(3)?,
            aliases,
        })
    }

    // ==================== Game Operations ====================

    /// Insert or update one processed game
    pub fn upsert_game(&self, player_id: PlayerId, game: &GameRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO games (player_id, seq, date, event, site, white, black, color,
                               winner, player_elo, opponent_elo, elo_diff, moves,
                               time_class, venue)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            ON CONFLICT(player_id, seq) DO UPDATE SET
                date = excluded.date,
                event = excluded.event,
                site = excluded.site,
                white = excluded.white,
                black = excluded.black,
                color = excluded.color,
                winner = excluded.winner,
                player_elo = excluded.player_elo,
                opponent_elo = excluded.opponent_elo,
                elo_diff = excluded.elo_diff,
                moves = excluded.moves,
                time_class = excluded.time_class,
                venue = excluded.venue
            "#,
            params![
                player_id.0,
                game.seq,
                game.date.map(|d| d.format("%Y-%m-%d").to_string()),
                game.event,
                game.site,
                game.white,
                game.black,
                game.color.code(),
                game.winner,
                game.player_elo,
                game.opponent_elo,
                game.elo_diff,
                game.moves,
                game.time_class.code(),
                game.venue.code(),
            ],
        )?;
        Ok(())
    }

    /// Insert multiple processed games
    pub fn upsert_games(&self, player_id: PlayerId, games: &[GameRecord]) -> Result<usize> {
        let mut count = 0;
        for game in games {
            self.upsert_game(player_id, game)?;
            count += 1;
        }
        Ok(count)
    }

    /// Get a player's games ordered by sequential id, optionally restricted
    /// to one time class
    pub fn get_player_games(
        &self,
        player_id: PlayerId,
        time_class: Option<TimeClass>,
    ) -> Result<Vec<GameRecord>> {
        match time_class {
            Some(class) => {
                let mut stmt = self.conn.prepare(
                    "SELECT seq, date, event, site, white, black, color, winner,
                            player_elo, opponent_elo, elo_diff, moves, time_class, venue
                     FROM games
                     WHERE player_id = ?1 AND time_class = ?2
                     ORDER BY seq",
                )?;
                let games = stmt
                    .query_map(params![player_id.0, class.code()], Self::row_to_game)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(games)
            }
            None => {
                let mut stmt = self.conn.prepare(
                    "SELECT seq, date, event, site, white, black, color, winner,
                            player_elo, opponent_elo, elo_diff, moves, time_class, venue
                     FROM games
                     WHERE player_id = ?1
                     ORDER BY seq",
                )?;
                let games = stmt
                    .query_map(params![player_id.0], Self::row_to_game)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(games)
            }
        }
    }

    fn row_to_game(row: &rusqlite::Row) -> rusqlite::Result<GameRecord> {
        let date_str: Option<String> = row.get(1)?;
        let date = date_str.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok());

        let color_str: String = row.get(6)?;
        let class_str: String = row.get(12)?;
        let venue_str: String = row.get(13)?;

        Ok(GameRecord {
            seq: row.get(0)?,
            date,
            event: row.get(2)?,
            site: row.get(3)?,
            white: row.get(4)?,
            black: row.get(5)?,
            color: Color::from_code(&color_str).unwrap_or(Color::White),
            winner: row.get(7)?,
            player_elo: row.get(8)?,
            opponent_elo: row.get(9)?,
            elo_diff: row.get(10)?,
            moves: row.get(11)?,
            time_class: TimeClass::from_code(&class_str).unwrap_or(TimeClass::Blitz),
            venue: Venue::from_code(&venue_str).unwrap_or(Venue::Offline),
        })
    }

    // ==================== Statistics ====================

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let player_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM players", [], |row| row.get(0))?;

        let game_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM games", [], |row| row.get(0))?;

        let mut stmt = self.conn.prepare(
            "SELECT time_class, COUNT(*) FROM games GROUP BY time_class ORDER BY time_class",
        )?;
        let class_counts = stmt
            .query_map([], |row| {
                let class: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok((class, count as usize))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let min_date: Option<String> = self
            .conn
            .query_row("SELECT MIN(date) FROM games", [], |row| row.get(0))
            .optional()?
            .flatten();

        let max_date: Option<String> = self
            .conn
            .query_row("SELECT MAX(date) FROM games", [], |row| row.get(0))
            .optional()?
            .flatten();

        Ok(DatabaseStats {
            player_count: player_count as usize,
            game_count: game_count as usize,
            class_counts,
            earliest_game: min_date.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
            latest_game: max_date.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        })
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub player_count: usize,
    pub game_count: usize,
    pub class_counts: Vec<(String, usize)>,
    pub earliest_game: Option<NaiveDate>,
    pub latest_game: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hikaru_config() -> PlayerConfig {
        PlayerConfig {
            username: "hikaru".to_string(),
            display_name: "Hikaru Nakamura".to_string(),
            winner_name: "Hikaru".to_string(),
            aliases: vec!["Nakamura, Hikaru".to_string()],
        }
    }

    fn make_game(seq: i64, time_class: TimeClass, winner: Option<&str>) -> GameRecord {
        GameRecord {
            seq,
            date: NaiveDate::from_ymd_opt(2024, 3, 1),
            event: "November Titled Tuesday".to_string(),
            site: "Chess.com".to_string(),
            white: "Hikaru".to_string(),
            black: "Opponent".to_string(),
            color: Color::White,
            winner: winner.map(|w| w.to_string()),
            player_elo: 3200,
            opponent_elo: 3000,
            elo_diff: 200,
            moves: 42,
            time_class,
            venue: Venue::Online,
        }
    }

    #[test]
    fn test_create_database() {
        let db = Database::in_memory().unwrap();
        let stats = db.get_stats().unwrap();
        assert_eq!(stats.player_count, 0);
        assert_eq!(stats.game_count, 0);
    }

    #[test]
    fn test_create_player() {
        let db = Database::in_memory().unwrap();
        let player = db.get_or_create_player(&hikaru_config()).unwrap();
        assert_eq!(player.username, "hikaru");
        assert_eq!(player.winner_name, "Hikaru");

        // Getting again should return same player
        let player2 = db.get_or_create_player(&hikaru_config()).unwrap();
        assert_eq!(player.id.0, player2.id.0);
    }

    #[test]
    fn test_find_player_by_alias() {
        let db = Database::in_memory().unwrap();
        db.get_or_create_player(&hikaru_config()).unwrap();

        let by_display = db.find_player_by_name("Hikaru Nakamura").unwrap();
        assert!(by_display.is_some());
        let by_alias = db.find_player_by_name("Nakamura, Hikaru").unwrap();
        assert!(by_alias.is_some());
        assert!(db.find_player_by_name("Carlsen").unwrap().is_none());
    }

    #[test]
    fn test_insert_and_query_games() {
        let db = Database::in_memory().unwrap();
        let player = db.get_or_create_player(&hikaru_config()).unwrap();

        let games = vec![
            make_game(1, TimeClass::Blitz, Some("Hikaru")),
            make_game(2, TimeClass::Bullet, Some("Opponent")),
            make_game(3, TimeClass::Blitz, Some("Draw")),
        ];
        let count = db.upsert_games(player.id, &games).unwrap();
        assert_eq!(count, 3);

        let all = db.get_player_games(player.id, None).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].seq, 1);

        let blitz = db
            .get_player_games(player.id, Some(TimeClass::Blitz))
            .unwrap();
        assert_eq!(blitz.len(), 2);
        let seqs: Vec<i64> = blitz.iter().map(|g| g.seq).collect();
        assert_eq!(seqs, vec![1, 3]);
        assert_eq!(blitz[1].winner.as_deref(), Some("Draw"));
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let db = Database::in_memory().unwrap();
        let player = db.get_or_create_player(&hikaru_config()).unwrap();

        let game = make_game(1, TimeClass::Blitz, Some("Hikaru"));
        db.upsert_game(player.id, &game).unwrap();

        let mut updated = game.clone();
        updated.winner = Some("Opponent".to_string());
        db.upsert_game(player.id, &updated).unwrap();

        let games = db.get_player_games(player.id, None).unwrap();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].winner.as_deref(), Some("Opponent"));
    }

    #[test]
    fn test_stats_class_counts() {
        let db = Database::in_memory().unwrap();
        let player = db.get_or_create_player(&hikaru_config()).unwrap();
        db.upsert_games(
            player.id,
            &[
                make_game(1, TimeClass::Blitz, None),
                make_game(2, TimeClass::Blitz, None),
                make_game(3, TimeClass::Rapid, None),
            ],
        )
        .unwrap();

        let stats = db.get_stats().unwrap();
        assert_eq!(stats.player_count, 1);
        assert_eq!(stats.game_count, 3);
        assert!(stats
            .class_counts
            .contains(&("blitz".to_string(), 2)));
        assert_eq!(stats.earliest_game, NaiveDate::from_ymd_opt(2024, 3, 1));
    }
}
