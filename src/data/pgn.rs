//! PGN ingestion: parse monthly archive files, order games chronologically,
//! and turn them into processed game records for one tracked player.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use pgn_reader::{RawComment, RawTag, Reader, SanPlus, Skip, Visitor};
use std::mem;
use std::ops::ControlFlow;
use std::path::Path;

use crate::classify::{classify_venue, TimeControlClassifier};
use crate::{Color, GameRecord, Player, Result};

/// Headers and move count of one game straight out of a PGN file
#[derive(Debug, Clone, Default)]
pub struct RawGame {
    pub event: String,
    pub site: String,
    pub link: String,
    pub white: String,
    pub black: String,
    pub result: String,
    pub white_elo: String,
    pub black_elo: String,
    pub utc_date: String,
    pub utc_time: String,
    pub time_control: String,
    pub moves: u32,
}

impl RawGame {
    /// UTC timestamp used for chronological ordering; None when either
    /// header is missing or malformed
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        let date = NaiveDate::parse_from_str(&self.utc_date, "%Y.%m.%d").ok()?;
        let time = NaiveTime::parse_from_str(&self.utc_time, "%H:%M:%S").ok()?;
        Some(NaiveDateTime::new(date, time))
    }

    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.utc_date, "%Y.%m.%d").ok()
    }
}

/// Streaming PGN visitor that collects the headers the pipeline needs and
/// counts mainline moves. Variations are skipped.
pub struct GameVisitor {
    headers: RawGame,
    pub current_game: Option<RawGame>,
}

impl Default for GameVisitor {
    fn default() -> Self {
        Self::new()
    }
}

impl GameVisitor {
    pub fn new() -> Self {
        GameVisitor {
            headers: RawGame::default(),
            current_game: None,
        }
    }

    fn set_known_tag(&mut self, key: &[u8], value: RawTag<'_>) {
        let slot: &mut String = match key {
            b"Event" => &mut self.headers.event,
            b"Site" => &mut self.headers.site,
            b"Link" => &mut self.headers.link,
            b"White" => &mut self.headers.white,
            b"Black" => &mut self.headers.black,
            b"Result" => &mut self.headers.result,
            b"WhiteElo" => &mut self.headers.white_elo,
            b"BlackElo" => &mut self.headers.black_elo,
            b"UTCDate" => &mut self.headers.utc_date,
            b"UTCTime" => &mut self.headers.utc_time,
            b"TimeControl" => &mut self.headers.time_control,
            _ => return,
        };

        // First occurrence wins
        if !slot.is_empty() {
            return;
        }

        let bytes = value.as_bytes();
        if bytes.is_empty() {
            return;
        }
        *slot = String::from_utf8_lossy(bytes).into_owned();
    }
}

impl Visitor for GameVisitor {
    type Tags = ();
    type Movetext = ();
    type Output = ();

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        self.headers = RawGame::default();
        self.current_game = None;
        ControlFlow::Continue(())
    }

    fn tag(
        &mut self,
        _: &mut Self::Tags,
        key: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        self.set_known_tag(key, value);
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, _: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        ControlFlow::Continue(())
    }

    fn begin_variation(&mut self, _: &mut Self::Movetext) -> ControlFlow<Self::Output, Skip> {
        ControlFlow::Continue(Skip(true))
    }

    fn san(&mut self, _: &mut Self::Movetext, _: SanPlus) -> ControlFlow<Self::Output> {
        self.headers.moves += 1;
        ControlFlow::Continue(())
    }

    fn comment(&mut self, _: &mut Self::Movetext, _: RawComment<'_>) -> ControlFlow<Self::Output> {
        ControlFlow::Continue(())
    }

    fn end_game(&mut self, _: Self::Movetext) -> Self::Output {
        self.current_game = Some(mem::take(&mut self.headers));
    }
}

/// Parse every game in one PGN file
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Vec<RawGame>> {
    let file = std::fs::File::open(path.as_ref())?;
    parse_reader(std::io::BufReader::new(file))
}

/// Parse every game from a reader
pub fn parse_reader<R: std::io::Read>(input: R) -> Result<Vec<RawGame>> {
    let mut reader = Reader::new(input);
    let mut visitor = GameVisitor::new();
    let mut games = Vec::new();

    while reader.read_game(&mut visitor)?.is_some() {
        if let Some(game) = visitor.current_game.take() {
            games.push(game);
        }
    }
    Ok(games)
}

/// Parse every `*.pgn` file in a player's archive directory. Files are
/// visited in sorted filename order, which for `YYYY-MM.pgn` archives is
/// chronological.
pub fn load_directory<P: AsRef<Path>>(dir: P) -> Result<Vec<RawGame>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir.as_ref())? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().map(|e| e == "pgn").unwrap_or(false) {
            paths.push(path);
        }
    }
    paths.sort();

    let mut all_games = Vec::new();
    for path in paths {
        log::info!("Parsing {}", path.display());
        let games = parse_file(&path)?;
        log::debug!("  {} games", games.len());
        all_games.extend(games);
    }
    Ok(all_games)
}

/// Sort games chronologically by UTC timestamp. Games without a usable
/// timestamp sort first. The sort is stable, so file order is preserved
/// within ties.
pub fn sort_games(games: &mut [RawGame]) {
    games.sort_by_key(|g| g.timestamp());
}

/// Import outcome for one player: totals plus the ids that were dropped
#[derive(Debug, Default)]
pub struct ImportLog {
    pub total: usize,
    pub included: usize,
    /// Sequential ids skipped for missing data, with the reason
    pub skipped: Vec<(i64, String)>,
    /// Sequential ids where the player appeared on neither side
    pub not_found: Vec<i64>,
}

impl ImportLog {
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Total games processed: {}\n", self.total));
        out.push_str("Game IDs where player wasn't found:\n");
        for id in &self.not_found {
            out.push_str(&format!("{}\n", id));
        }
        out.push_str(&format!("Games included in dataset: {}\n", self.included));
        out.push_str("Games skipped due to missing data:\n");
        for (id, reason) in &self.skipped {
            out.push_str(&format!("{}: {}\n", id, reason));
        }
        out
    }
}

fn is_valid_elo(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

/// Turn sorted raw games into processed records for one player.
///
/// Sequential ids are assigned to ALL sorted games before filtering, so a
/// skipped game leaves a gap in the id sequence that later breaks any
/// streak spanning it.
pub fn process_games(
    games: &[RawGame],
    player: &Player,
    classifier: &TimeControlClassifier,
) -> (Vec<GameRecord>, ImportLog) {
    let mut records = Vec::new();
    let mut log = ImportLog {
        total: games.len(),
        ..ImportLog::default()
    };

    for (idx, game) in games.iter().enumerate() {
        let seq = idx as i64 + 1;

        if !is_valid_elo(&game.white_elo) || !is_valid_elo(&game.black_elo) {
            log::debug!("Game {}: invalid Elo, skipping", seq);
            log.skipped.push((seq, "Invalid ELO".to_string()));
            continue;
        }

        let Some(time_class) = classifier.classify(&game.event, &game.time_control) else {
            log::debug!("Game {}: no usable time control, skipping", seq);
            log.skipped.push((seq, "Missing TimeControl".to_string()));
            continue;
        };

        let color = if player.matches_header_name(&game.white) {
            Color::White
        } else if player.matches_header_name(&game.black) {
            Color::Black
        } else {
            log::debug!(
                "Game {}: player not found (White='{}', Black='{}')",
                seq,
                game.white,
                game.black
            );
            log.not_found.push(seq);
            continue;
        };

        let winner = match game.result.as_str() {
            "1-0" => Some(game.white.clone()),
            "0-1" => Some(game.black.clone()),
            "1/2-1/2" => Some("Draw".to_string()),
            _ => None,
        };

        // Validated digit-only above
        let white_elo: i64 = game.white_elo.parse().unwrap_or(0);
        let black_elo: i64 = game.black_elo.parse().unwrap_or(0);
        let (player_elo, opponent_elo) = match color {
            Color::White => (white_elo, black_elo),
            Color::Black => (black_elo, white_elo),
        };

        records.push(GameRecord {
            seq,
            date: game.date(),
            event: game.event.clone(),
            site: game.site.clone(),
            white: game.white.clone(),
            black: game.black.clone(),
            color,
            winner,
            player_elo,
            opponent_elo,
            elo_diff: player_elo - opponent_elo,
            moves: game.moves,
            time_class,
            venue: classify_venue(&game.site, &game.event, &game.link),
        });
    }

    log.included = records.len();
    (records, log)
}
