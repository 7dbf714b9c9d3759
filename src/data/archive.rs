//! chess.com archive retrieval
//!
//! The public API lists one archive URL per month a player was active;
//! each archive is downloaded as PGN into `archive_dir/{username}/YYYY-MM.pgn`.
//! Months already on disk are kept, and an offline mode skips the network
//! entirely.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::{ChessError, Result};

#[derive(Debug, Deserialize)]
struct ArchiveIndex {
    archives: Vec<String>,
}

/// Client for the chess.com public game archive API
pub struct ArchiveClient {
    client: reqwest::blocking::Client,
    api_base: String,
    archive_dir: PathBuf,
    offline_only: bool,
}

impl ArchiveClient {
    pub fn new<P: AsRef<Path>>(api_base: &str, archive_dir: P) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent("chess-streaks/0.1")
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(ArchiveClient {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            archive_dir: archive_dir.as_ref().to_path_buf(),
            offline_only: false,
        })
    }

    /// Set offline-only mode (no network requests, archives must exist)
    pub fn offline_only(mut self, offline: bool) -> Self {
        self.offline_only = offline;
        self
    }

    /// Directory holding one player's monthly PGN files
    pub fn player_dir(&self, username: &str) -> PathBuf {
        self.archive_dir.join(username)
    }

    /// Download all monthly archives for a player. Months already on disk
    /// are skipped unless `force` is set. Individual month failures are
    /// logged and do not abort the rest of the sync. Returns the number of
    /// files downloaded.
    pub fn sync_player(&self, username: &str, force: bool) -> Result<usize> {
        let dir = self.player_dir(username);

        if self.offline_only {
            log::info!("Offline mode: using existing archives for {}", username);
            if !self.validate_player(username)? {
                return Err(ChessError::Archive {
                    username: username.to_string(),
                    message: format!("no archives found in {}", dir.display()),
                });
            }
            return Ok(0);
        }

        let index_url = format!("{}/pub/player/{}/games/archives", self.api_base, username);
        log::debug!("Fetching archive index {}", index_url);
        let index: ArchiveIndex = self
            .client
            .get(&index_url)
            .send()?
            .error_for_status()?
            .json()?;
        log::info!("{}: {} monthly archives", username, index.archives.len());

        std::fs::create_dir_all(&dir)?;

        let mut downloaded = 0;
        for archive_url in &index.archives {
            let Some(filename) = archive_filename(archive_url) else {
                log::warn!("Skipping unrecognized archive url {}", archive_url);
                continue;
            };
            let path = dir.join(format!("{}.pgn", filename));
            if path.exists() && !force {
                log::debug!("{} already on disk, skipping", filename);
                continue;
            }

            match self.download_archive(archive_url, &path) {
                Ok(()) => {
                    log::info!("Downloaded {}.pgn for {}", filename, username);
                    downloaded += 1;
                }
                Err(e) => {
                    log::warn!("Failed to download {}.pgn for {}: {}", filename, username, e);
                }
            }
        }
        Ok(downloaded)
    }

    fn download_archive(&self, archive_url: &str, path: &Path) -> Result<()> {
        let pgn = self
            .client
            .get(format!("{}/pgn", archive_url))
            .send()?
            .error_for_status()?
            .text()?;
        std::fs::write(path, pgn)?;
        Ok(())
    }

    /// Whether a player's archive directory exists and is non-empty
    pub fn validate_player(&self, username: &str) -> Result<bool> {
        let dir = self.player_dir(username);
        if !dir.exists() {
            return Ok(false);
        }
        Ok(std::fs::read_dir(dir)?.next().is_some())
    }
}

/// Derive the `YYYY-MM` filename from an archive URL such as
/// `https://api.chess.com/pub/player/hikaru/games/2021/05`
fn archive_filename(url: &str) -> Option<String> {
    let mut segments = url.trim_end_matches('/').rsplit('/');
    let month = segments.next()?;
    let year = segments.next()?;
    if year.is_empty() || month.is_empty() {
        return None;
    }
    Some(format!("{}-{}", year, month))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_filename_from_url() {
        assert_eq!(
            archive_filename("https://api.chess.com/pub/player/hikaru/games/2021/05"),
            Some("2021-05".to_string())
        );
        assert_eq!(
            archive_filename("https://api.chess.com/pub/player/hikaru/games/2021/05/"),
            Some("2021-05".to_string())
        );
        assert_eq!(archive_filename(""), None);
    }

    #[test]
    fn test_validate_player() {
        let dir = tempfile::tempdir().unwrap();
        let client = ArchiveClient::new("https://api.chess.com", dir.path()).unwrap();

        assert!(!client.validate_player("hikaru").unwrap());

        let player_dir = client.player_dir("hikaru");
        std::fs::create_dir_all(&player_dir).unwrap();
        assert!(!client.validate_player("hikaru").unwrap());

        std::fs::write(player_dir.join("2021-05.pgn"), "[Event \"x\"]\n").unwrap();
        assert!(client.validate_player("hikaru").unwrap());
    }

    #[test]
    fn test_offline_sync_requires_existing_archives() {
        let dir = tempfile::tempdir().unwrap();
        let client = ArchiveClient::new("https://api.chess.com", dir.path())
            .unwrap()
            .offline_only(true);

        assert!(client.sync_player("hikaru", false).is_err());

        let player_dir = client.player_dir("hikaru");
        std::fs::create_dir_all(&player_dir).unwrap();
        std::fs::write(player_dir.join("2021-05.pgn"), "[Event \"x\"]\n").unwrap();
        assert_eq!(client.sync_player("hikaru", false).unwrap(), 0);
    }
}
