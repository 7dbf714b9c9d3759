//! Data ingestion and storage
//!
//! Archive retrieval from the chess.com API, PGN parsing, and SQLite
//! database management.

pub mod archive;
pub mod database;
pub mod pgn;

pub use archive::ArchiveClient;
pub use database::Database;
