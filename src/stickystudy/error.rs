use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, StudyError>;

/// Error type covering the different failure cases that can occur when the
/// tool reads, merges, or writes kanji lists and StickyStudy decks.
#[derive(Debug, Error)]
pub enum StudyError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when the JSON config file cannot be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Raised when a kanji TSV file cannot be tokenised or written.
    #[error("TSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Raised when the confirmation prompt cannot talk to the terminal.
    #[error("prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),

    /// Raised when the StickyStudy deck directory cannot be located.
    #[error("deck directory not found: {0}")]
    DeckDirNotFound(PathBuf),

    /// Raised when a named deck has no file in the deck directory.
    #[error("deck not found: {0}")]
    DeckNotFound(PathBuf),

    /// Raised when a deck file does not follow the StickyStudy layout.
    #[error("invalid deck {path} at line {line}: {message}")]
    InvalidDeck {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Raised when a kanji TSV file is malformed.
    #[error("invalid kanji table {path} at line {line}: {message}")]
    InvalidTable {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Raised when a kanji table lacks a column the operation needs.
    #[error("kanji table is missing column '{0}'")]
    MissingColumn(String),

    /// Raised when regenerating a kanji deck would drop cards that carry study data.
    #[error("deck {path} contains kanji no longer in the study list: {kanji}")]
    KanjiRemoved { path: PathBuf, kanji: String },

    /// Raised when `add` is asked to sort by an unsupported column.
    #[error("invalid sort key '{0}' (expected one of: jlpt, grade, freq)")]
    InvalidSortKey(String),

    /// Raised when a JLPT level outside 1..=5 is requested.
    #[error("invalid JLPT level {0} (expected 1-5)")]
    InvalidLevel(u8),

    /// Raised when an explicitly requested config file does not exist.
    #[error("config file not found: {0}")]
    MissingConfig(PathBuf),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
