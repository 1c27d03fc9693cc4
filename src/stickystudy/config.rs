//! Tool settings and deck-directory resolution.
//!
//! Settings come from an optional JSON file. The deck directory can be
//! overridden by `STICKYSTUDY_DECK_DIR` and by command-line flags, which win
//! over everything else.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::stickystudy::error::{Result, StudyError};
use crate::stickystudy::model::JlptLevel;

const ENV_CONFIG_FILE: &str = "STICKYSTUDY_CONFIG";
const ENV_DECK_DIR: &str = "STICKYSTUDY_DECK_DIR";
const CONFIG_DIR_NAME: &str = "stickystudy";
const CONFIG_FILE_NAME: &str = "config.json";

/// iCloud container StickyStudy syncs its decks through on macOS.
const ICLOUD_APP_DIR: &str = "iCloud~com~justinnightingale~stickystudykanji";

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_KANJI_MASTER: &str = "kanji_list.tsv";
const DEFAULT_KANJI_CURRENT: &str = "kanji_list_current.tsv";
const DEFAULT_KANJI_PREFIX: &str = "Study-Kanji";

/// Command-line overrides layered over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigSource {
    pub config_file: Option<PathBuf>,
    pub deck_dir: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
}

/// A vocabulary deck derived from a source deck by the kanji it uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsetSpec {
    /// Name of the subset deck.
    pub name: String,
    /// Name of the deck the cards are drawn from.
    pub source: String,
    /// Restrict the kanji set to these JLPT levels; `None` uses the whole
    /// current study list.
    #[serde(default)]
    pub levels: Option<Vec<JlptLevel>>,
    /// Drop words written entirely in kana.
    #[serde(default = "default_true")]
    pub must_include_kanji: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub deck_dir: Option<PathBuf>,
    pub data_dir: PathBuf,
    pub kanji_master: PathBuf,
    pub kanji_current: PathBuf,
    pub kanji_prefix: String,
    pub subsets: Vec<SubsetSpec>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            deck_dir: None,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            kanji_master: PathBuf::from(DEFAULT_KANJI_MASTER),
            kanji_current: PathBuf::from(DEFAULT_KANJI_CURRENT),
            kanji_prefix: DEFAULT_KANJI_PREFIX.to_string(),
            subsets: vec![SubsetSpec {
                name: "Vocab Known Kanji".to_string(),
                source: "All Vocab".to_string(),
                levels: None,
                must_include_kanji: true,
            }],
        }
    }
}

impl Settings {
    /// Loads settings from the resolved config file and applies overrides.
    pub fn load(source: &ConfigSource) -> Result<Self> {
        let mut settings = match resolve_config_file(source)? {
            Some(path) => {
                info!(path = %path.display(), "loading settings");
                Self::from_file(&path)?
            }
            None => {
                debug!("no config file found, using defaults");
                Self::default()
            }
        };

        if let Some(dir) = env::var_os(ENV_DECK_DIR) {
            settings.deck_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = &source.deck_dir {
            settings.deck_dir = Some(dir.clone());
        }
        if let Some(dir) = &source.data_dir {
            settings.data_dir = dir.clone();
        }
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// The directory StickyStudy reads decks from. It must exist.
    pub fn deck_dir(&self) -> Result<PathBuf> {
        let dir = match &self.deck_dir {
            Some(dir) => dir.clone(),
            None => default_deck_dir()?,
        };
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(StudyError::DeckDirNotFound(dir))
        }
    }

    /// Path of the deck called `name`; spaces become dashes.
    pub fn deck_path(&self, name: &str) -> Result<PathBuf> {
        Ok(self.deck_dir()?.join(deck_file_name(name)))
    }

    pub fn master_list_path(&self) -> PathBuf {
        self.data_dir.join(&self.kanji_master)
    }

    pub fn current_list_path(&self) -> PathBuf {
        self.data_dir.join(&self.kanji_current)
    }
}

/// File name StickyStudy uses for a deck.
pub fn deck_file_name(name: &str) -> String {
    format!("{}.txt", name.replace(' ', "-"))
}

fn default_deck_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| StudyError::DeckDirNotFound(PathBuf::from("~")))?;
    Ok(home.join("iCloud").join(ICLOUD_APP_DIR).join("Documents"))
}

fn resolve_config_file(source: &ConfigSource) -> Result<Option<PathBuf>> {
    if let Some(path) = &source.config_file {
        return require_file(path.clone()).map(Some);
    }
    if let Some(path) = env::var_os(ENV_CONFIG_FILE) {
        return require_file(PathBuf::from(path)).map(Some);
    }
    Ok(dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
        .filter(|path| path.is_file()))
}

fn require_file(path: PathBuf) -> Result<PathBuf> {
    if path.is_file() {
        Ok(path)
    } else {
        Err(StudyError::MissingConfig(path))
    }
}
