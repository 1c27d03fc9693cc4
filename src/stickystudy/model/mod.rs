use std::fmt;

use serde::{Deserialize, Serialize};

use crate::stickystudy::error::{Result, StudyError};

/// Column holding the kanji character in a kanji list.
pub const KANJI_COL: &str = "kanji";
/// Column holding the on'yomi readings.
pub const ON_COL: &str = "on'yomi";
/// Column holding the kun'yomi readings.
pub const KUN_COL: &str = "kun'yomi";
/// Column holding the English meaning.
pub const MEANING_COL: &str = "meaning";
/// Column holding the JLPT level.
pub const JLPT_COL: &str = "jlpt";
/// Column holding the school grade.
pub const GRADE_COL: &str = "grade";
/// Column holding the newspaper frequency rank.
pub const FREQ_COL: &str = "freq";
/// Column stamped by `add` when a kanji enters the study list.
pub const TIME_LEARNED_COL: &str = "time_learned";

/// A JLPT level, N5 (easiest) through N1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct JlptLevel(u8);

impl JlptLevel {
    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for JlptLevel {
    type Error = StudyError;

    fn try_from(value: u8) -> Result<Self> {
        if (1..=5).contains(&value) {
            Ok(Self(value))
        } else {
            Err(StudyError::InvalidLevel(value))
        }
    }
}

impl From<JlptLevel> for u8 {
    fn from(level: JlptLevel) -> Self {
        level.0
    }
}

impl fmt::Display for JlptLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The field a kanji deck quizzes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    On,
    Kun,
    Meaning,
}

impl Field {
    /// All fields in display order.
    pub const ALL: [Field; 3] = [Field::On, Field::Kun, Field::Meaning];

    /// Label used both in card prompts and in deck file suffixes.
    pub fn label(self) -> &'static str {
        match self {
            Field::On => "ON",
            Field::Kun => "KUN",
            Field::Meaning => "MEANING",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Typed view over one row of a kanji list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KanjiEntry {
    pub kanji: String,
    pub on: Option<String>,
    pub kun: Option<String>,
    pub meaning: Option<String>,
    pub jlpt: Option<u32>,
    pub grade: Option<u32>,
    pub freq: Option<u32>,
}

impl KanjiEntry {
    /// Returns the value for the given field, if present.
    pub fn field(&self, field: Field) -> Option<&str> {
        match field {
            Field::On => self.on.as_deref(),
            Field::Kun => self.kun.as_deref(),
            Field::Meaning => self.meaning.as_deref(),
        }
    }
}

/// A kanji list kept as raw TSV cells so that unknown columns survive a
/// load/save cycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KanjiTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl KanjiTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| StudyError::MissingColumn(name.to_string()))
    }

    /// Returns the non-empty cell at `row` for column `name`.
    pub fn cell(&self, row: usize, name: &str) -> Option<&str> {
        let index = self.column_index(name)?;
        self.rows
            .get(row)
            .and_then(|cells| cells.get(index))
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Sets a cell, adding the column if the table does not have it yet.
    pub fn set_cell(&mut self, row: usize, name: &str, value: impl Into<String>) {
        let index = self.ensure_column(name);
        if let Some(cells) = self.rows.get_mut(row) {
            cells[index] = value.into();
        }
    }

    /// Adds a column filled with empty cells when missing and returns its index.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(index) = self.column_index(name) {
            return index;
        }
        self.columns.push(name.to_string());
        for cells in &mut self.rows {
            cells.push(String::new());
        }
        self.columns.len() - 1
    }

    /// Appends the rows of `other`, matching cells by column name.
    pub fn append(&mut self, other: &KanjiTable) {
        let indices: Vec<usize> = other
            .columns
            .iter()
            .map(|column| self.ensure_column(column))
            .collect();
        for other_cells in &other.rows {
            let mut cells = vec![String::new(); self.columns.len()];
            for (value, &index) in other_cells.iter().zip(&indices) {
                cells[index] = value.clone();
            }
            self.rows.push(cells);
        }
    }

    /// Returns a new table with the selected rows, in the given order.
    pub fn select(&self, rows: &[usize]) -> KanjiTable {
        KanjiTable {
            columns: self.columns.clone(),
            rows: rows.iter().filter_map(|&row| self.rows.get(row).cloned()).collect(),
        }
    }

    /// Parses the numeric value of a cell. Float renderings such as `3.0` are accepted.
    pub fn number(&self, row: usize, name: &str) -> Option<u32> {
        self.cell(row, name).and_then(parse_number)
    }

    /// Builds typed entries for every row. Requires the `kanji` column.
    pub fn entries(&self) -> Result<Vec<KanjiEntry>> {
        self.require_column(KANJI_COL)?;
        let text = |row: usize, name: &str| self.cell(row, name).map(str::to_string);
        Ok((0..self.rows.len())
            .map(|row| KanjiEntry {
                kanji: text(row, KANJI_COL).unwrap_or_default(),
                on: text(row, ON_COL),
                kun: text(row, KUN_COL),
                meaning: text(row, MEANING_COL),
                jlpt: self.number(row, JLPT_COL),
                grade: self.number(row, GRADE_COL),
                freq: self.number(row, FREQ_COL),
            })
            .collect())
    }
}

fn parse_number(value: &str) -> Option<u32> {
    let value = value.trim();
    value.parse::<u32>().ok().or_else(|| {
        value
            .parse::<f64>()
            .ok()
            .filter(|number| number.fract() == 0.0 && *number >= 0.0 && *number <= u32::MAX as f64)
            .map(|number| number as u32)
    })
}

/// One card of a StickyStudy deck.
///
/// Empty strings stand in for missing values, matching how the deck files
/// encode them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeckCard {
    pub question: String,
    pub on: String,
    pub kun: String,
    pub answer: String,
    pub study_data: String,
}

impl DeckCard {
    pub fn new(
        question: impl Into<String>,
        on: impl Into<String>,
        kun: impl Into<String>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            question: question.into(),
            on: on.into(),
            kun: kun.into(),
            answer: answer.into(),
            study_data: String::new(),
        }
    }

    pub fn with_study_data(mut self, study_data: impl Into<String>) -> Self {
        self.study_data = study_data.into();
        self
    }

    /// Identity of a card; study data is not part of it.
    pub fn identity(&self) -> (&str, &str, &str, &str) {
        (&self.question, &self.on, &self.kun, &self.answer)
    }

    /// Leading timestamp of the study data, e.g. `[1700000000_2_...]`.
    pub fn timestamp(&self) -> Option<i64> {
        let mut chars = self.study_data.chars();
        chars.next()?;
        chars.next_back()?;
        chars.as_str().split('_').next()?.trim().parse().ok()
    }
}

/// A StickyStudy deck: optional two header lines followed by cards.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Deck {
    pub header: Option<Vec<String>>,
    pub cards: Vec<DeckCard>,
}

impl Deck {
    pub fn new(header: Option<Vec<String>>, cards: Vec<DeckCard>) -> Self {
        Self { header, cards }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Timestamp recorded in the fifth field of the first header line.
    pub fn timestamp(&self) -> Option<i64> {
        let first = self.header.as_ref()?.first()?;
        first.split('\t').nth(4)?.split('_').next()?.trim().parse().ok()
    }
}
