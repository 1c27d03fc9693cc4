use std::fs;
use std::path::Path;

use tracing::debug;

use crate::stickystudy::error::{Result, StudyError};
use crate::stickystudy::model::{Deck, DeckCard};

/// Number of tab-separated fields in a deck line.
pub const DECK_FIELDS: usize = 5;
/// Prefix of the second header line written by StickyStudy.
pub const HEADER_RULE: &str = "-----";

/// Reads a StickyStudy deck file.
///
/// When the second line starts with [`HEADER_RULE`] the first two lines are
/// kept verbatim, line endings included, as the deck header.
pub fn read_deck(path: &Path) -> Result<Deck> {
    let source = fs::read_to_string(path)?;
    let deck = parse_deck(&source, path)?;
    debug!(path = %path.display(), cards = deck.len(), header = deck.header.is_some(), "deck read");
    Ok(deck)
}

/// Writes the deck header (if any) followed by one line per card.
pub fn write_deck(path: &Path, deck: &Deck) -> Result<()> {
    let mut output = String::new();
    for line in deck.header.iter().flatten() {
        output.push_str(line);
        if !line.ends_with('\n') {
            output.push('\n');
        }
    }
    for card in &deck.cards {
        let fields = [
            card.question.as_str(),
            card.on.as_str(),
            card.kun.as_str(),
            card.answer.as_str(),
            card.study_data.as_str(),
        ];
        output.push_str(&fields.join("\t"));
        output.push('\n');
    }
    fs::write(path, output)?;
    debug!(path = %path.display(), cards = deck.len(), "deck written");
    Ok(())
}

fn parse_deck(source: &str, path: &Path) -> Result<Deck> {
    let lines: Vec<&str> = source.lines().collect();
    let has_header = lines
        .get(1)
        .is_some_and(|line| line.starts_with(HEADER_RULE));
    let (header, body_start) = if has_header {
        let raw = source.split_inclusive('\n').take(2).map(str::to_string).collect();
        (Some(raw), 2)
    } else {
        (None, 0)
    };

    let mut cards = Vec::with_capacity(lines.len().saturating_sub(body_start));
    for (index, line) in lines.iter().enumerate().skip(body_start) {
        if line.trim().is_empty() {
            continue;
        }
        let mut fields: Vec<&str> = line.split('\t').collect();
        if fields.len() > DECK_FIELDS {
            return Err(StudyError::InvalidDeck {
                path: path.to_path_buf(),
                line: index + 1,
                message: format!("expected {DECK_FIELDS} fields, found {}", fields.len()),
            });
        }
        fields.resize(DECK_FIELDS, "");
        cards.push(
            DeckCard::new(fields[0], fields[1], fields[2], fields[3]).with_study_data(fields[4]),
        );
    }

    Ok(Deck::new(header, cards))
}
