//! Set-like operations over StickyStudy decks.
//!
//! Cards are identified by their question, readings, and answer. Study data
//! rides along and is resolved per operation.

use std::collections::{BTreeSet, HashMap, HashSet};

use wana_kana::IsJapaneseChar;

use crate::stickystudy::model::{Deck, DeckCard};

/// Returns whether `c` is a CJK ideograph.
pub fn is_kanji(c: char) -> bool {
    c.is_kanji()
}

impl Deck {
    /// Union of two decks. For duplicate cards the one with the newer study
    /// timestamp wins; cards without study data rank oldest and ties go to
    /// `other`. The header with the newer deck timestamp is kept.
    pub fn union(&self, other: &Deck) -> Deck {
        let mut cards: Vec<DeckCard> = Vec::with_capacity(self.len() + other.len());
        let mut positions: HashMap<(&str, &str, &str, &str), usize> = HashMap::new();

        for card in self.cards.iter().chain(&other.cards) {
            match positions.get(&card.identity()) {
                Some(&index) => {
                    if card.timestamp() >= cards[index].timestamp() {
                        cards[index] = card.clone();
                    }
                }
                None => {
                    positions.insert(card.identity(), cards.len());
                    cards.push(card.clone());
                }
            }
        }

        let header = match (self.timestamp(), other.timestamp()) {
            (_, None) => self.header.clone(),
            (None, Some(_)) => other.header.clone(),
            (Some(mine), Some(theirs)) if mine >= theirs => self.header.clone(),
            _ => other.header.clone(),
        };
        Deck::new(header, cards)
    }

    /// Adds every card of this deck that `other` lacks, with empty study data.
    /// Cards already in `other` keep their study data and `other`'s header is
    /// kept. With no target deck the result is a headerless copy of this deck
    /// with study data cleared.
    pub fn update_other(&self, other: Option<&Deck>) -> Deck {
        let fresh = self
            .cards
            .iter()
            .map(|card| card.clone().with_study_data(""));
        match other {
            None => Deck::new(None, dedup_keep_first(fresh)),
            Some(target) => Deck::new(
                target.header.clone(),
                dedup_keep_first(target.cards.iter().cloned().chain(fresh)),
            ),
        }
    }

    /// Keeps the cards whose question uses only kanji from `kanji`. With
    /// `must_include_kanji` the question must also contain at least one kanji.
    pub fn filter_kanji(&self, kanji: &BTreeSet<char>, must_include_kanji: bool) -> Deck {
        let is_valid = |question: &str| {
            let mut has_kanji = false;
            for c in question.chars().filter(|&c| is_kanji(c)) {
                if !kanji.contains(&c) {
                    return false;
                }
                has_kanji = true;
            }
            has_kanji || !must_include_kanji
        };
        let cards = self
            .cards
            .iter()
            .filter(|card| is_valid(&card.question))
            .cloned()
            .collect();
        Deck::new(self.header.clone(), cards)
    }

    /// Builds the reverse deck: the answer becomes the question. The new
    /// answer is the written word when `with_kanji` is set, otherwise the
    /// reading. Cards without an answer are skipped.
    pub fn reversed(&self, with_kanji: bool) -> Deck {
        let cards = self
            .cards
            .iter()
            .filter(|card| !card.answer.trim().is_empty())
            .map(|card| {
                let answer = if with_kanji {
                    card.question.as_str()
                } else {
                    [card.on.as_str(), card.kun.as_str(), card.question.as_str()]
                        .into_iter()
                        .find(|value| !value.is_empty())
                        .unwrap_or_default()
                };
                DeckCard::new(
                    card.answer.clone(),
                    card.on.clone(),
                    card.kun.clone(),
                    answer,
                )
            });
        Deck::new(None, dedup_keep_first(cards))
    }
}

fn dedup_keep_first(cards: impl IntoIterator<Item = DeckCard>) -> Vec<DeckCard> {
    let mut seen: HashSet<(String, String, String, String)> = HashSet::new();
    cards
        .into_iter()
        .filter(|card| {
            seen.insert((
                card.question.clone(),
                card.on.clone(),
                card.kun.clone(),
                card.answer.clone(),
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(question: &str, answer: &str, study: &str) -> DeckCard {
        DeckCard::new(question, "", "", answer).with_study_data(study)
    }

    fn header(timestamp: i64) -> Option<Vec<String>> {
        Some(vec![
            format!("deck\t\t\t\t{timestamp}_x"),
            "-----".to_string(),
        ])
    }

    #[test]
    fn union_prefers_newer_study_data() {
        let old = Deck::new(
            header(100),
            vec![card("日", "day", "[100_a]"), card("月", "moon", "[300_a]")],
        );
        let new = Deck::new(
            header(200),
            vec![card("日", "day", "[200_b]"), card("月", "moon", ""), card("火", "fire", "")],
        );

        let merged = old.union(&new);

        assert_eq!(merged.header, header(200));
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.cards[0].study_data, "[200_b]");
        assert_eq!(merged.cards[1].study_data, "[300_a]");
        assert_eq!(merged.cards[2].question, "火");
    }

    #[test]
    fn union_keeps_own_header_when_other_has_none() {
        let deck = Deck::new(header(100), vec![card("日", "day", "")]);
        let merged = deck.union(&Deck::default());
        assert_eq!(merged.header, header(100));
    }

    #[test]
    fn union_breaks_card_ties_towards_other() {
        let mine = Deck::new(None, vec![card("日", "day", "[100_a]"), card("月", "moon", "")]);
        let theirs = Deck::new(None, vec![card("日", "day", "[100_b]"), card("月", "moon", "")]);

        let merged = mine.union(&theirs);

        assert_eq!(merged.cards[0].study_data, "[100_b]");
        assert_eq!(merged.cards[1].study_data, "");
    }

    #[test]
    fn union_keeps_own_header_on_equal_timestamps() {
        let own_header = Some(vec!["mine\t\t\t\t100_x".to_string(), "-----".to_string()]);
        let mine = Deck::new(own_header.clone(), vec![card("日", "day", "")]);
        let theirs = Deck::new(header(100), vec![card("日", "day", "")]);

        let merged = mine.union(&theirs);

        assert_eq!(merged.header, own_header);
    }

    #[test]
    fn update_other_preserves_existing_progress() {
        let source = Deck::new(
            None,
            vec![card("日", "day", "[500_z]"), card("月", "moon", "[500_z]")],
        );
        let target = Deck::new(header(1), vec![card("日", "day", "[100_a]")]);

        let updated = source.update_other(Some(&target));

        assert_eq!(updated.header, header(1));
        assert_eq!(updated.cards, vec![card("日", "day", "[100_a]"), card("月", "moon", "")]);
    }

    #[test]
    fn update_other_without_target_clears_study_data() {
        let source = Deck::new(header(9), vec![card("日", "day", "[500_z]")]);
        let updated = source.update_other(None);
        assert!(updated.header.is_none());
        assert_eq!(updated.cards, vec![card("日", "day", "")]);
    }

    #[test]
    fn filter_kanji_respects_must_include() {
        let deck = Deck::new(
            None,
            vec![
                card("日本", "Japan", ""),
                card("日曜日", "Sunday", ""),
                card("ひらがな", "hiragana", ""),
            ],
        );
        let known: BTreeSet<char> = ['日', '本'].into_iter().collect();

        let strict = deck.filter_kanji(&known, true);
        let questions: Vec<&str> = strict.cards.iter().map(|c| c.question.as_str()).collect();
        assert_eq!(questions, vec!["日本"]);

        let loose = deck.filter_kanji(&known, false);
        let questions: Vec<&str> = loose.cards.iter().map(|c| c.question.as_str()).collect();
        assert_eq!(questions, vec!["日本", "ひらがな"]);
    }

    #[test]
    fn reversed_swaps_question_and_answer() {
        let deck = Deck::new(
            header(5),
            vec![
                DeckCard::new("日本", "にほん", "", "Japan").with_study_data("[1_a]"),
                DeckCard::new("空", "", "そら", "sky"),
                DeckCard::new("謎", "", "", ""),
            ],
        );

        let with_kanji = deck.reversed(true);
        assert!(with_kanji.header.is_none());
        assert_eq!(with_kanji.cards, vec![
            DeckCard::new("Japan", "にほん", "", "日本"),
            DeckCard::new("sky", "", "そら", "空"),
        ]);

        let kana_only = deck.reversed(false);
        assert_eq!(kana_only.cards[0].answer, "にほん");
        assert_eq!(kana_only.cards[1].answer, "そら");
    }
}
