use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use crate::stickystudy::model::{DeckCard, Field, KanjiEntry};

/// Placeholder rendered for a missing value inside a labelled prompt.
pub const MISSING_VALUE: &str = "[N/A]";
/// Separator StickyStudy renders as a line break inside the answer field.
pub const INFO_SEPARATOR: &str = "\u{0085}";

/// Builds one card per kanji that quizzes `field`.
///
/// The prompt lands in the deck's on'yomi column and the remaining readings
/// and meaning in the answer column. When several kanji share the quizzed
/// value the prompt pulls in further fields until it is unambiguous.
pub fn build_answer_cards(entries: &[KanjiEntry], field: Field) -> Vec<DeckCard> {
    let counts = ValueCounts::from_entries(entries);
    entries
        .iter()
        .map(|entry| answer_card(entry, field, &counts))
        .collect()
}

#[derive(Default)]
struct ValueCounts<'a> {
    on: HashMap<&'a str, usize>,
    kun: HashMap<&'a str, usize>,
    meaning: HashMap<&'a str, usize>,
    on_kun: HashMap<(Option<&'a str>, Option<&'a str>), usize>,
    on_meaning: HashMap<(Option<&'a str>, Option<&'a str>), usize>,
}

impl<'a> ValueCounts<'a> {
    fn from_entries(entries: &'a [KanjiEntry]) -> Self {
        let mut counts = Self::default();
        for entry in entries {
            let on = entry.on.as_deref();
            let kun = entry.kun.as_deref();
            let meaning = entry.meaning.as_deref();
            if let Some(on) = on {
                *counts.on.entry(on).or_default() += 1;
            }
            if let Some(kun) = kun {
                *counts.kun.entry(kun).or_default() += 1;
            }
            if let Some(meaning) = meaning {
                *counts.meaning.entry(meaning).or_default() += 1;
            }
            *counts.on_kun.entry((on, kun)).or_default() += 1;
            *counts.on_meaning.entry((on, meaning)).or_default() += 1;
        }
        counts
    }
}

fn count<K: Eq + Hash>(map: &HashMap<K, usize>, key: &K) -> usize {
    map.get(key).copied().unwrap_or(0)
}

fn single<'a>(map: &HashMap<&'a str, usize>, value: Option<&'a str>) -> usize {
    value.map_or(0, |value| count(map, &value))
}

fn answer_card(entry: &KanjiEntry, field: Field, counts: &ValueCounts<'_>) -> DeckCard {
    let on = entry.on.as_deref();
    let kun = entry.kun.as_deref();
    let meaning = entry.meaning.as_deref();

    // Field -> value shown in the prompt (None renders as MISSING_VALUE).
    let mut shown: BTreeMap<Field, Option<&str>> = BTreeMap::new();
    let mut has_value = false;

    match field {
        Field::On | Field::Kun => {
            let (primary, primary_value, other, other_value, primary_counts) = if field == Field::On {
                (Field::On, on, Field::Kun, kun, &counts.on)
            } else {
                (Field::Kun, kun, Field::On, on, &counts.kun)
            };
            if primary_value.is_some() {
                shown.insert(primary, primary_value);
                has_value = true;
            } else if other_value.is_some() {
                shown.insert(other, other_value);
            }
            if single(primary_counts, primary_value) > 1 {
                shown.insert(other, other_value);
            }
            if count(&counts.on_kun, &(on, kun)) > 1 {
                shown.insert(Field::Meaning, meaning);
                if other_value.is_none() {
                    shown.remove(&other);
                }
            }
        }
        Field::Meaning => {
            if meaning.is_some() {
                shown.insert(Field::Meaning, meaning);
                has_value = true;
            }
            if single(&counts.meaning, meaning) > 1 {
                shown.insert(Field::On, on);
            }
            if count(&counts.on_meaning, &(on, meaning)) > 1 {
                shown.insert(Field::Kun, kun);
            }
        }
    }

    let prompt = match entry.field(field) {
        Some(value) if has_value && shown.len() == 1 => value.to_string(),
        _ => shown
            .iter()
            .map(|(field, value)| labelled(*field, *value))
            .collect::<Vec<_>>()
            .join("; "),
    };

    let info = Field::ALL
        .iter()
        .filter_map(|&candidate| {
            let value = entry.field(candidate)?;
            match shown.get(&candidate) {
                Some(Some(_)) => None,
                _ => Some(labelled(candidate, Some(value))),
            }
        })
        .collect::<Vec<_>>()
        .join(INFO_SEPARATOR);

    DeckCard::new(entry.kanji.clone(), prompt, "", info)
}

fn labelled(field: Field, value: Option<&str>) -> String {
    format!("{}: {}", field.label(), value.unwrap_or(MISSING_VALUE))
}
