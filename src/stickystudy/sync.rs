use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Local;
use tabled::builder::Builder;
use tabled::settings::Style;
use tracing::{debug, error, info, instrument, warn};

use crate::stickystudy::cards::build_answer_cards;
use crate::stickystudy::config::Settings;
use crate::stickystudy::error::{Result, StudyError};
use crate::stickystudy::io::{deck_file, kanji_table, mojibake};
use crate::stickystudy::model::{
    Deck, DeckCard, Field, FREQ_COL, GRADE_COL, JLPT_COL, JlptLevel, KANJI_COL, KanjiEntry,
    KanjiTable, TIME_LEARNED_COL,
};

/// Levels regenerated by [`sync_all`].
pub const SYNC_ALL_LEVELS: [u8; 3] = [5, 4, 3];
/// Deck reversed by [`sync_all`].
pub const SYNC_ALL_COPY_DECK: &str = "All Vocab";
/// Label of the reversed deck written by [`sync_all`].
pub const SYNC_ALL_COPY_LABEL: &str = "W";

/// Header printed by `fix` in place of the two export header lines.
pub const EXPORT_HEADER: &str = "kanji\ton'yomi\tkun'yomi\tmeaning\tpractice_data";

/// Rows shown when previewing kanji picked by `add`.
const PREVIEW_ROWS: [&str; 12] = [
    "ref_sh_kk_2",
    "jlpt",
    "grade",
    "freq",
    "strokes",
    "learned",
    "on'yomi",
    "kun'yomi",
    "meaning",
    "KD on'yomi",
    "KD kun'yomi",
    "KD meaning",
];
const PREVIEW_MISSING: &str = "—";

/// Column `add` can order candidate kanji by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Highest JLPT level (easiest) first.
    Jlpt,
    /// Lowest school grade first.
    Grade,
    /// Most frequent first.
    Freq,
}

impl SortKey {
    pub const DEFAULT: [SortKey; 3] = [SortKey::Jlpt, SortKey::Grade, SortKey::Freq];

    fn column(self) -> &'static str {
        match self {
            SortKey::Jlpt => JLPT_COL,
            SortKey::Grade => GRADE_COL,
            SortKey::Freq => FREQ_COL,
        }
    }

    fn ascending(self) -> bool {
        !matches!(self, SortKey::Jlpt)
    }
}

impl FromStr for SortKey {
    type Err = StudyError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "jlpt" => Ok(SortKey::Jlpt),
            "grade" => Ok(SortKey::Grade),
            "freq" => Ok(SortKey::Freq),
            other => Err(StudyError::InvalidSortKey(other.to_string())),
        }
    }
}

/// Regenerates the ON, KUN and MEANING kanji decks for the given JLPT levels.
///
/// Existing decks keep their header and per-kanji study data. Returns the
/// paths written.
#[instrument(
    level = "info",
    skip_all,
    fields(input = %input.display(), prefix = %prefix)
)]
pub fn sync_kanji(
    settings: &Settings,
    levels: &[JlptLevel],
    input: &Path,
    prefix: &str,
) -> Result<Vec<PathBuf>> {
    let levels: BTreeSet<u32> = levels.iter().map(|level| u32::from(level.get())).collect();
    let level_list = levels
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",");

    let entries: Vec<KanjiEntry> = kanji_table::read_table(input)?
        .entries()?
        .into_iter()
        .filter(|entry| entry.jlpt.is_some_and(|jlpt| levels.contains(&jlpt)))
        .collect();
    info!(entry_count = entries.len(), levels = %level_list, "selected kanji by JLPT level");

    let mut base = resolve_prefix(settings, prefix)?.into_os_string();
    base.push(format!("-N{level_list}"));

    let mut written = Vec::with_capacity(Field::ALL.len());
    for field in Field::ALL {
        let cards = build_answer_cards(&entries, field);
        let mut name: OsString = base.clone();
        name.push(format!("-{}.txt", field.label()));
        let path = PathBuf::from(name);

        let deck = if path.exists() {
            let existing = deck_file::read_deck(&path)?;
            info!(path = %path.display(), "saving deck (preserving current study data)");
            carry_kanji_progress(&path, cards, &existing)?
        } else {
            info!(path = %path.display(), "saving deck");
            Deck::new(None, cards)
        };
        deck_file::write_deck(&path, &deck)?;
        written.push(path);
    }
    Ok(written)
}

fn resolve_prefix(settings: &Settings, prefix: &str) -> Result<PathBuf> {
    if prefix.contains('/') {
        Ok(PathBuf::from(prefix))
    } else {
        Ok(settings.deck_dir()?.join(prefix))
    }
}

/// Copies study data from `existing` onto freshly built cards, keyed by kanji.
fn carry_kanji_progress(path: &Path, cards: Vec<DeckCard>, existing: &Deck) -> Result<Deck> {
    let fresh: HashSet<&str> = cards.iter().map(|card| card.question.as_str()).collect();
    let removed: Vec<&str> = existing
        .cards
        .iter()
        .map(|card| card.question.as_str())
        .filter(|kanji| !fresh.contains(kanji))
        .collect();
    if !removed.is_empty() {
        return Err(StudyError::KanjiRemoved {
            path: path.to_path_buf(),
            kanji: removed.join(", "),
        });
    }

    let mut progress: HashMap<&str, &str> = HashMap::with_capacity(existing.len());
    for (index, card) in existing.cards.iter().enumerate() {
        if progress
            .insert(card.question.as_str(), card.study_data.as_str())
            .is_some()
        {
            return Err(StudyError::InvalidDeck {
                path: path.to_path_buf(),
                line: index + 1 + existing.header.as_ref().map_or(0, Vec::len),
                message: format!("kanji {} appears more than once", card.question),
            });
        }
    }
    let cards = cards
        .into_iter()
        .map(|card| {
            let study_data = progress.get(card.question.as_str()).copied().unwrap_or_default();
            card.with_study_data(study_data)
        })
        .collect();
    Ok(Deck::new(existing.header.clone(), cards))
}

/// Regenerates every configured vocabulary subset deck.
///
/// Progress made in an existing subset deck is merged back into its source
/// deck first, so the source always holds the newest study data.
#[instrument(level = "info", skip_all, fields(subset_count = settings.subsets.len()))]
pub fn sync_subsets(settings: &Settings) -> Result<()> {
    let entries = kanji_table::read_table(&settings.current_list_path())?.entries()?;
    let mut sources: BTreeMap<String, SourceDeck> = BTreeMap::new();

    for target in &settings.subsets {
        let kanji = kanji_for_levels(&entries, target.levels.as_deref());
        debug!(subset = %target.name, kanji_count = kanji.len(), "resolved kanji set");

        let source = match sources.entry(target.source.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let path = settings.deck_path(&target.source)?;
                if !path.exists() {
                    return Err(StudyError::DeckNotFound(path));
                }
                let deck = deck_file::read_deck(&path)?;
                entry.insert(SourceDeck { path, deck, changed: false })
            }
        };

        let subset_path = settings.deck_path(&target.name)?;
        let existing = if subset_path.exists() {
            Some(deck_file::read_deck(&subset_path)?)
        } else {
            None
        };

        if let Some(existing) = &existing {
            let merged = source.deck.union(&known_progress(existing, &source.deck));
            if merged != source.deck {
                source.deck = merged;
                source.changed = true;
            }
        }

        let subset = source
            .deck
            .filter_kanji(&kanji, target.must_include_kanji)
            .update_other(existing.as_ref());
        let added = subset.len().saturating_sub(existing.as_ref().map_or(0, Deck::len));
        info!(
            subset = %target.name,
            path = %subset_path.display(),
            card_count = subset.len(),
            added,
            "saving subset deck"
        );
        deck_file::write_deck(&subset_path, &subset)?;
    }

    for (name, source) in sources.into_iter().filter(|(_, source)| source.changed) {
        info!(deck = %name, path = %source.path.display(), "saving merged study progress");
        deck_file::write_deck(&source.path, &source.deck)?;
    }
    Ok(())
}

struct SourceDeck {
    path: PathBuf,
    deck: Deck,
    changed: bool,
}

/// Cards of `subset` that also exist in `source`, as a headerless deck.
fn known_progress(subset: &Deck, source: &Deck) -> Deck {
    let known: HashSet<_> = source.cards.iter().map(DeckCard::identity).collect();
    let cards = subset
        .cards
        .iter()
        .filter(|card| known.contains(&card.identity()))
        .cloned()
        .collect();
    Deck::new(None, cards)
}

fn kanji_for_levels(entries: &[KanjiEntry], levels: Option<&[JlptLevel]>) -> BTreeSet<char> {
    entries
        .iter()
        .filter(|entry| match levels {
            None => true,
            Some(levels) => entry
                .jlpt
                .is_some_and(|jlpt| levels.iter().any(|level| u32::from(level.get()) == jlpt)),
        })
        .flat_map(|entry| entry.kanji.chars())
        .collect()
}

/// Writes the reversed copy of `deck` as `<deck>-<label>`, keeping the study
/// data of cards already in the copy. Returns the path written.
#[instrument(level = "info", skip(settings))]
pub fn sync_copy(settings: &Settings, deck: &str, label: &str, with_kanji: bool) -> Result<PathBuf> {
    let source_path = settings.deck_path(deck)?;
    if !source_path.exists() {
        return Err(StudyError::DeckNotFound(source_path));
    }
    let source = deck_file::read_deck(&source_path)?;

    let copy_path = settings.deck_path(&format!("{deck}-{label}"))?;
    let existing = if copy_path.exists() {
        Some(deck_file::read_deck(&copy_path)?)
    } else {
        None
    };

    let copy = source.reversed(with_kanji).update_other(existing.as_ref());
    info!(
        path = %copy_path.display(),
        card_count = copy.len(),
        preserved = existing.is_some(),
        "saving reversed deck"
    );
    deck_file::write_deck(&copy_path, &copy)?;
    Ok(copy_path)
}

/// Runs the full sync: kanji decks for N5-N3, vocab subsets, then the
/// reversed vocab deck.
///
/// A failing step is logged and the remaining steps still run. The result is
/// that of the last step.
pub fn sync_all(settings: &Settings) -> Result<()> {
    let levels = SYNC_ALL_LEVELS
        .iter()
        .map(|&level| JlptLevel::try_from(level))
        .collect::<Result<Vec<_>>>()?;
    let input = settings.current_list_path();

    println!("Syncing kanji decks...");
    report_step(
        "sync-kanji",
        sync_kanji(settings, &levels, &input, &settings.kanji_prefix).map(|_| ()),
    );

    println!("Syncing vocab subsets...");
    report_step("sync-subsets", sync_subsets(settings));

    println!("Syncing reverse vocab deck...");
    sync_copy(settings, SYNC_ALL_COPY_DECK, SYNC_ALL_COPY_LABEL, true).map(|_| ())
}

fn report_step(step: &str, result: Result<()>) {
    if let Err(err) = result {
        error!(step, error = %err, "sync step failed, continuing");
    }
}

/// Picks the next `count` kanji from `master` that `current` does not have.
///
/// Candidates are ordered by `sort_by` (stable; missing values last) and
/// stamped with the current local time in the `time_learned` column.
pub fn select_new_kanji(
    master: &KanjiTable,
    current: &KanjiTable,
    count: usize,
    sort_by: &[SortKey],
) -> Result<KanjiTable> {
    master.require_column(KANJI_COL)?;
    let learned: HashSet<&str> = (0..current.len())
        .filter_map(|row| current.cell(row, KANJI_COL))
        .collect();

    let mut candidates: Vec<usize> = (0..master.len())
        .filter(|&row| {
            master
                .cell(row, KANJI_COL)
                .is_some_and(|kanji| !learned.contains(kanji))
        })
        .collect();
    info!(remaining = candidates.len(), "unlearned kanji remaining in source list");

    candidates.sort_by(|&lhs, &rhs| {
        sort_by.iter().fold(std::cmp::Ordering::Equal, |ordering, key| {
            ordering.then_with(|| {
                let column = key.column();
                match (master.number(lhs, column), master.number(rhs, column)) {
                    (Some(a), Some(b)) if key.ascending() => a.cmp(&b),
                    (Some(a), Some(b)) => b.cmp(&a),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                }
            })
        })
    });
    candidates.truncate(count);

    let mut selection = master.select(&candidates);
    let learned_at = Local::now().naive_local().format("%Y-%m-%dT%H:%M:%S%.6f").to_string();
    for row in 0..selection.len() {
        selection.set_cell(row, TIME_LEARNED_COL, learned_at.clone());
    }
    Ok(selection)
}

/// Renders selected kanji as a field-by-kanji grid for confirmation.
pub fn render_preview(selection: &KanjiTable) -> String {
    let mut builder = Builder::default();
    builder.push_record(
        std::iter::once(String::new()).chain((0..selection.len()).map(|row| {
            selection
                .cell(row, KANJI_COL)
                .unwrap_or(PREVIEW_MISSING)
                .to_string()
        })),
    );
    for &name in PREVIEW_ROWS
        .iter()
        .filter(|name| selection.column_index(name).is_some())
    {
        builder.push_record(std::iter::once(name.to_string()).chain(
            (0..selection.len()).map(|row| {
                selection
                    .cell(row, name)
                    .unwrap_or(PREVIEW_MISSING)
                    .to_string()
            }),
        ));
    }

    let mut table = builder.build();
    table.with(Style::modern_rounded());
    table.to_string()
}

/// Moves the next `count` unlearned kanji from the master list into the
/// current study list when `confirm` approves the preview. Returns how many
/// kanji were added.
#[instrument(
    level = "info",
    skip_all,
    fields(master = %master_path.display(), current = %current_path.display(), count = count)
)]
pub fn add_kanji(
    master_path: &Path,
    current_path: &Path,
    count: usize,
    sort_by: &[SortKey],
    confirm: impl FnOnce(&KanjiTable) -> Result<bool>,
) -> Result<usize> {
    let master = kanji_table::read_table(master_path)?;
    let mut current = kanji_table::read_table(current_path)?;

    let selection = select_new_kanji(&master, &current, count, sort_by)?;
    info!(selected = selection.len(), "learning kanji");

    if !confirm(&selection)? {
        info!("no new kanji added");
        return Ok(0);
    }
    current.append(&selection);
    kanji_table::write_table(current_path, &current)?;
    Ok(selection.len())
}

/// Repairs a StickyStudy CSV export and returns it as TSV with a header row.
#[instrument(level = "info", skip_all, fields(input = %input.display()))]
pub fn fix_export(input: &Path) -> Result<String> {
    let source = fs::read_to_string(input)?;
    let fixed = mojibake::fix_text(&source);
    if fixed == source {
        warn!("no mojibake detected in export");
    }
    let body: Vec<&str> = fixed.lines().skip(2).collect();
    Ok(format!("{EXPORT_HEADER}\n{}\n", body.join("\n")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: &[&[&str]]) -> KanjiTable {
        KanjiTable {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn sort_keys_parse() {
        assert_eq!("grade".parse::<SortKey>().expect("valid"), SortKey::Grade);
        assert!(matches!("strokes".parse::<SortKey>(), Err(StudyError::InvalidSortKey(_))));
    }

    #[test]
    fn selection_skips_learned_and_orders_by_keys() {
        let master = table(
            &["kanji", "jlpt", "grade", "freq"],
            &[
                &["語", "5", "2", "301"],
                &["日", "5", "1", "1"],
                &["書", "5", "2", "169"],
                &["曜", "4", "2", "940"],
                &["謎", "", "", ""],
                &["月", "5", "1", "23"],
            ],
        );
        let current = table(&["kanji", "jlpt"], &[&["日", "5"]]);

        let selection =
            select_new_kanji(&master, &current, 4, &SortKey::DEFAULT).expect("selection");

        let picked: Vec<&str> = (0..selection.len())
            .map(|row| selection.cell(row, "kanji").expect("kanji"))
            .collect();
        assert_eq!(picked, vec!["月", "書", "語", "曜"]);
        assert!(selection.cell(0, TIME_LEARNED_COL).is_some());
    }

    #[test]
    fn missing_values_sort_last() {
        let master = table(&["kanji", "jlpt"], &[&["謎", ""], &["曜", "4"]]);
        let selection = select_new_kanji(&master, &KanjiTable::default(), 2, &[SortKey::Jlpt])
            .expect("selection");
        assert_eq!(selection.cell(0, "kanji"), Some("曜"));
        assert_eq!(selection.cell(1, "kanji"), Some("謎"));
    }

    #[test]
    fn preview_lists_known_rows_only() {
        let selection = table(&["kanji", "jlpt", "meaning"], &[&["月", "5", ""]]);
        let preview = render_preview(&selection);
        assert!(preview.contains("jlpt"));
        assert!(preview.contains("—"));
        assert!(!preview.contains("grade"));
        assert!(preview.starts_with('╭'));
        assert_eq!(preview.lines().count(), 7);
    }

    #[test]
    fn preview_aligns_double_width_kanji() {
        let selection = table(
            &["kanji", "jlpt", "meaning"],
            &[&["月", "5", "month"], &["曜", "4", ""]],
        );
        let preview = render_preview(&selection);

        let display_width = |line: &str| -> usize {
            line.chars()
                .map(|c| if crate::stickystudy::deck::is_kanji(c) { 2 } else { 1 })
                .sum()
        };
        let widths: Vec<usize> = preview.lines().map(display_width).collect();
        assert!(widths.windows(2).all(|pair| pair[0] == pair[1]), "{widths:?}");
    }

    #[test]
    fn removed_kanji_block_regeneration() {
        let existing = Deck::new(None, vec![DeckCard::new("日", "ニチ", "", "")]);
        let error = carry_kanji_progress(Path::new("deck.txt"), Vec::new(), &existing)
            .expect_err("kanji removed");
        assert!(matches!(error, StudyError::KanjiRemoved { .. }));
    }

    #[test]
    fn duplicate_kanji_in_existing_deck_is_rejected() {
        let existing = Deck::new(
            None,
            vec![
                DeckCard::new("日", "ニチ", "", "").with_study_data("[1_a]"),
                DeckCard::new("日", "ニチ", "", "").with_study_data("[2_b]"),
            ],
        );
        let cards = vec![DeckCard::new("日", "ニチ", "", "")];
        let error = carry_kanji_progress(Path::new("deck.txt"), cards, &existing)
            .expect_err("duplicate kanji");
        assert!(matches!(error, StudyError::InvalidDeck { line: 2, .. }));
    }

    #[test]
    fn level_filter_limits_kanji_set() {
        let entries = vec![
            KanjiEntry { kanji: "日".into(), jlpt: Some(5), ..KanjiEntry::default() },
            KanjiEntry { kanji: "曜".into(), jlpt: Some(4), ..KanjiEntry::default() },
        ];
        let n5 = [JlptLevel::try_from(5).expect("level")];
        assert_eq!(kanji_for_levels(&entries, Some(&n5)), BTreeSet::from(['日']));
        assert_eq!(kanji_for_levels(&entries, None).len(), 2);
    }
}
