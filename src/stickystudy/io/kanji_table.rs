use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};
use tracing::info;

use crate::stickystudy::error::{Result, StudyError};
use crate::stickystudy::model::KanjiTable;

/// Reads a tab-separated kanji list whose first line names the columns.
///
/// Fields may be double-quoted, as pandas does for cells holding a tab, a
/// quote or a line break.
pub fn read_table(path: &Path) -> Result<KanjiTable> {
    info!(path = %path.display(), "loading kanji data");
    let table = parse_table(File::open(path)?, path)?;
    info!(entries = table.len(), "loaded kanji data");
    Ok(table)
}

/// Writes the table back as TSV, header first, quoting only where needed.
pub fn write_table(path: &Path, table: &KanjiTable) -> Result<()> {
    info!(path = %path.display(), "saving kanji data");
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(QuoteStyle::Necessary)
        .flexible(true)
        .from_path(path)?;
    writer.write_record(&table.columns)?;
    for cells in &table.rows {
        writer.write_record(cells)?;
    }
    writer.flush()?;
    info!(entries = table.len(), "saved kanji data");
    Ok(())
}

fn parse_table(source: impl Read, path: &Path) -> Result<KanjiTable> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .from_reader(source);
    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut table = KanjiTable::new(columns);

    for record in reader.records() {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        if record.len() > table.columns.len() {
            return Err(StudyError::InvalidTable {
                path: path.to_path_buf(),
                line: record.position().map_or(0, |position| position.line() as usize),
                message: format!(
                    "expected at most {} fields, found {}",
                    table.columns.len(),
                    record.len()
                ),
            });
        }
        let mut cells: Vec<String> = record.iter().map(str::to_string).collect();
        cells.resize(table.columns.len(), String::new());
        table.rows.push(cells);
    }

    Ok(table)
}
