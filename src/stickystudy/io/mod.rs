pub mod deck_file;
pub mod kanji_table;
pub mod mojibake;
