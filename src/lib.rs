//! Core library for the `stickystudy` command line application.
//!
//! The library keeps StickyStudy flashcard decks in sync with a kanji study
//! list. File formats live under [`stickystudy::io`], data representations in
//! [`stickystudy::model`], card construction in [`stickystudy::cards`], deck
//! set operations in [`stickystudy::deck`], and the subcommand orchestration
//! under [`stickystudy::sync`].

pub mod stickystudy;

pub use stickystudy::{Result, StudyError, cards, config, deck, error, io, model, sync};
