//! Main module for the USFM converter
//!
//! - [`parsing`]: USFM text to a verse objects [`Document`]
//! - [`formats`]: a [`Document`] back to USFM (or JSON)
//! - [`filter`]: displayed text of a verse fragment
//! - [`indexing`]: word counts and translationWords check data

pub mod ast;
pub mod config;
pub mod error;
pub mod filter;
pub mod formats;
pub mod indexing;
pub mod lexing;
pub mod markers;
pub mod parsing;

pub use ast::{Chapter, Document, KeyedMap, ObjectKind, Verse, VerseObject};
pub use error::{Result, UsfmError};
pub use filter::remove_markup;
pub use formats::{to_usfm, SerializeOptions};
pub use parsing::{parse, ParseOptions};
