//! # usfm
//!
//! Converts USFM scripture markup to the verse objects JSON used by the alignment tools,
//! and back.
//!
//! ```text
//! \c 1 \v 1 \w Paul|x-occurrence="1"\w*, a servant   <->   {"chapters": {"1": {"1": {"verseObjects": [...]}}}}
//! ```

pub mod usfm;

pub use usfm::{parse, remove_markup, to_usfm, Document, ParseOptions, SerializeOptions};
