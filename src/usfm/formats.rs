//! Output formats
//!
//! - [`usfm`]: the verse objects to USFM writer
//! - [`json`]: verse objects JSON
//! - [`registry`]: name-based lookup used by the CLI

pub mod json;
pub mod registry;
pub mod usfm;

pub use json::JsonFormatter;
pub use registry::{FormatError, FormatRegistry, Formatter};
pub use usfm::{chapter_to_usfm, to_usfm, verse_objects_to_usfm, SerializeOptions, UsfmFormatter};
