//! Verse objects JSON output

use super::registry::{FormatError, Formatter};
use crate::usfm::ast::Document;

/// Pretty-printed verse objects JSON.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn name(&self) -> &str {
        "json"
    }

    fn serialize(&self, doc: &Document) -> Result<String, FormatError> {
        doc.to_json_pretty()
            .map_err(|e| FormatError::SerializationError(e.to_string()))
    }

    fn description(&self) -> &str {
        "Verse objects JSON"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usfm::ast::{Chapter, Verse, VerseObject};

    #[test]
    fn test_json_output_reads_back() {
        let mut chapter = Chapter::new();
        chapter.insert("1", Verse::new(vec![VerseObject::word("Paul").with_attribute("occurrence", 1)]));
        let mut doc = Document::default();
        doc.chapters.insert("1", chapter);

        let json = JsonFormatter.serialize(&doc).unwrap();
        assert!(json.contains("\"verseObjects\""));
        assert_eq!(Document::from_json(&json).unwrap(), doc);
    }
}
