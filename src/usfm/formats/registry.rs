//! Format registry for document output
//!
//! Each output format implements [`Formatter`] and is looked up by name in a
//! [`FormatRegistry`]. The CLI resolves `convert --format` through the default registry.

use crate::usfm::ast::Document;
use std::collections::HashMap;
use thiserror::Error;

/// Error that can occur during formatting
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormatError {
    /// Format not found in registry
    #[error("Format '{0}' not found")]
    FormatNotFound(String),
    /// Error during serialization
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Serializes a [`Document`] to one output format.
pub trait Formatter: Send + Sync {
    /// The name of this format (e.g., "usfm", "json")
    fn name(&self) -> &str;

    fn serialize(&self, doc: &Document) -> Result<String, FormatError>;

    fn description(&self) -> &str {
        ""
    }
}

/// Registry of document formatters, keyed by name.
pub struct FormatRegistry {
    formatters: HashMap<String, Box<dyn Formatter>>,
}

impl FormatRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        FormatRegistry {
            formatters: HashMap::new(),
        }
    }

    /// Register a formatter, replacing any formatter with the same name.
    pub fn register<F: Formatter + 'static>(&mut self, formatter: F) {
        self.formatters
            .insert(formatter.name().to_string(), Box::new(formatter));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Formatter> {
        self.formatters.get(name).map(|f| f.as_ref())
    }

    pub fn has(&self, name: &str) -> bool {
        self.formatters.contains_key(name)
    }

    /// Serialize a document using the specified format
    pub fn serialize(&self, doc: &Document, format: &str) -> Result<String, FormatError> {
        let formatter = self
            .get(format)
            .ok_or_else(|| FormatError::FormatNotFound(format.to_string()))?;
        tracing::debug!(format, "serializing document");
        formatter.serialize(doc)
    }

    /// List all available format names (sorted)
    pub fn list_formats(&self) -> Vec<String> {
        let mut names: Vec<_> = self.formatters.keys().cloned().collect();
        names.sort();
        names
    }

    /// `(name, description)` pairs, sorted by name.
    pub fn describe(&self) -> Vec<(String, String)> {
        self.list_formats()
            .into_iter()
            .filter_map(|name| {
                let description = self.get(&name)?.description().to_string();
                Some((name, description))
            })
            .collect()
    }

    /// Create a registry with the built-in formatters
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register(super::UsfmFormatter::default());
        registry.register(super::JsonFormatter);

        registry
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usfm::ast::{Chapter, Verse, VerseObject};

    struct TestFormatter;
    impl Formatter for TestFormatter {
        fn name(&self) -> &str {
            "test"
        }
        fn serialize(&self, _doc: &Document) -> Result<String, FormatError> {
            Ok("test output".to_string())
        }
        fn description(&self) -> &str {
            "Test formatter"
        }
    }

    fn sample() -> Document {
        let mut chapter = Chapter::new();
        chapter.insert("1", Verse::new(vec![VerseObject::text("In the beginning")]));
        let mut doc = Document::default();
        doc.chapters.insert("1", chapter);
        doc
    }

    #[test]
    fn test_registry_creation() {
        let registry = FormatRegistry::new();
        assert_eq!(registry.formatters.len(), 0);
    }

    #[test]
    fn test_registry_register() {
        let mut registry = FormatRegistry::new();
        registry.register(TestFormatter);

        assert!(registry.has("test"));
        assert_eq!(registry.list_formats(), vec!["test"]);
    }

    #[test]
    fn test_registry_get() {
        let mut registry = FormatRegistry::new();
        registry.register(TestFormatter);

        let formatter = registry.get("test");
        assert!(formatter.is_some());
        assert_eq!(formatter.unwrap().name(), "test");
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn test_registry_serialize() {
        let mut registry = FormatRegistry::new();
        registry.register(TestFormatter);

        let result = registry.serialize(&sample(), "test");
        assert_eq!(result, Ok("test output".to_string()));
    }

    #[test]
    fn test_registry_serialize_not_found() {
        let registry = FormatRegistry::new();
        let result = registry.serialize(&sample(), "nonexistent");
        assert_eq!(
            result,
            Err(FormatError::FormatNotFound("nonexistent".to_string()))
        );
    }

    #[test]
    fn test_registry_defaults() {
        let registry = FormatRegistry::with_defaults();
        assert_eq!(registry.list_formats(), vec!["json", "usfm"]);
        assert_eq!(
            registry.serialize(&sample(), "usfm").unwrap(),
            "\\c 1\n\\v 1 In the beginning"
        );
    }

    #[test]
    fn test_describe_lists_descriptions() {
        let mut registry = FormatRegistry::new();
        registry.register(TestFormatter);
        assert_eq!(
            registry.describe(),
            vec![("test".to_string(), "Test formatter".to_string())]
        );
    }

    #[test]
    fn test_format_error_display() {
        let err = FormatError::FormatNotFound("xyz".to_string());
        assert_eq!(format!("{err}"), "Format 'xyz' not found");

        let err = FormatError::SerializationError("failed".to_string());
        assert_eq!(format!("{err}"), "Serialization error: failed");
    }

    #[test]
    fn test_registry_replace() {
        let mut registry = FormatRegistry::new();
        registry.register(TestFormatter);
        registry.register(TestFormatter);

        assert_eq!(registry.list_formats().len(), 1);
    }
}
