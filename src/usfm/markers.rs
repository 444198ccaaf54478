//! Marker properties table
//!
//! Every USFM tag the converter knows about is described here: its category, how it is
//! terminated, whether its content is display text or opaque content, and whether it
//! carries `|` attributes. The table is pure data. The parser and serializer both take a
//! `&MarkerTable` so nothing here is global state; [`MarkerTable::standard`] hands out the
//! shared read-only instance.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Category recorded as the `type` of a marker node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Paragraph,
    Quote,
    Section,
    Footnote,
    Milestone,
}

/// How a spanned marker is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndRule {
    /// A single suffix, e.g. `*` for `\bd ...\bd*` or `-e` for `\zaln-s ... \zaln-e\*`.
    Suffix(&'static str),
    /// Several accepted suffixes (only `k` uses this: `\k-e\*` or `\k*`).
    AnyOf(&'static [&'static str]),
    /// A fixed end tag spelled independently of the start tag (`\esb ... \esbe`).
    Literal(&'static str),
}

impl EndRule {
    /// All termination suffixes accepted for this rule.
    pub fn terminations(&self) -> &[&'static str] {
        match self {
            EndRule::Suffix(s) | EndRule::Literal(s) => std::slice::from_ref(s),
            EndRule::AnyOf(list) => list,
        }
    }

    /// The single suffix, when the rule has exactly one.
    pub fn single(&self) -> Option<&'static str> {
        match self {
            EndRule::Suffix(s) | EndRule::Literal(s) => Some(s),
            EndRule::AnyOf(_) => None,
        }
    }
}

/// Properties of a single tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MarkerProps {
    pub category: Option<Category>,
    pub end: Option<EndRule>,
    pub display: bool,
    pub attrib: bool,
    pub end_attrib: bool,
    pub milestone: bool,
    pub usfm3_milestone: bool,
    pub standalone: bool,
}

impl MarkerProps {
    const fn new() -> Self {
        MarkerProps {
            category: None,
            end: None,
            display: false,
            attrib: false,
            end_attrib: false,
            milestone: false,
            usfm3_milestone: false,
            standalone: false,
        }
    }

    const fn display(mut self) -> Self {
        self.display = true;
        self
    }

    const fn ends(mut self, suffix: &'static str) -> Self {
        self.end = Some(EndRule::Suffix(suffix));
        self
    }

    const fn ends_any(mut self, suffixes: &'static [&'static str]) -> Self {
        self.end = Some(EndRule::AnyOf(suffixes));
        self
    }

    const fn ends_with(mut self, tag: &'static str) -> Self {
        self.end = Some(EndRule::Literal(tag));
        self
    }

    const fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    const fn attrib(mut self) -> Self {
        self.attrib = true;
        self
    }

    const fn end_attrib(mut self) -> Self {
        self.end_attrib = true;
        self
    }

    const fn milestone(mut self) -> Self {
        self.milestone = true;
        self
    }

    const fn usfm3(mut self) -> Self {
        self.usfm3_milestone = true;
        self
    }

    const fn standalone(mut self) -> Self {
        self.standalone = true;
        self
    }
}

const DISPLAY: MarkerProps = MarkerProps::new().display();
const CHAR_SPAN: MarkerProps = MarkerProps::new().ends("*").display();
const NOTE_SPAN: MarkerProps = MarkerProps::new().ends("*");
const PARAGRAPH: MarkerProps = MarkerProps::new()
    .category(Category::Paragraph)
    .display();
const POETRY: MarkerProps = MarkerProps::new().category(Category::Quote).display();
const SECTION: MarkerProps = MarkerProps::new().category(Category::Section);
const QUOTE_SPAN: MarkerProps = MarkerProps::new()
    .category(Category::Quote)
    .ends("*")
    .display()
    .milestone()
    .attrib();
const QUOTE_START: MarkerProps = MarkerProps::new()
    .category(Category::Quote)
    .ends("-e")
    .display()
    .milestone()
    .usfm3()
    .attrib();
const QUOTE_END: MarkerProps = MarkerProps::new().end_attrib();

const STANDARD_ENTRIES: &[(&str, MarkerProps)] = &[
    ("+add", CHAR_SPAN),
    ("+bd", CHAR_SPAN),
    ("+bdit", CHAR_SPAN),
    ("+bk", CHAR_SPAN),
    ("+dc", CHAR_SPAN),
    ("+em", CHAR_SPAN),
    ("+it", CHAR_SPAN),
    ("+k", CHAR_SPAN),
    ("+lit", DISPLAY),
    ("+nd", CHAR_SPAN),
    ("+no", CHAR_SPAN),
    ("+ord", CHAR_SPAN),
    ("+pn", CHAR_SPAN),
    ("+png", CHAR_SPAN),
    ("+qt", MarkerProps::new().category(Category::Quote).ends("*").display()),
    ("+sc", CHAR_SPAN),
    ("+sig", CHAR_SPAN),
    ("+sls", CHAR_SPAN),
    ("+sup", CHAR_SPAN),
    ("+tl", CHAR_SPAN),
    ("+wj", CHAR_SPAN),
    ("add", CHAR_SPAN),
    ("b", PARAGRAPH),
    ("bd", CHAR_SPAN),
    ("bdit", CHAR_SPAN),
    ("bk", CHAR_SPAN),
    ("ca", NOTE_SPAN),
    ("cat", NOTE_SPAN),
    ("cls", PARAGRAPH),
    ("d", DISPLAY),
    ("dc", CHAR_SPAN),
    ("ef", NOTE_SPAN),
    ("em", CHAR_SPAN),
    ("esb", MarkerProps::new().ends_with("esbe")),
    ("ex", NOTE_SPAN),
    ("f", MarkerProps::new().category(Category::Footnote).ends("*")),
    ("fa", NOTE_SPAN),
    ("fdc", NOTE_SPAN),
    ("fe", NOTE_SPAN),
    ("fig", MarkerProps::new().ends("*").attrib()),
    ("fm", NOTE_SPAN),
    ("fqa", NOTE_SPAN),
    ("fv", NOTE_SPAN),
    ("ior", NOTE_SPAN),
    ("iqt", NOTE_SPAN),
    ("it", CHAR_SPAN),
    ("jmp", MarkerProps::new().ends("*").attrib().display()),
    (
        "k",
        MarkerProps::new()
            .ends_any(&["-e", "*"])
            .category(Category::Milestone)
            .display()
            .attrib(),
    ),
    ("lf", DISPLAY),
    ("lh", DISPLAY),
    ("li", CHAR_SPAN),
    ("lik", CHAR_SPAN),
    ("lim", DISPLAY),
    ("lim1", DISPLAY),
    ("lim2", DISPLAY),
    ("lim3", DISPLAY),
    ("lim4", DISPLAY),
    ("lim5", DISPLAY),
    ("lit", DISPLAY),
    ("litl", CHAR_SPAN),
    ("liv", CHAR_SPAN),
    ("liv1", CHAR_SPAN),
    ("liv2", CHAR_SPAN),
    ("liv3", CHAR_SPAN),
    ("liv4", CHAR_SPAN),
    ("liv5", CHAR_SPAN),
    ("m", PARAGRAPH),
    ("mi", PARAGRAPH),
    ("nb", PARAGRAPH),
    ("nd", CHAR_SPAN),
    ("ndx", NOTE_SPAN),
    ("no", CHAR_SPAN),
    ("ord", CHAR_SPAN),
    ("p", PARAGRAPH),
    ("pb", PARAGRAPH),
    ("pc", PARAGRAPH),
    ("ph", PARAGRAPH),
    ("ph1", PARAGRAPH),
    ("ph2", PARAGRAPH),
    ("ph3", PARAGRAPH),
    ("ph4", PARAGRAPH),
    ("ph5", PARAGRAPH),
    ("pi", PARAGRAPH),
    ("pi1", PARAGRAPH),
    ("pi2", PARAGRAPH),
    ("pi3", PARAGRAPH),
    ("pi4", PARAGRAPH),
    ("pi5", PARAGRAPH),
    ("pm", PARAGRAPH),
    ("pmc", PARAGRAPH),
    ("pmo", PARAGRAPH),
    ("pmr", PARAGRAPH),
    ("pn", CHAR_SPAN),
    ("png", CHAR_SPAN),
    ("po", PARAGRAPH),
    ("pr", PARAGRAPH),
    ("pro", NOTE_SPAN),
    ("q", POETRY),
    ("q1", POETRY),
    ("q2", POETRY),
    ("q3", POETRY),
    ("q4", POETRY),
    ("qa", POETRY),
    ("qac", MarkerProps::new().category(Category::Quote).ends("*").display()),
    ("qc", POETRY),
    ("qm", POETRY),
    ("qr", POETRY),
    ("qs", MarkerProps::new().category(Category::Quote).ends("*").display()),
    ("qt", QUOTE_SPAN),
    ("qt1", QUOTE_SPAN),
    ("qt2", QUOTE_SPAN),
    ("qt3", QUOTE_SPAN),
    ("qt4", QUOTE_SPAN),
    ("qt5", QUOTE_SPAN),
    ("qt-e", QUOTE_END),
    ("qt1-e", QUOTE_END),
    ("qt2-e", QUOTE_END),
    ("qt3-e", QUOTE_END),
    ("qt4-e", QUOTE_END),
    ("qt5-e", QUOTE_END),
    ("qt-s", QUOTE_START),
    ("qt1-s", QUOTE_START),
    ("qt2-s", QUOTE_START),
    ("qt3-s", QUOTE_START),
    ("qt4-s", QUOTE_START),
    ("qt5-s", QUOTE_START),
    ("rb", MarkerProps::new().ends("*").display().attrib()),
    ("rq", NOTE_SPAN),
    ("rt", NOTE_SPAN),
    ("s", SECTION),
    ("s1", SECTION),
    ("s2", SECTION),
    ("s3", SECTION),
    ("s4", SECTION),
    ("s5", SECTION),
    ("sc", CHAR_SPAN),
    ("sig", CHAR_SPAN),
    ("sis", NOTE_SPAN),
    ("sls", CHAR_SPAN),
    ("sp", DISPLAY),
    ("sup", CHAR_SPAN),
    ("tl", CHAR_SPAN),
    ("ts", MarkerProps::new().milestone().standalone()),
    ("ts-e", MarkerProps::new().milestone().end_attrib().standalone()),
    ("ts-s", MarkerProps::new().milestone().end_attrib().standalone()),
    ("v", DISPLAY),
    ("va", NOTE_SPAN),
    ("vp", NOTE_SPAN),
    ("w", MarkerProps::new().ends("*").display().attrib()),
    ("wa", CHAR_SPAN),
    ("wg", CHAR_SPAN),
    ("wh", CHAR_SPAN),
    ("wj", CHAR_SPAN),
    ("x", NOTE_SPAN),
    ("xdc", NOTE_SPAN),
    ("xnt", NOTE_SPAN),
    ("xop", NOTE_SPAN),
    ("xot", NOTE_SPAN),
    ("xt", MarkerProps::new().ends("*").attrib()),
    (
        "zaln",
        MarkerProps::new()
            .ends("-e")
            .category(Category::Milestone)
            .display()
            .attrib(),
    ),
];

/// End markers whose start tag can't be derived by stripping a suffix.
const SPECIAL_END_TAGS: &[(&str, &str)] = &[
    ("esbe", "esb"),
    ("qt-e", "qt-s"),
    ("qt1-e", "qt1-s"),
    ("qt2-e", "qt2-s"),
    ("qt3-e", "qt3-s"),
    ("qt4-e", "qt4-s"),
    ("qt5-e", "qt5-s"),
];

/// Tags that keep a numeric argument.
const NUMBERED_TAGS: &[&str] = &["c", "v"];

/// Word attributes written with an `x-` prefix in USFM and stored without it.
pub const WORD_SPECIAL_ATTRIBUTES: &[&str] = &["morph", "occurrence", "occurrences", "tw"];

static STANDARD: Lazy<MarkerTable> = Lazy::new(|| {
    MarkerTable::from_entries(STANDARD_ENTRIES.iter().copied(), SPECIAL_END_TAGS.iter().copied())
});

/// Lookup table from tag name to [`MarkerProps`].
#[derive(Debug, Clone)]
pub struct MarkerTable {
    props: HashMap<&'static str, MarkerProps>,
    special_end_tags: HashMap<&'static str, &'static str>,
}

impl MarkerTable {
    /// Build a table from explicit entries.
    pub fn from_entries(
        entries: impl IntoIterator<Item = (&'static str, MarkerProps)>,
        special_end_tags: impl IntoIterator<Item = (&'static str, &'static str)>,
    ) -> Self {
        MarkerTable {
            props: entries.into_iter().collect(),
            special_end_tags: special_end_tags.into_iter().collect(),
        }
    }

    /// The standard USFM 3 table.
    pub fn standard() -> &'static MarkerTable {
        &STANDARD
    }

    pub fn get(&self, tag: &str) -> Option<&MarkerProps> {
        self.props.get(tag)
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    /// `type` recorded for a tag. Milestone categories are only honored for `-s` tags.
    pub fn category(&self, tag: &str) -> Option<Category> {
        match self.get(tag).and_then(|p| p.category) {
            Some(Category::Milestone) if !tag.contains("-s") => None,
            other => other,
        }
    }

    pub fn end_rule(&self, tag: &str) -> Option<EndRule> {
        self.get(tag).and_then(|p| p.end)
    }

    pub fn is_displayable(&self, tag: &str) -> bool {
        self.get(tag).is_some_and(|p| p.display)
    }

    pub fn has_attributes(&self, tag: &str) -> bool {
        self.get(tag).is_some_and(|p| p.attrib)
    }

    pub fn has_end_attributes(&self, tag: &str) -> bool {
        self.get(tag).is_some_and(|p| p.end_attrib)
    }

    pub fn is_standalone(&self, tag: &str) -> bool {
        self.get(tag).is_some_and(|p| p.standalone)
    }

    pub fn is_milestone(&self, tag: &str) -> bool {
        self.get(tag).is_some_and(|p| p.milestone)
    }

    pub fn is_usfm3_milestone(&self, tag: &str) -> bool {
        self.get(tag).is_some_and(|p| p.usfm3_milestone)
    }

    pub fn supports_number(&self, tag: &str) -> bool {
        NUMBERED_TAGS.contains(&tag)
    }

    /// Start tag for a one-off end marker such as `qt-e`.
    pub fn special_start_for(&self, end_tag: &str) -> Option<&'static str> {
        self.special_end_tags.get(end_tag).copied()
    }
}

impl Default for MarkerTable {
    fn default() -> Self {
        MarkerTable::standard().clone()
    }
}
