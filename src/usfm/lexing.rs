//! Line tokenizer
//!
//! Splits USFM source into a flat stream of [`Token`]s. Each line is scanned for
//! `\tag number content` runs; whatever sits between runs becomes an orphan text token.
//! A single space or line break right after a run is recorded as the run's `next_char` so
//! the serializer can put it back.
//!
//! The scan follows the historical marker pattern used by the verse objects tooling:
//!
//! ```text
//! ([^\\]+)?\\(\+?\w+\s*\d*)(?!\w)\s*([^\\]+)?(\\\w\*)?
//! ```
//!
//! `\w` and `\d` are ASCII classes, `\s` is Unicode whitespace. The pattern needs a
//! negative lookahead, so the marker head is matched by hand in [`match_marker_head`].
//! A backslash that isn't followed by a marker name is skipped and the scan resumes right
//! after it.

use crate::usfm::markers::MarkerTable;

/// A tokenizer record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Text that doesn't belong to any marker.
    Orphan(String),
    Marker(RawMarker),
}

impl Token {
    pub fn orphan(text: impl Into<String>) -> Self {
        Token::Orphan(text.into())
    }

    pub fn is_orphan(&self) -> bool {
        matches!(self, Token::Orphan(_))
    }
}

/// A `\tag` occurrence with the text that follows it.
///
/// Empty strings stand for absent values. `attrib`, `end_tag` and `end_marker_char` are only
/// filled in while the folder works on the marker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMarker {
    pub tag: String,
    pub number: String,
    pub content: String,
    pub next_char: String,
    pub end_marker_char: String,
    pub attrib: Option<String>,
    pub end_tag: Option<String>,
}

impl RawMarker {
    pub fn new(tag: impl Into<String>) -> Self {
        RawMarker {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.number = number.into();
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_next_char(mut self, next_char: impl Into<String>) -> Self {
        self.next_char = next_char.into();
        self
    }
}

/// JavaScript `\s`.
pub(crate) fn is_js_space(c: char) -> bool {
    (c.is_whitespace() && c != '\u{85}') || c == '\u{feff}'
}

/// JavaScript `String.prototype.trim`.
pub(crate) fn js_trim(s: &str) -> &str {
    s.trim_matches(is_js_space)
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn skip_while(line: &str, from: usize, pred: impl Fn(char) -> bool) -> usize {
    line[from..]
        .char_indices()
        .find(|(_, c)| !pred(*c))
        .map_or(line.len(), |(i, _)| from + i)
}

fn char_len_at(s: &str, at: usize) -> usize {
    s[at..].chars().next().map_or(1, char::len_utf8)
}

fn prev_boundary(s: &str, at: usize) -> usize {
    s[..at].chars().next_back().map_or(0, |c| at - c.len_utf8())
}

/// JavaScript `substring`: bounds are clamped and swapped if reversed.
fn js_substring(s: &str, a: usize, b: usize) -> &str {
    let (a, b) = (a.min(s.len()), b.min(s.len()));
    let (a, b) = if a > b { (b, a) } else { (a, b) };
    s.get(a..b).unwrap_or("")
}

/// Match `\+?\w+\s*\d*(?!\w)` after the backslash at `backslash`, returning the end of
/// the marker head.
fn match_marker_head(line: &str, backslash: usize) -> Option<usize> {
    let bytes = line.as_bytes();
    let mut start = backslash + 1;
    if bytes.get(start) == Some(&b'+') {
        start += 1;
    }
    let word_end = start + bytes[start.min(bytes.len())..]
        .iter()
        .take_while(|b| is_word_byte(**b))
        .count();
    if word_end == start {
        return None;
    }
    let space_end = skip_while(line, word_end, is_js_space);
    if space_end == word_end {
        return Some(word_end);
    }
    let digit_end = skip_while(line, space_end, |c| c.is_ascii_digit());
    match bytes.get(digit_end) {
        Some(b) if is_word_byte(*b) => Some(prev_boundary(line, space_end)),
        _ => Some(digit_end),
    }
}

/// One application of the marker pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LineMatch<'a> {
    start: usize,
    marker_start: usize,
    end: usize,
    open: &'a str,
    content: Option<&'a str>,
    close: Option<&'a str>,
}

fn next_match(line: &str, from: usize) -> Option<LineMatch<'_>> {
    let mut start = from;
    loop {
        let backslash = start + line[start..].find('\\')?;
        let Some(open_end) = match_marker_head(line, backslash) else {
            tracing::trace!(offset = backslash, "backslash without a marker name");
            start = backslash + 1;
            continue;
        };
        let content_start = skip_while(line, open_end, is_js_space);
        let content_end = line[content_start..]
            .find('\\')
            .map_or(line.len(), |i| content_start + i);
        let bytes = line.as_bytes();
        let has_close = bytes.get(content_end) == Some(&b'\\')
            && bytes.get(content_end + 1).is_some_and(|b| is_word_byte(*b))
            && bytes.get(content_end + 2) == Some(&b'*');
        let end = if has_close { content_end + 3 } else { content_end };
        return Some(LineMatch {
            start,
            marker_start: backslash,
            end,
            open: &line[backslash + 1..open_end],
            content: (content_end > content_start).then(|| &line[content_start..content_end]),
            close: has_close.then(|| &line[content_end..end]),
        });
    }
}

/// Split `\+?\w+\s*\d*` into tag and number.
fn split_open(open: &str) -> (String, String) {
    let bytes = open.as_bytes();
    let mut tag_end = usize::from(bytes.first() == Some(&b'+'));
    tag_end += bytes[tag_end..].iter().take_while(|b| is_word_byte(**b)).count();
    let number_start = skip_while(open, tag_end, is_js_space);
    let number_end = skip_while(open, number_start, |c| c.is_ascii_digit());
    (
        open[..tag_end].to_string(),
        open[number_start..number_end].to_string(),
    )
}

/// Tokenize a single line. `last_line` suppresses the implicit trailing newline.
pub fn tokenize_line(line: &str, last_line: bool, table: &MarkerTable) -> Vec<Token> {
    let mut tokens = Vec::new();
    if js_trim(line).is_empty() {
        if !last_line {
            tokens.push(Token::orphan(format!("{line}\n")));
        }
        return tokens;
    }

    let mut matches = Vec::new();
    let mut pos = 0;
    while let Some(m) = next_match(line, pos) {
        pos = m.end;
        matches.push(m);
    }

    let Some(first) = matches.first() else {
        let newline = if last_line { "" } else { "\n" };
        tokens.push(Token::orphan(format!("{line}{newline}")));
        return tokens;
    };
    if first.start > 0 {
        tokens.push(Token::orphan(&line[..first.start - 1]));
    }

    let mut last_next_char = String::new();
    for m in &matches {
        if m.marker_start > m.start {
            tokens.push(Token::orphan(&line[m.start..m.marker_start]));
        }
        let whole = &line[m.marker_start..m.end];
        let open = js_trim(m.open);
        let content = m.content.unwrap_or("");
        let (tag, number) = split_open(open);
        let mut marker = RawMarker::new(tag)
            .with_number(number)
            .with_content(content);

        if open.len() != m.open.len() && marker.number.is_empty() {
            let expected = match m.content {
                Some(c) => format!("\\{open} {c}"),
                None => format!("\\{open}"),
            };
            if whole != expected {
                let run_to_end = m.end >= line.len();
                let base = 1 + open.len();
                let mut start_pos = base + char_len_at(whole, base.min(whole.len()));
                let needle = m.content.unwrap_or("undefined");
                let mut end_pos = whole
                    .get(start_pos..)
                    .and_then(|rest| rest.find(needle))
                    .map(|i| i + start_pos);
                if end_pos.is_none() {
                    if !run_to_end {
                        if whole.len() == 1 + m.open.len() {
                            marker.next_char = " ".to_string();
                        }
                    } else {
                        end_pos = Some(start_pos);
                        start_pos = prev_boundary(whole, start_pos.min(whole.len()));
                    }
                }
                if let Some(end_pos) = end_pos {
                    let prefix = js_substring(whole, start_pos, end_pos);
                    if !prefix.is_empty() {
                        marker.content = format!("{prefix}{content}");
                    }
                }
            }
        }

        if !marker.number.is_empty() && !table.supports_number(&marker.tag) {
            marker.content = match whole.find(marker.tag.as_str()) {
                Some(tag_pos) => {
                    let after_tag = tag_pos + marker.tag.len();
                    let skip = if after_tag < whole.len() {
                        char_len_at(whole, after_tag)
                    } else {
                        1
                    };
                    whole.get(after_tag + skip..).unwrap_or("").to_string()
                }
                None => format!("{} {}", marker.number, content),
            };
            marker.number.clear();
        }

        if let Some(close) = m.close {
            if let Some(pos) = marker.content.rfind(close) {
                marker.content.truncate(pos);
            }
            tokens.push(Token::Marker(marker));
            marker = RawMarker::new(&close[1..]);
        }

        if !last_line && m.end >= line.len() {
            marker.next_char = "\n".to_string();
        } else if line[m.end..].starts_with(' ') {
            marker.next_char = " ".to_string();
        }
        last_next_char = marker.next_char.clone();
        tokens.push(Token::Marker(marker));
    }

    if let Some(last) = matches.last() {
        if last.end < line.len() {
            let mut orphan = line[last.end..].to_string();
            if !last_line {
                orphan.push('\n');
            }
            if last_next_char == " " {
                orphan.remove(0);
            }
            tokens.push(Token::Orphan(orphan));
        }
    }
    tokens
}

/// Tokenize a whole document. Lines are split on `\n` or `\r\n`.
pub fn tokenize(source: &str, table: &MarkerTable) -> Vec<Token> {
    let lines: Vec<&str> = source.split('\n').collect();
    let last = lines.len().saturating_sub(1);
    let mut tokens = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let line = if i < last {
            line.strip_suffix('\r').unwrap_or(line)
        } else {
            line
        };
        tokens.extend(tokenize_line(line, i >= last, table));
    }
    tokens
}
