//! In-memory directory backend.
//!
//! Evaluates LDAP-style filters (`&`, `|`, `!`, equality, presence and
//! substring items) over a fixed set of entries. Suitable for tests and
//! local development; production deployments plug a real directory client
//! into [`DirectoryBackend`].

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

use crate::directory::{DirectoryBackend, DirectoryEntry};
use crate::error::{DirectoryError, DirectoryResult};
use crate::pattern::Pattern;

/// Directory statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectoryStats {
    /// Calls to `search_for_single_entry`
    pub single_entry_searches: usize,
    /// Calls to `search_for_single_attribute_values`
    pub attribute_searches: usize,
    /// Calls to `search_entries`
    pub entry_searches: usize,
}

impl DirectoryStats {
    /// Total number of backend round-trips.
    pub fn total(&self) -> usize {
        self.single_entry_searches + self.attribute_searches + self.entry_searches
    }
}

/// In-memory directory implementation.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    /// Entries in insertion order
    entries: Vec<DirectoryEntry>,
    /// Search parameters that trigger a connection error
    failing_params: HashSet<String>,
    /// Every call fails when set
    offline: bool,
    single_entry_searches: AtomicUsize,
    attribute_searches: AtomicUsize,
    entry_searches: AtomicUsize,
}

impl MemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry.
    pub fn with_entry(mut self, entry: DirectoryEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Add several entries.
    pub fn with_entries<I>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = DirectoryEntry>,
    {
        self.entries.extend(entries);
        self
    }

    /// Fail any search whose parameters include `param`.
    pub fn failing_on(mut self, param: impl Into<String>) -> Self {
        self.failing_params.insert(param.into());
        self
    }

    /// Fail every search.
    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    /// Snapshot of the call counters.
    pub fn stats(&self) -> DirectoryStats {
        DirectoryStats {
            single_entry_searches: self.single_entry_searches.load(Ordering::SeqCst),
            attribute_searches: self.attribute_searches.load(Ordering::SeqCst),
            entry_searches: self.entry_searches.load(Ordering::SeqCst),
        }
    }

    fn check_available(&self, params: &[String]) -> DirectoryResult<()> {
        if self.offline {
            return Err(DirectoryError::Connection("directory is offline".to_string()));
        }
        if let Some(param) = params.iter().find(|p| self.failing_params.contains(*p)) {
            return Err(DirectoryError::Connection(format!(
                "search for {} failed",
                param
            )));
        }
        Ok(())
    }

    fn matching(&self, base: &str, filter: &str, params: &[String]) -> DirectoryResult<Vec<&DirectoryEntry>> {
        let escaped: Vec<String> = params.iter().map(|p| escape_filter_value(p)).collect();
        let filter = Filter::parse(&Pattern::new(filter).format(&escaped))?;

        Ok(self
            .entries
            .iter()
            .filter(|entry| in_scope(&entry.dn, base) && filter.matches(entry))
            .collect())
    }
}

#[async_trait]
impl DirectoryBackend for MemoryDirectory {
    async fn search_for_single_entry(
        &self,
        base: &str,
        filter: &str,
        params: &[String],
    ) -> DirectoryResult<Option<String>> {
        self.single_entry_searches.fetch_add(1, Ordering::SeqCst);
        self.check_available(params)?;

        let matches = self.matching(base, filter, params)?;
        debug!(base, filter, matches = matches.len(), "Single entry search");
        match matches.as_slice() {
            [entry] => Ok(Some(entry.dn.clone())),
            _ => Ok(None),
        }
    }

    async fn search_for_single_attribute_values(
        &self,
        base: &str,
        filter: &str,
        params: &[String],
        attribute: &str,
    ) -> DirectoryResult<Vec<String>> {
        self.attribute_searches.fetch_add(1, Ordering::SeqCst);
        self.check_available(params)?;

        let mut seen = HashSet::new();
        let values: Vec<String> = self
            .matching(base, filter, params)?
            .into_iter()
            .flat_map(|entry| entry.values(attribute).iter().cloned())
            .filter(|value| seen.insert(value.clone()))
            .collect();
        debug!(base, filter, attribute, values = values.len(), "Attribute search");
        Ok(values)
    }

    async fn search_entries(&self, base: &str, filter: &str) -> DirectoryResult<Vec<DirectoryEntry>> {
        self.entry_searches.fetch_add(1, Ordering::SeqCst);
        self.check_available(&[])?;

        let entries: Vec<DirectoryEntry> = self
            .matching(base, filter, &[])?
            .into_iter()
            .cloned()
            .collect();
        debug!(base, filter, entries = entries.len(), "Entry search");
        Ok(entries)
    }
}

/// Whether `dn` lies at or below `base` (both relative to the root).
fn in_scope(dn: &str, base: &str) -> bool {
    let base = base.trim().to_ascii_lowercase();
    if base.is_empty() {
        return true;
    }
    let dn = dn.trim().to_ascii_lowercase();
    dn == base || dn.ends_with(&format!(",{}", base))
}

/// Escape a value for use inside a search filter (RFC 4515).
pub fn escape_filter_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\5c"),
            '*' => escaped.push_str("\\2a"),
            '(' => escaped.push_str("\\28"),
            ')' => escaped.push_str("\\29"),
            '\0' => escaped.push_str("\\00"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn unescape_filter_value(value: &str) -> String {
    let raw = value.as_bytes();
    let mut bytes = Vec::with_capacity(raw.len());
    let mut index = 0;

    while index < raw.len() {
        let hex = (raw[index] == b'\\')
            .then(|| raw.get(index + 1..index + 3))
            .flatten()
            .filter(|pair| pair.iter().all(u8::is_ascii_hexdigit))
            .and_then(|pair| std::str::from_utf8(pair).ok())
            .and_then(|pair| u8::from_str_radix(pair, 16).ok());
        match hex {
            Some(byte) => {
                bytes.push(byte);
                index += 3;
            }
            None => {
                bytes.push(raw[index]);
                index += 1;
            }
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Parsed search filter.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Present(String),
    Equals { attribute: String, value: String },
    Substring { attribute: String, parts: Vec<String> },
}

impl Filter {
    fn parse(input: &str) -> DirectoryResult<Self> {
        let mut parser = FilterParser { input, pos: 0 };
        let filter = parser.parse_filter()?;
        if parser.pos != input.trim_end().len() {
            return Err(parser.error("trailing characters"));
        }
        Ok(filter)
    }

    fn matches(&self, entry: &DirectoryEntry) -> bool {
        match self {
            Filter::And(filters) => filters.iter().all(|f| f.matches(entry)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(entry)),
            Filter::Not(filter) => !filter.matches(entry),
            Filter::Present(attribute) => {
                attribute.eq_ignore_ascii_case("objectclass") || !entry.values(attribute).is_empty()
            }
            Filter::Equals { attribute, value } => entry
                .values(attribute)
                .iter()
                .any(|candidate| candidate.to_lowercase() == value.to_lowercase()),
            Filter::Substring { attribute, parts } => entry
                .values(attribute)
                .iter()
                .any(|candidate| substring_matches(&candidate.to_lowercase(), parts)),
        }
    }
}

/// `parts` are the lower-cased pieces between `*` wildcards.
fn substring_matches(candidate: &str, parts: &[String]) -> bool {
    let Some((first, rest)) = parts.split_first() else {
        return true;
    };
    let Some(mut remainder) = candidate.strip_prefix(first.as_str()) else {
        return false;
    };
    let Some((last, middle)) = rest.split_last() else {
        return remainder.is_empty();
    };

    for part in middle {
        match remainder.find(part.as_str()) {
            Some(index) => remainder = &remainder[index + part.len()..],
            None => return false,
        }
    }
    remainder.len() >= last.len() && remainder.ends_with(last.as_str())
}

struct FilterParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> FilterParser<'a> {
    fn error(&self, message: &str) -> DirectoryError {
        DirectoryError::Protocol(format!(
            "invalid filter {:?} at {}: {}",
            self.input, self.pos, message
        ))
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek().filter(|c| c.is_whitespace()) {
            self.pos += c.len_utf8();
        }
    }

    fn expect(&mut self, expected: char) -> DirectoryResult<()> {
        self.skip_whitespace();
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += c.len_utf8();
                Ok(())
            }
            _ => Err(self.error(&format!("expected '{}'", expected))),
        }
    }

    fn parse_filter(&mut self) -> DirectoryResult<Filter> {
        self.expect('(')?;
        let filter = match self.peek() {
            Some('&') => {
                self.pos += 1;
                Filter::And(self.parse_list()?)
            }
            Some('|') => {
                self.pos += 1;
                Filter::Or(self.parse_list()?)
            }
            Some('!') => {
                self.pos += 1;
                Filter::Not(Box::new(self.parse_filter()?))
            }
            _ => self.parse_item()?,
        };
        self.expect(')')?;
        Ok(filter)
    }

    fn parse_list(&mut self) -> DirectoryResult<Vec<Filter>> {
        let mut filters = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() != Some('(') {
                break;
            }
            filters.push(self.parse_filter()?);
        }
        if filters.is_empty() {
            return Err(self.error("empty filter list"));
        }
        Ok(filters)
    }

    fn parse_item(&mut self) -> DirectoryResult<Filter> {
        let input = self.input;
        let rest = &input[self.pos..];
        let end = rest.find(')').ok_or_else(|| self.error("unterminated item"))?;
        let item = &rest[..end];
        let (attribute, value) = item
            .split_once('=')
            .ok_or_else(|| self.error("missing '='"))?;
        let attribute = attribute.trim();
        if attribute.is_empty() {
            return Err(self.error("missing attribute"));
        }
        self.pos += end;

        let filter = if value == "*" {
            Filter::Present(attribute.to_string())
        } else if value.contains('*') {
            Filter::Substring {
                attribute: attribute.to_string(),
                parts: value
                    .split('*')
                    .map(|part| unescape_filter_value(part).to_lowercase())
                    .collect(),
            }
        } else {
            Filter::Equals {
                attribute: attribute.to_string(),
                value: unescape_filter_value(value),
            }
        };
        Ok(filter)
    }
}
