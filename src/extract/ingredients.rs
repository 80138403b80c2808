use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::page::Page;

use super::IngredientList;

// Croatian "sastojci"; only the first letter varies in OCR output.
static MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[Ss]astoj").expect("valid marker pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Searching,
    Collecting,
    Finished,
}

/// Single-pass state machine behind [`extract_ingredients`].
#[derive(Debug)]
pub struct IngredientScanner {
    section: Section,
    accumulator: String,
    entries: IngredientList,
}

impl Default for IngredientScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl IngredientScanner {
    pub fn new() -> Self {
        Self {
            section: Section::Searching,
            accumulator: String::new(),
            entries: Vec::new(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.section == Section::Finished
    }

    pub fn feed(&mut self, word: &str) {
        if self.section == Section::Finished {
            return;
        }
        if MARKER_RE.is_match(word) {
            self.section = Section::Collecting;
            return;
        }
        if self.section != Section::Collecting {
            return;
        }

        if let Some(period) = word.find('.') {
            self.push_fragment(&word[..period]);
            self.flush();
            self.section = Section::Finished;
            return;
        }

        self.push_fragment(word);
        if word.ends_with(',') {
            self.flush();
        }
    }

    /// Entries flushed so far; an unterminated trailing fragment is dropped.
    pub fn finish(self) -> IngredientList {
        self.entries
    }

    fn push_fragment(&mut self, fragment: &str) {
        self.accumulator.push(' ');
        self.accumulator.push_str(fragment);
    }

    fn flush(&mut self) {
        let trimmed = self.accumulator.trim();
        let entry = trimmed.strip_suffix(',').unwrap_or(trimmed).trim_end();
        if !entry.is_empty() {
            self.entries.push(entry.to_string());
        }
        self.accumulator.clear();
    }
}

pub fn scan_ingredients<'a, I>(words: I) -> IngredientList
where
    I: IntoIterator<Item = &'a str>,
{
    let mut scanner = IngredientScanner::new();
    for word in words {
        scanner.feed(word);
        if scanner.is_finished() {
            break;
        }
    }
    scanner.finish()
}

/// Reconstructs the ingredient list that follows the "Sastojci" marker.
///
/// Entries are delimited by a trailing comma on a word; the first word
/// containing a period closes the list and ends the scan for the page.
pub fn extract_ingredients(page: &Page) -> IngredientList {
    let entries = scan_ingredients(page.words().map(|word| word.value.as_str()));
    debug!("extracted {} ingredient entries", entries.len());
    entries
}
