use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use tracing::debug;

use crate::page::Page;

use super::NutritionRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NutritionLabel {
    Energy,
    Fats,
    Carbs,
    Protein,
    Fiber,
    Sodium,
    Sugar,
    Saturated,
    Unsaturated,
}

impl NutritionLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NutritionLabel::Energy => "Energy",
            NutritionLabel::Fats => "Fats",
            NutritionLabel::Carbs => "Carbs",
            NutritionLabel::Protein => "Protein",
            NutritionLabel::Fiber => "Fiber",
            NutritionLabel::Sodium => "Sodium",
            NutritionLabel::Sugar => "Sugar",
            NutritionLabel::Saturated => "Saturated",
            NutritionLabel::Unsaturated => "Unsaturated",
        }
    }
}

impl fmt::Display for NutritionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Match priority is the slice order: the first label with a hit wins.
/// Patterns cover Croatian and English label spellings.
const LABEL_TABLE: &[(NutritionLabel, &[&str])] = &[
    (NutritionLabel::Energy, &["Energ"]),
    (NutritionLabel::Fats, &["Mas", "Fa"]),
    (NutritionLabel::Carbs, &["Ugl", "Carboh"]),
    (NutritionLabel::Protein, &["Bjel", "Prot"]),
    (NutritionLabel::Fiber, &["Vla", "Fib"]),
    (NutritionLabel::Sodium, &["So"]),
    (NutritionLabel::Sugar, &["Se", "Su"]),
    (NutritionLabel::Saturated, &["zasic", "satur"]),
    (NutritionLabel::Unsaturated, &["nezas", "unsat"]),
];

static LABEL_PATTERNS: LazyLock<Vec<(NutritionLabel, Vec<Regex>)>> = LazyLock::new(|| {
    LABEL_TABLE
        .iter()
        .map(|(label, patterns)| {
            let compiled = patterns
                .iter()
                .map(|pattern| {
                    RegexBuilder::new(pattern)
                        .case_insensitive(true)
                        .build()
                        .expect("valid label pattern")
                })
                .collect();
            (*label, compiled)
        })
        .collect()
});

// `[g|mg|kcal|kJ]` is a character class: any one of `g | m k c a l J`.
static LOOSE_VALUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+[.,]?\d*\s*[g|mg|kcal|kJ]").expect("valid value pattern")
});

static STRICT_VALUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+(?:[.,]\d+)?\s*(?:mg|g|kcal|kJ)\b").expect("valid value pattern")
});

/// How a word qualifies as a nutrition value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitMatching {
    /// Digits followed by any single unit character (`g m k c a l J |`).
    #[default]
    Loose,
    /// Digits followed by a whole `mg`, `g`, `kcal` or `kJ` token.
    Strict,
}

impl UnitMatching {
    fn value_pattern(&self) -> &'static Regex {
        match self {
            UnitMatching::Loose => &LOOSE_VALUE_RE,
            UnitMatching::Strict => &STRICT_VALUE_RE,
        }
    }
}

pub fn detect_label(normalized: &str) -> Option<NutritionLabel> {
    LABEL_PATTERNS
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|re| re.is_match(normalized)))
        .map(|(label, _)| *label)
}

fn normalize_word(word: &str) -> String {
    word.trim().replace(',', ".")
}

/// Single-pass state machine behind [`extract_nutrition_values`].
#[derive(Debug, Default)]
pub struct NutritionScanner {
    unit_matching: UnitMatching,
    pending_label: Option<NutritionLabel>,
    record: NutritionRecord,
}

impl NutritionScanner {
    pub fn new(unit_matching: UnitMatching) -> Self {
        Self {
            unit_matching,
            pending_label: None,
            record: NutritionRecord::new(),
        }
    }

    pub fn pending_label(&self) -> Option<NutritionLabel> {
        self.pending_label
    }

    pub fn feed(&mut self, word: &str) {
        let normalized = normalize_word(word);

        if let Some(label) = detect_label(&normalized) {
            self.pending_label = Some(label);
        }

        // Runs on the same word that set the label.
        if let Some(label) = self.pending_label
            && self.unit_matching.value_pattern().is_match(&normalized)
        {
            self.record.insert(label, normalized);
            self.pending_label = None;
        }
    }

    pub fn finish(self) -> NutritionRecord {
        self.record
    }
}

pub fn scan_nutrition_values<'a, I>(words: I, unit_matching: UnitMatching) -> NutritionRecord
where
    I: IntoIterator<Item = &'a str>,
{
    let mut scanner = NutritionScanner::new(unit_matching);
    for word in words {
        scanner.feed(word);
    }
    scanner.finish()
}

/// Pairs each detected label with the next word that looks like a value
/// with a unit, using the loose unit matching.
pub fn extract_nutrition_values(page: &Page) -> NutritionRecord {
    extract_nutrition_values_with(page, UnitMatching::default())
}

pub fn extract_nutrition_values_with(page: &Page, unit_matching: UnitMatching) -> NutritionRecord {
    let record = scan_nutrition_values(
        page.words().map(|word| word.value.as_str()),
        unit_matching,
    );
    debug!(
        "extracted {} nutrition values ({:?} unit matching)",
        record.len(),
        unit_matching
    );
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use NutritionLabel::*;

    fn values(record: &NutritionRecord) -> Vec<(NutritionLabel, &str)> {
        record
            .iter()
            .map(|(label, value)| (*label, value.as_str()))
            .collect()
    }

    #[test]
    fn split_value_and_unit_tokens_do_not_match() {
        let page = Page::from_words(["Energija", "250", "kcal", "Masti", "10", "g"]);
        assert!(extract_nutrition_values(&page).is_empty());
    }

    #[test]
    fn combined_value_and_unit_tokens_match() {
        let page = Page::from_words(["Energija", "250kcal", "Masti", "10 g"]);
        let record = extract_nutrition_values(&page);
        assert_eq!(values(&record), vec![(Energy, "250kcal"), (Fats, "10 g")]);
    }

    #[test]
    fn decimal_comma_is_normalized() {
        let record = scan_nutrition_values(["Ugljikohidrati", "12,3 g"], UnitMatching::Loose);
        assert_eq!(values(&record), vec![(Carbs, "12.3 g")]);
    }

    #[test]
    fn label_and_value_in_one_word() {
        let record = scan_nutrition_values(["Bjelančevine7g"], UnitMatching::Loose);
        assert_eq!(values(&record), vec![(Protein, "Bjelančevine7g")]);
    }

    #[test]
    fn value_without_pending_label_is_ignored() {
        let record = scan_nutrition_values(["100 g", "Vlakna", "3 g"], UnitMatching::Loose);
        assert_eq!(values(&record), vec![(Fiber, "3 g")]);
    }

    #[test]
    fn later_label_replaces_pending_one() {
        let record = scan_nutrition_values(["Energija", "Masti", "5 g"], UnitMatching::Loose);
        assert_eq!(values(&record), vec![(Fats, "5 g")]);
    }

    #[test]
    fn pending_label_waits_for_a_value() {
        let mut scanner = NutritionScanner::new(UnitMatching::Loose);
        scanner.feed("Šećeri");
        assert_eq!(scanner.pending_label(), None);
        scanner.feed("Sugars");
        assert_eq!(scanner.pending_label(), Some(Sugar));
        scanner.feed("per");
        assert_eq!(scanner.pending_label(), Some(Sugar));
        scanner.feed("4,1g");
        assert_eq!(scanner.pending_label(), None);
        assert_eq!(values(&scanner.finish()), vec![(Sugar, "4.1g")]);
    }

    #[test]
    fn labels_keep_page_order() {
        let record = scan_nutrition_values(
            ["Sol", "0,5 g", "Energija", "250kcal"],
            UnitMatching::Loose,
        );
        assert_eq!(values(&record), vec![(Sodium, "0.5 g"), (Energy, "250kcal")]);
    }

    #[test]
    fn repeated_label_keeps_its_first_position() {
        let record = scan_nutrition_values(
            ["Masti", "10 g", "Energija", "250kcal", "Masti", "12 g"],
            UnitMatching::Loose,
        );
        assert_eq!(values(&record), vec![(Fats, "12 g"), (Energy, "250kcal")]);
    }

    #[test]
    fn repeated_label_overwrites_value() {
        let record = scan_nutrition_values(
            ["Masti", "10 g", "Masti", "12 g"],
            UnitMatching::Loose,
        );
        assert_eq!(values(&record), vec![(Fats, "12 g")]);
    }

    #[test]
    fn first_label_in_table_order_wins() {
        // "Sol" hits Sodium ("So") before Sugar is considered.
        assert_eq!(detect_label("Sol"), Some(Sodium));
        assert_eq!(detect_label("Šećeri"), None);
        assert_eq!(detect_label("Sugars"), Some(Sugar));
        assert_eq!(detect_label("masne"), Some(Fats));
        assert_eq!(detect_label("saturates"), Some(Saturated));
        // "satur" is checked before "unsat".
        assert_eq!(detect_label("unsaturated"), Some(Saturated));
        assert_eq!(detect_label("nezasicene"), Some(Saturated));
        assert_eq!(detect_label("ENERGY"), Some(Energy));
        assert_eq!(detect_label("250"), None);
    }

    #[test]
    fn loose_units_accept_any_unit_character() {
        let record = scan_nutrition_values(["Energija", "250 a"], UnitMatching::Loose);
        assert_eq!(values(&record), vec![(Energy, "250 a")]);
    }

    #[test]
    fn strict_units_require_a_unit_token() {
        let record = scan_nutrition_values(
            ["Energija", "250 a", "1046 kJ", "Sol", "0,5g"],
            UnitMatching::Strict,
        );
        assert_eq!(values(&record), vec![(Energy, "1046 kJ"), (Sodium, "0.5g")]);
    }

    #[test]
    fn english_label_table() {
        let page = Page::from_lines([
            vec!["Energy", "1046kJ"],
            vec!["Fat", "3.2g"],
            vec!["Carbohydrate", "48 g"],
            vec!["Protein", "9g"],
            vec!["Fibre", "2g"],
        ]);
        let record = extract_nutrition_values(&page);
        assert_eq!(
            values(&record),
            vec![
                (Energy, "1046kJ"),
                (Fats, "3.2g"),
                (Carbs, "48 g"),
                (Protein, "9g"),
                (Fiber, "2g"),
            ]
        );
    }

    #[test]
    fn empty_page_gives_empty_record() {
        assert!(extract_nutrition_values(&Page::default()).is_empty());
    }

    #[test]
    fn extraction_is_repeatable() {
        let page = Page::from_words(["Energija", "250kcal"]);
        assert_eq!(
            extract_nutrition_values(&page),
            extract_nutrition_values(&page)
        );
    }
}
