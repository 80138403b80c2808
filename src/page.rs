//! OCR page model as exported by the recognition collaborator.
//!
//! A page is `blocks -> lines -> words`; only `value` on each word is read
//! by the extractors. Geometry and confidence ride along untouched.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Relative polygon points (`[x, y]` in 0..1) as emitted by the OCR model.
pub type Geometry = Vec<[f64; 2]>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub lines: Vec<Line>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub geometry: Geometry,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub words: Vec<Word>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub geometry: Geometry,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub geometry: Geometry,
}

impl Word {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }
}

impl Page {
    /// Words in reading order: block-major, then line, then word.
    pub fn words(&self) -> impl Iterator<Item = &Word> + '_ {
        self.blocks
            .iter()
            .flat_map(|block| block.lines.iter())
            .flat_map(|line| line.words.iter())
    }

    pub fn word_count(&self) -> usize {
        self.words().count()
    }

    /// One block with one line per entry of `lines`.
    pub fn from_lines<L, W>(lines: L) -> Self
    where
        L: IntoIterator<Item = W>,
        W: IntoIterator,
        W::Item: Into<String>,
    {
        let lines = lines
            .into_iter()
            .map(|words| Line {
                words: words.into_iter().map(Word::new).collect(),
                geometry: Geometry::new(),
            })
            .collect();
        Self {
            blocks: vec![Block {
                lines,
                geometry: Geometry::new(),
            }],
        }
    }

    pub fn from_words<W>(words: W) -> Self
    where
        W: IntoIterator,
        W::Item: Into<String>,
    {
        Self::from_lines([words])
    }

    /// Accepts either a page export or a document export; a document
    /// contributes its first page.
    pub fn from_json_value(value: Value) -> Result<Self> {
        let page = match value {
            Value::Object(mut map) if !map.contains_key("blocks") && map.contains_key("pages") => {
                let pages = map.remove("pages").unwrap_or(Value::Null);
                match pages {
                    Value::Array(pages) => pages
                        .into_iter()
                        .next()
                        .ok_or_else(|| anyhow!("OCR document contains no pages"))?,
                    _ => return Err(anyhow!("OCR document 'pages' is not an array")),
                }
            }
            other => other,
        };
        serde_json::from_value(page).with_context(|| "failed to decode OCR page structure")
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(raw).with_context(|| "failed to parse OCR export JSON")?;
        Self::from_json_value(value)
    }
}

pub fn load_page(path: &Path) -> Result<Page> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read OCR export: {}", path.display()))?;
    Page::from_json_str(&raw).with_context(|| format!("invalid OCR export: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_follow_block_line_word_order() {
        let page = Page {
            blocks: vec![
                Block {
                    lines: vec![
                        Line {
                            words: vec![Word::new("a"), Word::new("b")],
                            geometry: Geometry::new(),
                        },
                        Line {
                            words: vec![Word::new("c")],
                            geometry: Geometry::new(),
                        },
                    ],
                    geometry: Geometry::new(),
                },
                Block {
                    lines: vec![Line {
                        words: vec![Word::new("d")],
                        geometry: Geometry::new(),
                    }],
                    geometry: Geometry::new(),
                },
            ],
        };
        let order = page.words().map(|w| w.value.as_str()).collect::<Vec<_>>();
        assert_eq!(order, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn decodes_page_export_with_metadata() {
        let raw = r#"{
            "page_idx": 0,
            "dimensions": [1024, 768],
            "blocks": [{
                "geometry": [[0.1, 0.1], [0.9, 0.2]],
                "lines": [{
                    "geometry": [[0.1, 0.1], [0.9, 0.2]],
                    "words": [
                        {"value": "Sastojci:", "confidence": 0.98, "geometry": [[0.1, 0.1], [0.3, 0.2]]}
                    ]
                }],
                "artefacts": []
            }]
        }"#;
        let page = Page::from_json_str(raw).unwrap();
        let word = page.words().next().unwrap();
        assert_eq!(word.value, "Sastojci:");
        assert_eq!(word.confidence, Some(0.98));
        assert_eq!(word.geometry.len(), 2);
    }

    #[test]
    fn document_export_uses_first_page() {
        let raw = r#"{"pages": [
            {"blocks": [{"lines": [{"words": [{"value": "first"}]}]}]},
            {"blocks": [{"lines": [{"words": [{"value": "second"}]}]}]}
        ]}"#;
        let page = Page::from_json_str(raw).unwrap();
        assert_eq!(page.word_count(), 1);
        assert_eq!(page.words().next().unwrap().value, "first");
    }

    #[test]
    fn empty_document_is_an_error() {
        assert!(Page::from_json_str(r#"{"pages": []}"#).is_err());
    }

    #[test]
    fn block_without_lines_is_a_contract_violation() {
        let raw = r#"{"blocks": [{"geometry": []}]}"#;
        assert!(Page::from_json_str(raw).is_err());
    }
}
