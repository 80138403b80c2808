use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tera::{Context as TeraContext, Tera};

use crate::extract::{NutritionRecord, ProductScan};

const PRODUCT_TEMPLATE: &str = "product_advice_prompt.tera";
const MEAL_TEMPLATE: &str = "meal_advice_prompt.tera";
const MISSING: &str = "N/A";

/// Personal data sent along with the label scans. Fields arrive as strings
/// or numbers; absent or blank fields render as `N/A`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, deserialize_with = "display_value")]
    pub age: Option<String>,
    #[serde(default, deserialize_with = "display_value")]
    pub gender: Option<String>,
    /// 0 to 5.
    #[serde(default, deserialize_with = "display_value")]
    pub activity_level: Option<String>,
    /// Centimetres.
    #[serde(default, deserialize_with = "display_value")]
    pub height: Option<String>,
    /// Kilograms.
    #[serde(default, deserialize_with = "display_value")]
    pub weight: Option<String>,
    /// Kilograms.
    #[serde(default, deserialize_with = "display_value")]
    pub target_weight: Option<String>,
}

fn display_value<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Some(other) => Some(other.to_string()),
    })
}

impl UserProfile {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).with_context(|| "failed to parse personal data JSON")
    }

    fn insert_into(&self, context: &mut TeraContext) {
        let field = |value: &Option<String>| value.as_deref().unwrap_or(MISSING).to_string();
        context.insert("age", &field(&self.age));
        context.insert("gender", &field(&self.gender));
        context.insert("activity_level", &field(&self.activity_level));
        context.insert("height", &field(&self.height));
        context.insert("weight", &field(&self.weight));
        context.insert("target_weight", &field(&self.target_weight));
    }
}

pub fn load_profile(path: &Path) -> Result<UserProfile> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read personal data: {}", path.display()))?;
    UserProfile::from_json_str(&raw)
}

/// `Label: value` pairs joined with `, `.
pub fn format_nutrition(record: &NutritionRecord) -> String {
    record
        .iter()
        .map(|(label, value)| format!("{}: {}", label, value))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `Product N: ...` entries joined with `; `, numbered from 1.
pub fn format_meal_nutrition(records: &[NutritionRecord]) -> String {
    records
        .iter()
        .enumerate()
        .map(|(idx, record)| format!("Product {}: {}", idx + 1, format_nutrition(record)))
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn render_product_prompt(profile: &UserProfile, scan: &ProductScan) -> Result<String> {
    let template = load_prompt_template(PRODUCT_TEMPLATE)?;
    let mut context = TeraContext::new();
    profile.insert_into(&mut context);
    context.insert("nutrition", &format_nutrition(&scan.nutrition_values));
    context.insert("ingredients", &scan.ingredients.join(", "));

    let rendered = Tera::one_off(&template, &context, false)
        .with_context(|| "failed to render product advice prompt")?;
    Ok(rendered.trim().to_string())
}

pub fn render_meal_prompt(profile: &UserProfile, scans: &[ProductScan]) -> Result<String> {
    if scans.is_empty() {
        return Err(anyhow!("meal advice needs at least one product"));
    }
    let template = load_prompt_template(MEAL_TEMPLATE)?;
    let mut context = TeraContext::new();
    profile.insert_into(&mut context);
    let records = scans
        .iter()
        .map(|scan| scan.nutrition_values.clone())
        .collect::<Vec<_>>();
    let ingredients = scans
        .iter()
        .flat_map(|scan| scan.ingredients.iter().map(String::as_str))
        .collect::<Vec<_>>();
    context.insert("nutrition_summary", &format_meal_nutrition(&records));
    context.insert("ingredients", &ingredients.join(", "));

    let rendered = Tera::one_off(&template, &context, false)
        .with_context(|| "failed to render meal advice prompt")?;
    Ok(rendered.trim().to_string())
}

fn load_prompt_template(name: &str) -> Result<String> {
    let path = prompt_path(name);
    fs::read_to_string(&path).with_context(|| format!("failed to read prompt: {}", path.display()))
}

fn prompt_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("src")
        .join("prompts")
        .join("templates")
        .join(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::NutritionLabel;

    fn record(pairs: &[(NutritionLabel, &str)]) -> NutritionRecord {
        pairs
            .iter()
            .map(|(label, value)| (*label, value.to_string()))
            .collect()
    }

    #[test]
    fn profile_accepts_strings_and_numbers() {
        let profile = UserProfile::from_json_str(
            r#"{"age": "31", "gender": "female", "activity_level": 3, "height": 170.5, "weight": "", "target_weight": null}"#,
        )
        .unwrap();
        assert_eq!(profile.age.as_deref(), Some("31"));
        assert_eq!(profile.activity_level.as_deref(), Some("3"));
        assert_eq!(profile.height.as_deref(), Some("170.5"));
        assert_eq!(profile.weight, None);
        assert_eq!(profile.target_weight, None);
    }

    #[test]
    fn nutrition_is_listed_in_page_order() {
        let values = record(&[
            (NutritionLabel::Sugar, "5 g"),
            (NutritionLabel::Energy, "250kcal"),
        ]);
        assert_eq!(format_nutrition(&values), "Sugar: 5 g, Energy: 250kcal");
        assert_eq!(format_nutrition(&NutritionRecord::new()), "");
    }

    #[test]
    fn meal_summary_numbers_products() {
        let first = record(&[(NutritionLabel::Fats, "10 g")]);
        let second = record(&[(NutritionLabel::Protein, "7g"), (NutritionLabel::Sodium, "1 g")]);
        assert_eq!(
            format_meal_nutrition(&[first, second]),
            "Product 1: Fats: 10 g; Product 2: Protein: 7g, Sodium: 1 g"
        );
    }

    #[test]
    fn missing_profile_fields_render_as_na() {
        let scan = ProductScan {
            ingredients: vec!["voda".to_string()],
            nutrition_values: record(&[(NutritionLabel::Energy, "40kcal")]),
        };
        let prompt = render_product_prompt(&UserProfile::default(), &scan).unwrap();
        assert!(prompt.contains("- Age: N/A years old"));
        assert!(prompt.contains("- Target Weight: N/A kg"));
        assert!(prompt.contains("Energy: 40kcal"));
        assert!(prompt.contains("voda"));
    }

    #[test]
    fn meal_prompt_concatenates_ingredients() {
        let scans = vec![
            ProductScan {
                ingredients: vec!["zob".to_string(), "med".to_string()],
                nutrition_values: record(&[(NutritionLabel::Carbs, "60 g")]),
            },
            ProductScan {
                ingredients: vec!["mlijeko".to_string()],
                nutrition_values: record(&[(NutritionLabel::Protein, "3.4 g")]),
            },
        ];
        let profile = UserProfile {
            age: Some("40".to_string()),
            ..UserProfile::default()
        };
        let prompt = render_meal_prompt(&profile, &scans).unwrap();
        assert!(prompt.contains("- Age: 40 years old"));
        assert!(prompt.contains("Product 1: Carbs: 60 g; Product 2: Protein: 3.4 g"));
        assert!(prompt.contains("zob, med, mlijeko"));
    }

    #[test]
    fn meal_prompt_needs_products() {
        assert!(render_meal_prompt(&UserProfile::default(), &[]).is_err());
    }
}
