use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::page::Page;

mod ingredients;
mod nutrition;

pub use ingredients::{extract_ingredients, scan_ingredients, IngredientScanner};
pub use nutrition::{
    detect_label, extract_nutrition_values, extract_nutrition_values_with, scan_nutrition_values,
    NutritionLabel, NutritionScanner, UnitMatching,
};

pub const INGREDIENTS_FILE: &str = "ingredients.json";
pub const NUTRITION_FILE: &str = "nutrition_values.json";

pub type IngredientList = Vec<String>;

/// Keys iterate in the order labels were found on the page. A repeated
/// label keeps its first position and takes the newer value.
pub type NutritionRecord = IndexMap<NutritionLabel, String>;

/// Both extractions for one product: an ingredients page and a nutrition page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductScan {
    pub ingredients: IngredientList,
    pub nutrition_values: NutritionRecord,
}

impl ProductScan {
    pub fn from_pages(
        ingredients_page: &Page,
        nutrition_page: &Page,
        unit_matching: UnitMatching,
    ) -> Self {
        Self {
            ingredients: extract_ingredients(ingredients_page),
            nutrition_values: extract_nutrition_values_with(nutrition_page, unit_matching),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngredientsDocument {
    pub ingredients: IngredientList,
}

/// `T` is a single record for a product or a list of records for a meal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionDocument<T> {
    pub nutrition_values: T,
}

pub type ProductNutritionDocument = NutritionDocument<NutritionRecord>;
pub type MealNutritionDocument = NutritionDocument<Vec<NutritionRecord>>;

/// Ingredients of every scan concatenated, plus one nutrition record per scan.
pub fn meal_documents(scans: &[ProductScan]) -> (IngredientsDocument, MealNutritionDocument) {
    let ingredients = scans
        .iter()
        .flat_map(|scan| scan.ingredients.iter().cloned())
        .collect();
    let nutrition_values = scans
        .iter()
        .map(|scan| scan.nutrition_values.clone())
        .collect();
    (
        IngredientsDocument { ingredients },
        NutritionDocument { nutrition_values },
    )
}

pub fn to_json_string<T: Serialize>(value: &T) -> Result<String> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value
        .serialize(&mut serializer)
        .with_context(|| "failed to serialize JSON")?;
    String::from_utf8(buffer).with_context(|| "serialized JSON is not UTF-8")
}

pub fn save_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    let content = to_json_string(value)?;
    fs::write(path, content).with_context(|| format!("failed to write: {}", path.display()))
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read: {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse: {}", path.display()))
}
