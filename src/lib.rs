use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub mod advisor;
pub mod extract;
pub mod logging;
pub mod page;
pub mod prompts;
mod providers;
pub mod settings;
#[cfg(test)]
mod test_util;

pub use advisor::{AdviceOutput, Advisor};
pub use extract::{
    extract_ingredients, extract_nutrition_values, IngredientList, NutritionLabel,
    NutritionRecord, ProductScan, UnitMatching,
};
pub use page::Page;
pub use prompts::UserProfile;
pub use providers::{
    Message, MessageRole, OpenAI, Provider, ProviderFuture, ProviderResponse, ProviderUsage,
};

#[derive(Debug, Clone, Default)]
pub struct Config {
    /// OCR exports of ingredient labels, one per product.
    pub ingredients_pages: Vec<String>,
    /// OCR exports of nutrition tables, paired by position with the above.
    pub nutrition_pages: Vec<String>,
    pub profile_path: Option<String>,
    pub meal: bool,
    pub extract_only: bool,
    pub show_prompt: bool,
    pub out_dir: Option<String>,
    pub no_save: bool,
    pub model: Option<String>,
    pub key: Option<String>,
    pub settings_path: Option<String>,
    pub with_using_tokens: bool,
    pub with_using_model: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdviceMode {
    Product,
    Meal,
}

impl AdviceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdviceMode::Product => "product",
            AdviceMode::Meal => "meal",
        }
    }
}

pub async fn run(config: Config) -> Result<String> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;

    let profile = if config.extract_only {
        None
    } else {
        let profile_path = config
            .profile_path
            .as_deref()
            .ok_or_else(|| anyhow!("no personal data received (pass --profile)"))?;
        Some(prompts::load_profile(Path::new(profile_path))?)
    };

    let scans = scan_products(&config, settings.unit_matching)?;
    let mode = if config.meal || scans.len() > 1 {
        AdviceMode::Meal
    } else {
        AdviceMode::Product
    };

    if !config.no_save {
        let base = config
            .out_dir
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| settings.output_dir.clone());
        persist_scans(&scans, mode, &base.join(mode.as_str()))?;
    }

    let Some(profile) = profile else {
        return extraction_output(&scans, mode);
    };

    if config.show_prompt {
        return match mode {
            AdviceMode::Product => prompts::render_product_prompt(&profile, &scans[0]),
            AdviceMode::Meal => prompts::render_meal_prompt(&profile, &scans),
        };
    }

    let key = providers::resolve_key(config.key.as_deref())?;
    let model = config
        .model
        .clone()
        .filter(|model| !model.trim().is_empty())
        .unwrap_or_else(|| settings.model.clone());
    let provider = OpenAI::new(key)
        .with_model(model)
        .with_max_tokens(settings.max_tokens)
        .with_temperature(settings.temperature);
    let advisor = Advisor::new(provider, settings);

    info!("requesting {} advice for {} product(s)", mode.as_str(), scans.len());
    let output = match mode {
        AdviceMode::Product => advisor.product_advice(&profile, &scans[0]).await?,
        AdviceMode::Meal => advisor.meal_advice(&profile, &scans).await?,
    };

    Ok(format_advice_output(
        &output,
        config.with_using_model,
        config.with_using_tokens,
    ))
}

/// Loads each ingredients/nutrition page pair and runs both extractors.
/// Pairing is checked before any file is read.
pub fn scan_products(config: &Config, unit_matching: UnitMatching) -> Result<Vec<ProductScan>> {
    let ingredients_pages = &config.ingredients_pages;
    let nutrition_pages = &config.nutrition_pages;
    if ingredients_pages.is_empty() && nutrition_pages.is_empty() {
        return Err(anyhow!(
            "at least one ingredients page and one nutrition page are required"
        ));
    }
    if ingredients_pages.len() != nutrition_pages.len() {
        let paired = ingredients_pages.len().min(nutrition_pages.len());
        return Err(anyhow!("pages for product {} are missing", paired + 1));
    }

    let mut scans = Vec::with_capacity(ingredients_pages.len());
    for (index, (ingredients_path, nutrition_path)) in
        ingredients_pages.iter().zip(nutrition_pages).enumerate()
    {
        let ingredients_page = page::load_page(Path::new(ingredients_path))?;
        let nutrition_page = page::load_page(Path::new(nutrition_path))?;
        debug!(
            "product {}: {} ingredient words, {} nutrition words",
            index + 1,
            ingredients_page.word_count(),
            nutrition_page.word_count()
        );
        scans.push(ProductScan::from_pages(
            &ingredients_page,
            &nutrition_page,
            unit_matching,
        ));
    }
    Ok(scans)
}

/// Writes `ingredients.json` and `nutrition_values.json` into `dir`.
pub fn persist_scans(scans: &[ProductScan], mode: AdviceMode, dir: &Path) -> Result<()> {
    let ingredients_path = dir.join(extract::INGREDIENTS_FILE);
    let nutrition_path = dir.join(extract::NUTRITION_FILE);
    match mode {
        AdviceMode::Product => {
            let scan = scans
                .first()
                .ok_or_else(|| anyhow!("no product scans to save"))?;
            extract::save_json(
                &extract::IngredientsDocument {
                    ingredients: scan.ingredients.clone(),
                },
                &ingredients_path,
            )?;
            extract::save_json(
                &extract::NutritionDocument {
                    nutrition_values: scan.nutrition_values.clone(),
                },
                &nutrition_path,
            )?;
        }
        AdviceMode::Meal => {
            let (ingredients, nutrition) = extract::meal_documents(scans);
            extract::save_json(&ingredients, &ingredients_path)?;
            extract::save_json(&nutrition, &nutrition_path)?;
        }
    }
    debug!("saved extraction results to {}", dir.display());
    Ok(())
}

fn extraction_output(scans: &[ProductScan], mode: AdviceMode) -> Result<String> {
    match mode {
        AdviceMode::Product => {
            let scan = scans
                .first()
                .ok_or_else(|| anyhow!("no product scans to print"))?;
            extract::to_json_string(scan)
        }
        AdviceMode::Meal => {
            let (ingredients, nutrition) = extract::meal_documents(scans);
            let combined = serde_json::json!({
                "ingredients": ingredients.ingredients,
                "nutrition_values": nutrition.nutrition_values,
            });
            extract::to_json_string(&combined).with_context(|| "failed to format meal extraction")
        }
    }
}

fn format_advice_output(
    output: &AdviceOutput,
    with_using_model: bool,
    with_using_tokens: bool,
) -> String {
    let mut text = output.text.clone();
    let mut meta_lines = Vec::new();

    if with_using_model {
        let model = output.model.as_deref().unwrap_or("unavailable");
        meta_lines.push(format!("model: {}", model));
    }

    if with_using_tokens {
        meta_lines.push(format_usage(output.usage.as_ref()));
    }

    if !meta_lines.is_empty() {
        text.push('\n');
        text.push_str(&meta_lines.join("\n"));
    }

    text
}

fn format_usage(usage: Option<&ProviderUsage>) -> String {
    let Some(usage) = usage else {
        return "tokens: unavailable".to_string();
    };
    let total = usage.total_tokens.or_else(|| {
        usage
            .prompt_tokens
            .zip(usage.completion_tokens)
            .map(|(prompt, completion)| prompt + completion)
    });

    let mut parts = Vec::new();
    if let Some(prompt) = usage.prompt_tokens {
        parts.push(format!("prompt={}", prompt));
    }
    if let Some(completion) = usage.completion_tokens {
        parts.push(format!("completion={}", completion));
    }
    if let Some(total) = total {
        parts.push(format!("total={}", total));
    }

    if parts.is_empty() {
        "tokens: unavailable".to_string()
    } else {
        format!("tokens: {}", parts.join(", "))
    }
}
