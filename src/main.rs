use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "nutri-label-advisor",
    version,
    about = "Extract ingredients and nutrition values from OCR'd food labels and ask an LLM for dietary advice"
)]
struct Cli {
    /// OCR JSON export of an ingredients label (repeat once per product)
    #[arg(short = 'i', long = "ingredients", required = true)]
    ingredients: Vec<String>,

    /// OCR JSON export of a nutrition table (repeat once per product, same order)
    #[arg(short = 'n', long = "nutrition", required = true)]
    nutrition: Vec<String>,

    /// Personal data JSON (age, gender, activity_level, height, weight, target_weight)
    #[arg(short = 'p', long = "profile")]
    profile: Option<String>,

    /// Ask for meal advice even when only one product is given
    #[arg(long = "meal")]
    meal: bool,

    /// Print extracted ingredients and nutrition values as JSON and exit
    #[arg(long = "extract-only")]
    extract_only: bool,

    /// Print the prompt instead of sending it to the model
    #[arg(long = "show-prompt")]
    show_prompt: bool,

    /// Directory for ingredients.json / nutrition_values.json (overrides settings [output] dir)
    #[arg(short = 'o', long = "out-dir")]
    out_dir: Option<String>,

    /// Do not write extraction results to disk
    #[arg(long = "no-save")]
    no_save: bool,

    /// OpenAI model id (overrides settings [llm] model)
    #[arg(short = 'm', long = "model")]
    model: Option<String>,

    /// API key (overrides OPENAI_API_KEY)
    #[arg(short = 'k', long = "key")]
    key: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Append token usage to output
    #[arg(long = "with-using-tokens")]
    with_using_tokens: bool,

    /// Append model name to output
    #[arg(long = "with-using-model")]
    with_using_model: bool,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    nutri_label_advisor::logging::init(cli.verbose)?;

    let output = nutri_label_advisor::run(nutri_label_advisor::Config {
        ingredients_pages: cli.ingredients,
        nutrition_pages: cli.nutrition,
        profile_path: cli.profile,
        meal: cli.meal,
        extract_only: cli.extract_only,
        show_prompt: cli.show_prompt,
        out_dir: cli.out_dir,
        no_save: cli.no_save,
        model: cli.model,
        key: cli.key,
        settings_path: cli.read_settings,
        with_using_tokens: cli.with_using_tokens,
        with_using_model: cli.with_using_model,
    })
    .await?;

    println!("{}", output);
    Ok(())
}
