use nutri_label_advisor::prompts::{render_meal_prompt, render_product_prompt};
use nutri_label_advisor::{NutritionLabel, ProductScan, UserProfile};

fn profile() -> UserProfile {
    UserProfile::from_json_str(
        r#"{"age": "31", "gender": "female", "activity_level": 3, "height": 168, "weight": "64", "target_weight": "60"}"#,
    )
    .unwrap()
}

fn oat_scan() -> ProductScan {
    ProductScan {
        ingredients: vec![
            "zobene pahuljice".to_string(),
            "med".to_string(),
            "sol".to_string(),
        ],
        nutrition_values: [
            (NutritionLabel::Sugar, "22 g".to_string()),
            (NutritionLabel::Energy, "250kcal".to_string()),
            (NutritionLabel::Fats, "10.5 g".to_string()),
        ]
        .into_iter()
        .collect(),
    }
}

#[test]
fn product_prompt_snapshot() {
    let prompt = render_product_prompt(&profile(), &oat_scan()).unwrap();
    insta::assert_snapshot!(prompt);
}

#[test]
fn meal_prompt_lists_every_product() {
    let milk = ProductScan {
        ingredients: vec!["mlijeko".to_string()],
        nutrition_values: [(NutritionLabel::Protein, "3.4 g".to_string())]
            .into_iter()
            .collect(),
    };
    let prompt = render_meal_prompt(&profile(), &[oat_scan(), milk]).unwrap();
    assert!(prompt.starts_with("The user has provided their profile"));
    assert!(prompt.contains(
        "**Meal Nutritional Summary:**\nProduct 1: Energy: 250kcal, Fats: 10.5 g, Sugar: 22 g; Product 2: Protein: 3.4 g\n"
    ));
    assert!(prompt.contains(
        "**Ingredients in the Meal:**\nzobene pahuljice, med, sol, mlijeko\n"
    ));
    assert!(prompt.contains("- Activity level: 3/5"));
}
