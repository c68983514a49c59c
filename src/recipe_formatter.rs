use crate::ingredient_matcher::RankedRecipe;
use crate::recipe::RecipeRecord;

pub const NO_RECIPE_FOUND: &str =
    "No recipe found for the given ingredients. Please try with different ingredients.";
pub const MAX_REPLY_CHARS: usize = 4000;
pub const TRUNCATION_SUFFIX: &str = "...\n(Response truncated due to length)";

const HEADER: &str = "Here are the recipes you can prepare with your ingredients:\n\n";

fn push_recipe_block(response: &mut String, recipe: &RecipeRecord) {
    let name = if recipe.name.trim().is_empty() {
        "Untitled Recipe"
    } else {
        recipe.name.as_str()
    };
    response.push_str(&format!("🍴 Recipe: {}\n\n", name));
    response.push_str("📝 Ingredients:\n");

    let ingredients_raw = recipe.ingredients_text.as_str();
    if ingredients_raw.contains(',') {
        for ingredient in ingredients_raw.split(',').map(str::trim).filter(|i| !i.is_empty()) {
            response.push_str(&format!("• {}\n", ingredient));
        }
    } else {
        response.push_str(&format!("• {}\n", ingredients_raw.trim()));
    }
}

/// Cuts `text` to `MAX_REPLY_CHARS` characters and marks it as truncated.
fn truncate_reply(text: String) -> String {
    match text.char_indices().nth(MAX_REPLY_CHARS) {
        Some((byte_offset, _)) => {
            let mut truncated = text[..byte_offset].to_string();
            truncated.push_str(TRUNCATION_SUFFIX);
            truncated
        }
        None => text,
    }
}

/// Renders recipes as one text block.
pub fn format_recipe_records<'a, I>(recipes: I) -> String
where
    I: IntoIterator<Item = &'a RecipeRecord>,
{
    let recipes: Vec<&RecipeRecord> = recipes.into_iter().collect();
    if recipes.is_empty() {
        return NO_RECIPE_FOUND.to_string();
    }

    let mut response = String::from(HEADER);
    for (i, recipe) in recipes.iter().enumerate() {
        push_recipe_block(&mut response, recipe);
        response.push('\n');
        if i + 1 < recipes.len() {
            response.push('\n');
        }
    }

    truncate_reply(response)
}

pub fn format_recipes(results: &[RankedRecipe<'_>]) -> String {
    format_recipe_records(results.iter().map(|ranked| ranked.recipe))
}
