use anyhow::{Result, Context};
use csv::ReaderBuilder;
use std::path::Path;
use tracing::{info, warn};
use crate::recipe::{RecipeCorpus, RecipeRecord};

// Column positions in the recipe dataset. The cleaned ingredient list is always the last column.
const NAME_COL: usize = 0;
const INGREDIENTS_COL: usize = 1;
const INSTRUCTIONS_COL: usize = 2;
const MIN_COLUMNS: usize = 3;

/// Decodes the dataset bytes. Valid UTF-8 is taken as-is; anything else is read as ISO-8859-1.
fn decode_dataset(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => e.into_bytes().into_iter().map(char::from).collect(),
    }
}

pub fn load_recipe_corpus(csv_path: &Path) -> Result<Vec<RecipeRecord>> {
    if !csv_path.exists() {
        return Err(anyhow::anyhow!("Recipe dataset not found at: {:?}", csv_path));
    }

    let bytes = std::fs::read(csv_path)
        .with_context(|| format!("Failed to read recipe dataset at {:?}", csv_path))?;
    let text = decode_dataset(bytes);

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true) // Rows may carry a variable number of columns
        .from_reader(text.as_bytes());

    let mut recipes = Vec::new();
    for (row_index, result) in rdr.records().enumerate() {
        let record = result
            .with_context(|| format!("Failed to read record at row index {}", row_index))?;
        if record.len() < MIN_COLUMNS {
            continue;
        }

        let field = |idx: usize| record.get(idx).unwrap_or_default().to_string();
        let cleaned_ingredients_text = if record.len() > MIN_COLUMNS {
            field(record.len() - 1)
        } else {
            String::new()
        };

        recipes.push(RecipeRecord {
            name: field(NAME_COL),
            ingredients_text: field(INGREDIENTS_COL),
            instructions: field(INSTRUCTIONS_COL),
            cleaned_ingredients_text,
        });
    }

    if recipes.is_empty() {
        return Err(anyhow::anyhow!("No valid recipes loaded from {:?}", csv_path));
    }

    Ok(recipes)
}

/// Loads the dataset, degrading to the one-recipe placeholder corpus on any failure.
pub fn load_corpus_or_placeholder(csv_path: &Path) -> RecipeCorpus {
    match load_recipe_corpus(csv_path) {
        Ok(recipes) => {
            info!("Recipe corpus loaded from {:?}: {} recipes", csv_path, recipes.len());
            RecipeCorpus::new(recipes)
        }
        Err(e) => {
            warn!("Recipe corpus unavailable ({:#}), using placeholder recipe", e);
            RecipeCorpus::placeholder()
        }
    }
}
