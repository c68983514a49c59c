use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RecipeRecord {
    pub name: String,
    pub ingredients_text: String,
    pub cleaned_ingredients_text: String, // May be empty when the dataset row had no cleaned column
    pub instructions: String,
}

impl RecipeRecord {
    /// Stand-in recipe used when the dataset cannot be loaded.
    pub fn placeholder() -> Self {
        Self {
            name: "Example Recipe".to_string(),
            ingredients_text: "ingredient1, ingredient2, ingredient3".to_string(),
            cleaned_ingredients_text: "ingredient1, ingredient2, ingredient3".to_string(),
            instructions: "Step 1. Mix ingredients. Step 2. Cook.".to_string(),
        }
    }

    /// Text the keyword scorer searches: the cleaned list, or the raw list without one.
    pub fn searchable_ingredients(&self) -> String {
        if self.cleaned_ingredients_text.is_empty() {
            self.ingredients_text.to_lowercase()
        } else {
            self.cleaned_ingredients_text.to_lowercase()
        }
    }
}

/// Ordered, read-only recipe table. Never empty.
#[derive(Debug, Clone)]
pub struct RecipeCorpus {
    recipes: Vec<RecipeRecord>,
}

impl RecipeCorpus {
    /// Builds a corpus, substituting the placeholder recipe for an empty list.
    pub fn new(recipes: Vec<RecipeRecord>) -> Self {
        if recipes.is_empty() {
            return Self::placeholder();
        }
        Self { recipes }
    }

    pub fn placeholder() -> Self {
        Self {
            recipes: vec![RecipeRecord::placeholder()],
        }
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RecipeRecord> {
        self.recipes.iter()
    }

    pub fn is_placeholder(&self) -> bool {
        self.recipes.len() == 1 && self.recipes[0] == RecipeRecord::placeholder()
    }
}
