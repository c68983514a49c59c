use std::cmp::Ordering;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::recipe::{RecipeCorpus, RecipeRecord};
use crate::search::embedding_index::{tokenize, EmbeddingIndex, IndexError, WordEncoder};
use crate::search::similarity::cosine_similarity;

/// Common foods and spices. A query must mention one of these to be considered food at all.
pub const KEY_INGREDIENTS: [&str; 28] = [
    "chicken", "paneer", "mutton", "lamb", "fish", "prawn", "shrimp", "potato", "aloo", "gobi",
    "cauliflower", "palak", "spinach", "chana", "chickpea", "rajma", "bean", "mushroom", "rice",
    "dal", "lentil", "tomato", "onion", "garlic", "ginger", "curry", "masala", "spice",
];

pub const MAX_RESULTS: usize = 2;
pub const MIN_TOKEN_LEN: usize = 3;

// Embedding path: added to the cosine score per primary token found in the recipe.
const PRIMARY_SIMILARITY_BONUS: f32 = 0.3;

// Keyword path weights.
const PRIMARY_MATCH_SCORE: f32 = 10.0;
const FULL_MATCH_SCORE: f32 = 5.0;
const PARTIAL_MATCH_SCORE: f32 = 2.0;

/// True when `text` contains one of the key ingredients.
pub fn mentions_key_ingredient(text: &str) -> bool {
    KEY_INGREDIENTS.iter().any(|key| text.contains(key))
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    #[error("no ingredient of at least 3 characters in query")]
    NoUsableTokens,

    #[error("query does not mention any known food")]
    NotFood,
}

/// Normalized ingredient query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchQuery {
    /// Lowercased, trimmed comma segments of at least `MIN_TOKEN_LEN` characters.
    pub ingredients: Vec<String>,
    /// The subset of `ingredients` that mention a key ingredient.
    pub primary: Vec<String>,
}

impl MatchQuery {
    pub fn parse(raw_text: &str) -> Result<Self, MatchError> {
        let ingredients: Vec<String> = raw_text
            .to_lowercase()
            .split(',')
            .map(str::trim)
            .filter(|segment| segment.chars().count() >= MIN_TOKEN_LEN)
            .map(String::from)
            .collect();
        if ingredients.is_empty() {
            return Err(MatchError::NoUsableTokens);
        }

        let primary: Vec<String> = ingredients
            .iter()
            .filter(|ingredient| mentions_key_ingredient(ingredient))
            .cloned()
            .collect();
        if primary.is_empty() {
            return Err(MatchError::NotFood);
        }

        Ok(Self { ingredients, primary })
    }

    /// Word tokens of all ingredients, for embedding lookups.
    pub fn word_tokens(&self) -> Vec<String> {
        self.ingredients.iter().flat_map(|ingredient| tokenize(ingredient)).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedRecipe<'a> {
    pub index: usize, // Position in the corpus
    pub recipe: &'a RecipeRecord,
    pub score: f32,
}

/// Descending by score. `sort_by` is stable, so ties keep corpus order.
fn sort_and_truncate(scored: &mut Vec<RankedRecipe<'_>>) {
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    scored.truncate(MAX_RESULTS);
}

/// Maps an ingredient query to the most relevant recipes of a corpus.
pub trait RecipeMatcher: Send + Sync {
    fn name(&self) -> &'static str;

    fn corpus(&self) -> &RecipeCorpus;

    /// Up to `MAX_RESULTS` recipes for an already validated query, best first.
    fn rank(&self, query: &MatchQuery) -> Vec<RankedRecipe<'_>>;

    fn find_matches(&self, raw_text: &str) -> Result<Vec<RankedRecipe<'_>>, MatchError> {
        let query = MatchQuery::parse(raw_text)?;
        let results = self.rank(&query);
        debug!(
            "{} matcher: {:?} -> {:?}",
            self.name(),
            query.ingredients,
            results.iter().map(|r| (r.recipe.name.as_str(), r.score)).collect::<Vec<_>>()
        );
        Ok(results)
    }
}

/// Keyword and substring scoring over the raw ingredient text.
pub struct HeuristicMatcher {
    corpus: Arc<RecipeCorpus>,
}

impl HeuristicMatcher {
    pub fn new(corpus: Arc<RecipeCorpus>) -> Self {
        Self { corpus }
    }

    fn score_recipe(recipe: &RecipeRecord, query: &MatchQuery) -> f32 {
        let recipe_ingredients = recipe.searchable_ingredients();
        let mut score = 0.0;

        for primary in &query.primary {
            if recipe_ingredients.contains(primary.as_str()) {
                score += PRIMARY_MATCH_SCORE;
            }
        }

        for ingredient in &query.ingredients {
            if recipe_ingredients.contains(ingredient.as_str()) {
                score += FULL_MATCH_SCORE;
            } else if ingredient
                .split_whitespace()
                .filter(|part| part.chars().count() > 2)
                .any(|part| recipe_ingredients.contains(part))
            {
                score += PARTIAL_MATCH_SCORE;
            }
        }

        score
    }
}

impl RecipeMatcher for HeuristicMatcher {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn corpus(&self) -> &RecipeCorpus {
        &self.corpus
    }

    fn rank(&self, query: &MatchQuery) -> Vec<RankedRecipe<'_>> {
        let mut scored: Vec<RankedRecipe<'_>> = self
            .corpus
            .iter()
            .enumerate()
            .map(|(index, recipe)| RankedRecipe {
                index,
                recipe,
                score: Self::score_recipe(recipe, query),
            })
            .filter(|ranked| ranked.score > 0.0)
            .collect();
        sort_and_truncate(&mut scored);
        scored
    }
}

/// Cosine similarity over mean-pooled word vectors, falling back to keyword scoring.
pub struct EmbeddingMatcher {
    index: EmbeddingIndex,
    fallback: HeuristicMatcher,
}

impl EmbeddingMatcher {
    pub fn new(corpus: Arc<RecipeCorpus>, encoder: &dyn WordEncoder) -> Result<Self, IndexError> {
        let index = EmbeddingIndex::build(&corpus, encoder)?;
        Ok(Self {
            index,
            fallback: HeuristicMatcher::new(corpus),
        })
    }

    pub fn index(&self) -> &EmbeddingIndex {
        &self.index
    }
}

impl RecipeMatcher for EmbeddingMatcher {
    fn name(&self) -> &'static str {
        "embedding"
    }

    fn corpus(&self) -> &RecipeCorpus {
        self.fallback.corpus()
    }

    fn rank(&self, query: &MatchQuery) -> Vec<RankedRecipe<'_>> {
        let query_vector = match self.index.embed(&query.word_tokens()) {
            Some(vector) => vector,
            None => {
                debug!("No known words in {:?}, using keyword scoring", query.ingredients);
                return self.fallback.rank(query);
            }
        };

        let mut scored: Vec<RankedRecipe<'_>> = self
            .corpus()
            .iter()
            .enumerate()
            .filter_map(|(index, recipe)| {
                let recipe_vector = self.index.recipe_vector(index)?;
                let cleaned = recipe.cleaned_ingredients_text.to_lowercase();
                let bonus = query
                    .primary
                    .iter()
                    .filter(|primary| cleaned.contains(primary.as_str()))
                    .count() as f32
                    * PRIMARY_SIMILARITY_BONUS;
                Some(RankedRecipe {
                    index,
                    recipe,
                    score: cosine_similarity(&query_vector, recipe_vector) + bonus,
                })
            })
            .collect();
        sort_and_truncate(&mut scored);

        if scored.is_empty() {
            return self.fallback.rank(query);
        }
        scored
    }
}

/// Builds the embedding matcher when an encoder is given and the index builds,
/// the keyword matcher otherwise.
pub fn select_matcher(
    corpus: Arc<RecipeCorpus>,
    encoder: Option<&dyn WordEncoder>,
) -> Arc<dyn RecipeMatcher> {
    let Some(encoder) = encoder else {
        info!("Embeddings disabled, using keyword matcher");
        return Arc::new(HeuristicMatcher::new(corpus));
    };

    match EmbeddingMatcher::new(Arc::clone(&corpus), encoder) {
        Ok(matcher) => {
            info!(
                "Using embedding matcher ({} words indexed)",
                matcher.index().vocabulary_size()
            );
            Arc::new(matcher)
        }
        Err(e) => {
            warn!("Embedding index unavailable ({}), using keyword matcher", e);
            Arc::new(HeuristicMatcher::new(corpus))
        }
    }
}
