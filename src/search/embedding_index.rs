use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;
use tracing::{debug, info};

use crate::recipe::RecipeCorpus;
use crate::search::similarity::mean_pool;

/// Minimum number of tokenized ingredient phrases needed to build the index.
pub const MIN_TRAINING_PHRASES: usize = 10;

/// Turns words into dense vectors. Implemented by the model-backed engine and by test doubles.
pub trait WordEncoder {
    fn encode_words(&self, words: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

#[derive(Error, Debug)]
pub enum IndexError {
    #[error(
        "only {found} ingredient phrases in corpus, need at least {min}",
        min = MIN_TRAINING_PHRASES
    )]
    TooFewPhrases { found: usize },

    #[error("word encoder failed: {0:#}")]
    Encoder(#[from] anyhow::Error),

    #[error("inconsistent embedding dimensions: expected {expected}, got {got} for '{word}'")]
    Dimension {
        expected: usize,
        got: usize,
        word: String,
    },
}

/// Lowercases and splits on anything that is not a letter or digit.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(String::from)
        .collect()
}

/// Tokenized ingredient phrases of the corpus: every comma-separated entry of every cleaned list.
pub fn ingredient_phrases(corpus: &RecipeCorpus) -> Vec<Vec<String>> {
    corpus
        .iter()
        .flat_map(|recipe| {
            recipe
                .cleaned_ingredients_text
                .to_lowercase()
                .split(',')
                .map(|phrase| tokenize(phrase.trim()))
                .filter(|tokens| !tokens.is_empty())
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Word-vector table over the corpus vocabulary, plus one pooled vector per recipe.
pub struct EmbeddingIndex {
    word_vectors: HashMap<String, Vec<f32>>,
    recipe_vectors: Vec<Option<Vec<f32>>>, // Indexed like the corpus; None when no token is known
    dimension: usize,
}

impl EmbeddingIndex {
    pub fn build(corpus: &RecipeCorpus, encoder: &dyn WordEncoder) -> Result<Self, IndexError> {
        let phrases = ingredient_phrases(corpus);
        if phrases.len() < MIN_TRAINING_PHRASES {
            return Err(IndexError::TooFewPhrases { found: phrases.len() });
        }

        // Sorted vocabulary keeps encoder batches deterministic.
        let vocabulary: Vec<String> = phrases
            .into_iter()
            .flatten()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        debug!("Encoding {} vocabulary words", vocabulary.len());

        let embeddings = encoder.encode_words(&vocabulary)?;
        if embeddings.len() != vocabulary.len() {
            return Err(IndexError::Encoder(anyhow::anyhow!(
                "Encoder returned {} vectors for {} words",
                embeddings.len(),
                vocabulary.len()
            )));
        }

        let dimension = embeddings.first().map(Vec::len).unwrap_or(0);
        let mut word_vectors = HashMap::with_capacity(vocabulary.len());
        for (word, vector) in vocabulary.into_iter().zip(embeddings) {
            if vector.len() != dimension || dimension == 0 {
                return Err(IndexError::Dimension {
                    expected: dimension,
                    got: vector.len(),
                    word,
                });
            }
            word_vectors.insert(word, vector);
        }

        let mut index = Self {
            word_vectors,
            recipe_vectors: Vec::new(),
            dimension,
        };

        let recipes: Vec<_> = corpus.iter().collect();
        let recipe_vectors: Vec<Option<Vec<f32>>> = recipes
            .par_iter()
            .map(|recipe| {
                if recipe.cleaned_ingredients_text.is_empty() {
                    return None;
                }
                index.embed(&tokenize(&recipe.cleaned_ingredients_text))
            })
            .collect();
        index.recipe_vectors = recipe_vectors;

        info!(
            "Embedding index built: {} words, dimension {}, {} of {} recipes embedded",
            index.vocabulary_size(),
            index.dimension,
            index.recipe_vectors.iter().filter(|v| v.is_some()).count(),
            corpus.len()
        );
        Ok(index)
    }

    /// Mean vector over the in-vocabulary tokens, `None` when no token is known.
    pub fn embed(&self, tokens: &[String]) -> Option<Vec<f32>> {
        mean_pool(
            tokens
                .iter()
                .filter_map(|token| self.word_vectors.get(token))
                .map(Vec::as_slice),
        )
    }

    /// Precomputed vector of the recipe at `index` in the corpus the index was built from.
    pub fn recipe_vector(&self, index: usize) -> Option<&[f32]> {
        self.recipe_vectors.get(index)?.as_deref()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.word_vectors.contains_key(word)
    }

    pub fn vocabulary_size(&self) -> usize {
        self.word_vectors.len()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}
