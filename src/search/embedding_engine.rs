use anyhow::{Context, Result};
use model2vec_rs::model::StaticModel;
use tracing::info;

use crate::search::embedding_index::WordEncoder;

pub const DEFAULT_EMBEDDING_MODEL_ID: &str = "minishlab/potion-base-8M";

/// Static word-embedding model fetched from the Hugging Face hub.
pub struct EmbeddingEngine {
    model: StaticModel,
    model_id: String,
}

impl EmbeddingEngine {
    pub fn new(model_id: &str) -> Result<Self> {
        info!("Loading embedding model '{}'", model_id);
        // No hf token, default normalization, no subfolder.
        let model = StaticModel::from_pretrained(model_id, None, None, None)
            .with_context(|| format!("Failed to load embedding model '{}'", model_id))?;
        Ok(Self {
            model,
            model_id: model_id.to_string(),
        })
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn embed(&self, texts: &[String]) -> Vec<Vec<f32>> {
        self.model.encode(texts)
    }
}

impl WordEncoder for EmbeddingEngine {
    fn encode_words(&self, words: &[String]) -> Result<Vec<Vec<f32>>> {
        let embeddings = self.embed(words);
        if embeddings.len() != words.len() {
            return Err(anyhow::anyhow!(
                "Embedding count mismatch: {} words, {} vectors",
                words.len(),
                embeddings.len()
            ));
        }
        Ok(embeddings)
    }
}
