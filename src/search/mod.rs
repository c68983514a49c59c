pub mod data_loader;
pub mod embedding_engine;
pub mod embedding_index;
pub mod similarity;

// Re-export key structs/functions for easier access from outside the search module
pub use data_loader::{load_corpus_or_placeholder, load_recipe_corpus};
pub use embedding_engine::{EmbeddingEngine, DEFAULT_EMBEDDING_MODEL_ID};
pub use embedding_index::{EmbeddingIndex, IndexError, WordEncoder};
pub use similarity::cosine_similarity;
