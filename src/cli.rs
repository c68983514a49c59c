use clap::Parser;
use std::path::PathBuf;

use crate::config::Settings;

#[derive(Parser, Debug)]
#[command(author, version, about = "QuickBite: suggests recipes for the ingredients you have", long_about = None)]
pub struct Cli {
    /// Path to the recipe dataset CSV (overrides QUICKBITE_DATASET)
    #[arg(short, long)]
    pub dataset: Option<PathBuf>,

    /// Hugging Face id of the static embedding model (overrides QUICKBITE_EMBEDDING_MODEL)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Match with keyword scoring only
    #[arg(long)]
    pub no_embeddings: bool,

    /// User identifier for the terminal session
    #[arg(short, long, default_value = "terminal_user")]
    pub user: String,
}

impl Cli {
    /// Command-line flags take precedence over environment settings.
    pub fn apply_to(&self, mut settings: Settings) -> Settings {
        if let Some(dataset) = &self.dataset {
            settings.dataset_path = dataset.clone();
        }
        if let Some(model) = &self.model {
            settings.embedding_model = model.clone();
        }
        if self.no_embeddings {
            settings.embeddings_enabled = false;
        }
        settings
    }
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
