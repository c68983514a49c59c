use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use tracing::{info, warn};

use crate::search::DEFAULT_EMBEDDING_MODEL_ID;

pub const DATASET_ENV_VAR: &str = "QUICKBITE_DATASET";
pub const MODEL_ENV_VAR: &str = "QUICKBITE_EMBEDDING_MODEL";
pub const DISABLE_EMBEDDINGS_ENV_VAR: &str = "QUICKBITE_DISABLE_EMBEDDINGS";

const DEFAULT_DATASET_PATH: &str = "Dataset.csv";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub dataset_path: PathBuf,
    pub embedding_model: String,
    pub embeddings_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from(DEFAULT_DATASET_PATH),
            embedding_model: DEFAULT_EMBEDDING_MODEL_ID.to_string(),
            embeddings_enabled: true,
        }
    }
}

impl Settings {
    /// Reads `.env` (if any) and the process environment.
    pub fn load() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from any key lookup, falling back to defaults for missing or invalid values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let disable_embeddings: bool = try_load(&lookup, DISABLE_EMBEDDINGS_ENV_VAR, false);
        Self {
            dataset_path: try_load(&lookup, DATASET_ENV_VAR, defaults.dataset_path),
            embedding_model: try_load(&lookup, MODEL_ENV_VAR, defaults.embedding_model),
            embeddings_enabled: !disable_embeddings,
        }
    }
}

fn try_load<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
    T::Err: Display,
{
    let Some(raw) = lookup(key) else {
        info!("{key} not set, using default: {default:?}");
        return default;
    };

    raw.trim().parse().unwrap_or_else(|e| {
        warn!("Invalid {key} value '{raw}': {e}, using default: {default:?}");
        default
    })
}
