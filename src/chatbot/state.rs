use serde::{Deserialize, Serialize};

/// Where a user is in the conversation. Decides how the next message is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Greeting,
    AwaitIngredients,
    OfferRetry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    pub stage: Stage,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_query: Option<String>, // Last ingredient text sent to the matcher
}

impl Default for ConversationState {
    fn default() -> Self {
        Self {
            stage: Stage::Greeting,
            active: true,
            last_query: None,
        }
    }
}

/// What the web layer gets back for every message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub response: String,
    pub has_follow_up: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub follow_up: Option<String>,
}

impl Reply {
    pub fn text(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            has_follow_up: false,
            follow_up: None,
        }
    }

    pub fn with_follow_up(response: impl Into<String>, follow_up: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            has_follow_up: true,
            follow_up: Some(follow_up.into()),
        }
    }
}
