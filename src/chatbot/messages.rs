// Fixed assistant replies.

pub const ONBOARDING: &str = "Hello! I'm your Indian recipe assistant. What ingredients do you have available? Please list them separated by commas.";

pub const SAY_HI: &str = "Please say 'hi' or 'hello' to start our conversation.";

pub const INVALID_INGREDIENTS: &str = "I need valid ingredients to suggest recipes. Please provide ingredients that are at least 3 letters long, separated by commas (like 'rice, tomato, onion').";

pub const NOT_FOOD: &str = "I couldn't find any valid food ingredients in your input. Please provide actual food ingredients like 'rice', 'chicken', 'tomato', etc.";

pub const ASK_NEW_INGREDIENTS: &str = "Great! What ingredients would you like to use now? Please list them separated by commas.";

pub const FAREWELL: &str = "Feel free to come back anytime you want recipe suggestions! Say 'hi' or 'hello' to start a new conversation.";

pub const TRY_DIFFERENT: &str = "Would you like to try different ingredients? (Yes/No)";

pub const NO_MATCH: &str = "I couldn't find any specific recipes with those ingredients. Would you like to try different ingredients? (Yes/No)";

pub const CUISINE_INFO: &str = "Indian cuisine is diverse and flavorful, known for its use of spices like turmeric, cumin, and garam masala. Common dishes include curry, biryani, and various vegetarian options.";

pub const CUISINE_FOLLOW_UP: &str = "Would you like to find recipes based on specific ingredients? Just list what you have available.";

pub const GENERIC_ERROR: &str = "I encountered an error. Please try again with a simpler query about Indian recipes.";

// Keyword lists, matched against the lowercased message.
pub const GREETING_KEYWORDS: [&str; 5] = ["hi", "hello", "hey", "start over", "reset"];
pub const AFFIRMATIVE_WORDS: [&str; 7] = ["yes", "yeah", "yep", "sure", "ok", "okay", "y"];
pub const NEGATIVE_WORDS: [&str; 5] = ["no", "nope", "nah", "n", "not"];
pub const RECIPE_TRIGGERS: [&str; 4] = ["recipe", "cook", "make", "with"];
pub const FOOD_KEYWORDS: [&str; 5] = ["food", "cuisine", "dish", "spice", "indian"];
