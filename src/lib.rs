pub mod chatbot;
pub mod cli;
pub mod config;
pub mod ingredient_matcher;
pub mod recipe;
pub mod recipe_formatter;
pub mod search;
