use anyhow::{Context, Result};
use quickbite::chatbot::{DialogueEngine, Reply};
use quickbite::cli::parse_args;
use quickbite::config::Settings;
use quickbite::ingredient_matcher::{select_matcher, RecipeMatcher};
use quickbite::search::{load_corpus_or_placeholder, EmbeddingEngine, WordEncoder};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const STARTUP_TEST_INGREDIENTS: &str = "chicken, onion";

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

/// Loads the corpus and picks a matcher. Blocking: may download the embedding model.
fn build_matcher(settings: &Settings) -> Arc<dyn RecipeMatcher> {
    let corpus = Arc::new(load_corpus_or_placeholder(&settings.dataset_path));

    if !settings.embeddings_enabled {
        return select_matcher(corpus, None);
    }

    match EmbeddingEngine::new(&settings.embedding_model) {
        Ok(engine) => select_matcher(corpus, Some(&engine as &dyn WordEncoder)),
        Err(e) => {
            warn!("{:#}", e);
            select_matcher(corpus, None)
        }
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn print_reply(reply: &Reply) {
    println!("Assistant: {}", reply.response);
    if let (true, Some(follow_up)) = (reply.has_follow_up, &reply.follow_up) {
        println!("Assistant: {}", follow_up);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli_args = parse_args();
    let settings = cli_args.apply_to(Settings::load());
    let user_id = cli_args.user.clone();

    println!("QuickBite");
    println!("Say 'hi' or 'hello' to start!");

    let matcher_settings = settings.clone();
    let matcher = tokio::task::spawn_blocking(move || build_matcher(&matcher_settings))
        .await
        .context("Matcher initialization task failed")?;
    let engine = DialogueEngine::with_in_memory_sessions(matcher);

    // Startup self-test on a throwaway user so the interactive session starts clean.
    let startup_user = format!("{}-startup", user_id);
    let greeting = engine.respond(&startup_user, Some("hi"));
    println!("Test greeting response: {}...", preview(&greeting.response, 50));
    let sample = engine.respond(&startup_user, Some(STARTUP_TEST_INGREDIENTS));
    println!("\nTest ingredient search for '{}':", STARTUP_TEST_INGREDIENTS);
    println!("{}...\n", preview(&sample.response, 200));
    engine.end_session(&startup_user).ok();
    println!("Interactive mode starting now:");

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"You: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await.context("Failed to read from stdin")? else {
            break;
        };
        let input = line.trim();
        if matches!(input.to_lowercase().as_str(), "quit" | "exit") {
            break;
        }

        let reply = engine.respond(&user_id, Some(input));
        print_reply(&reply);
    }

    Ok(())
}
