use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, error};

use super::messages::*;
use super::session_store::{InMemorySessionStore, SessionError, SessionStore};
use super::state::{ConversationState, Reply, Stage};
use crate::ingredient_matcher::{
    mentions_key_ingredient, RecipeMatcher, KEY_INGREDIENTS, MIN_TOKEN_LEN,
};
use crate::recipe_formatter::format_recipes;
use crate::search::embedding_index::tokenize;

/// Why a message was not accepted as an ingredient list. Shown to the user, not an error.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("ingredients too short")]
    TooShort,

    #[error("no known food in ingredients")]
    NotFood,
}

impl ValidationError {
    pub fn reply(self) -> Reply {
        match self {
            ValidationError::TooShort => Reply::text(INVALID_INGREDIENTS),
            ValidationError::NotFood => Reply::text(NOT_FOOD),
        }
    }
}

/// Rejects text under 3 characters, or whose comma segments are all under 3 characters.
pub fn check_length(text: &str) -> Result<(), ValidationError> {
    let too_short = |s: &str| s.trim().chars().count() < MIN_TOKEN_LEN;
    if too_short(text) || text.split(',').all(too_short) {
        return Err(ValidationError::TooShort);
    }
    Ok(())
}

/// Length check plus the key-ingredient gate.
pub fn validate_ingredients(text: &str) -> Result<(), ValidationError> {
    check_length(text)?;
    if !text.split(',').any(mentions_key_ingredient) {
        return Err(ValidationError::NotFood);
    }
    Ok(())
}

fn is_greeting(message: &str) -> bool {
    GREETING_KEYWORDS
        .iter()
        .any(|greeting| message == *greeting || message.starts_with(greeting))
}

fn has_word(words: &[String], candidates: &[&str]) -> bool {
    words.iter().any(|word| candidates.contains(&word.as_str()))
}

fn is_recipe_request(raw_message: &str, message: &str) -> bool {
    raw_message.contains(',') || RECIPE_TRIGGERS.iter().any(|trigger| message.contains(trigger))
}

/// General talk about food, unless the message is nothing but key ingredients.
fn is_food_chat(message: &str) -> bool {
    let only_key_ingredients = message
        .split(',')
        .all(|segment| KEY_INGREDIENTS.contains(&segment.trim()));
    !only_key_ingredients && FOOD_KEYWORDS.iter().any(|keyword| message.contains(keyword))
}

/// Per-user conversation driver.
///
/// Every call to [`DialogueEngine::respond`] reads the user's state from the
/// session store, applies one transition and writes the state back. Calls for
/// the same user are serialized; calls for different users run independently.
pub struct DialogueEngine {
    matcher: Arc<dyn RecipeMatcher>,
    sessions: Arc<dyn SessionStore>,
    user_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl DialogueEngine {
    pub fn new(matcher: Arc<dyn RecipeMatcher>, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            matcher,
            sessions,
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_in_memory_sessions(matcher: Arc<dyn RecipeMatcher>) -> Self {
        Self::new(matcher, Arc::new(InMemorySessionStore::new()))
    }

    /// Answers one message. Never fails: faults become a generic error reply.
    pub fn respond(&self, user_id: &str, message: Option<&str>) -> Reply {
        self.with_user_lock(user_id, || {
            match panic::catch_unwind(AssertUnwindSafe(|| self.process(user_id, message))) {
                Ok(Ok(reply)) => reply,
                Ok(Err(e)) => {
                    error!("Failed to handle message from '{}': {}", user_id, e);
                    Reply::text(GENERIC_ERROR)
                }
                Err(_) => {
                    error!("Panic while handling message from '{}'", user_id);
                    Reply::text(GENERIC_ERROR)
                }
            }
        })
    }

    /// Current stage of a user, `None` before their first message.
    pub fn stage(&self, user_id: &str) -> Result<Option<Stage>, SessionError> {
        Ok(self.sessions.get(user_id)?.map(|state| state.stage))
    }

    pub fn end_session(&self, user_id: &str) -> Result<(), SessionError> {
        self.with_user_lock(user_id, || self.sessions.remove(user_id).map(|_| ()))
    }

    /// Runs `f` while holding the user's lock.
    ///
    /// Lock entries live only while some caller holds or waits on them. A clone is
    /// taken under the table lock, so an entry whose only owner is the table can be
    /// dropped without letting a second lock for the same user appear.
    fn with_user_lock<T>(&self, user_id: &str, f: impl FnOnce() -> T) -> T {
        let user_lock = {
            let mut locks = self.user_locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(user_id.to_string()).or_default())
        };

        let result = {
            let _guard = user_lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        drop(user_lock);

        let mut locks = self.user_locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks.get(user_id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(user_id);
        }
        result
    }

    fn save(
        &self,
        user_id: &str,
        state: &mut ConversationState,
        stage: Stage,
    ) -> Result<(), SessionError> {
        if state.stage != stage {
            debug!("User '{}': {:?} -> {:?}", user_id, state.stage, stage);
        }
        state.stage = stage;
        self.sessions.put(user_id, state.clone())
    }

    fn process(&self, user_id: &str, message: Option<&str>) -> Result<Reply, SessionError> {
        let mut state = match self.sessions.get(user_id)? {
            Some(state) => state,
            None => {
                let state = ConversationState::default();
                self.sessions.put(user_id, state.clone())?;
                state
            }
        };

        let raw_message = message.unwrap_or("");
        let message = raw_message.trim().to_lowercase();

        if is_greeting(&message) {
            self.save(user_id, &mut state, Stage::AwaitIngredients)?;
            return Ok(Reply::text(ONBOARDING));
        }

        match state.stage {
            Stage::Greeting => return Ok(Reply::text(SAY_HI)),
            Stage::AwaitIngredients => {
                if let Err(invalid) = validate_ingredients(&message) {
                    return Ok(invalid.reply());
                }
            }
            Stage::OfferRetry => {
                let words = tokenize(&message);
                if has_word(&words, &AFFIRMATIVE_WORDS) {
                    self.save(user_id, &mut state, Stage::AwaitIngredients)?;
                    return Ok(Reply::text(ASK_NEW_INGREDIENTS));
                }
                if has_word(&words, &NEGATIVE_WORDS) {
                    self.save(user_id, &mut state, Stage::Greeting)?;
                    return Ok(Reply::text(FAREWELL));
                }
                if let Err(invalid) = validate_ingredients(&message) {
                    return Ok(invalid.reply());
                }
                return self.suggest(user_id, &mut state, &message);
            }
        }

        // Awaiting ingredients, and the message passed validation.
        if is_recipe_request(raw_message, &message) {
            let query = match message.split_once("with") {
                Some((_, after)) => after.trim(),
                None => message.as_str(),
            };
            if let Err(invalid) = check_length(query) {
                return Ok(invalid.reply());
            }
            return self.suggest(user_id, &mut state, query);
        }

        if is_food_chat(&message) {
            return Ok(Reply::with_follow_up(CUISINE_INFO, CUISINE_FOLLOW_UP));
        }

        self.suggest(user_id, &mut state, &message)
    }

    /// Runs the matcher and moves the user to the retry offer, whatever the outcome.
    fn suggest(
        &self,
        user_id: &str,
        state: &mut ConversationState,
        query: &str,
    ) -> Result<Reply, SessionError> {
        state.last_query = Some(query.to_string());

        let reply = match self.matcher.find_matches(query) {
            Ok(results) if !results.is_empty() => {
                Reply::with_follow_up(format_recipes(&results), TRY_DIFFERENT)
            }
            Ok(_) => Reply::text(NO_MATCH),
            Err(rejected) => {
                debug!("Matcher rejected '{}': {}", query, rejected);
                Reply::text(NO_MATCH)
            }
        };

        self.save(user_id, state, Stage::OfferRetry)?;
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingredient_matcher::{HeuristicMatcher, MatchQuery, RankedRecipe};
    use crate::recipe::RecipeCorpus;
    use crate::search::embedding_index::tests::sample_corpus;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    fn matcher() -> Arc<HeuristicMatcher> {
        Arc::new(HeuristicMatcher::new(Arc::new(sample_corpus())))
    }

    fn engine() -> DialogueEngine {
        DialogueEngine::with_in_memory_sessions(matcher())
    }

    fn engine_at(stage: Stage) -> (DialogueEngine, &'static str) {
        let engine = engine();
        let user = "tester";
        match stage {
            Stage::Greeting => {
                engine.respond(user, Some("anything"));
            }
            Stage::AwaitIngredients => {
                engine.respond(user, Some("hi"));
            }
            Stage::OfferRetry => {
                engine.respond(user, Some("hi"));
                engine.respond(user, Some("chicken, onion"));
            }
        }
        assert_eq!(engine.stage(user).unwrap(), Some(stage));
        (engine, user)
    }

    #[test]
    fn test_validation_helpers() {
        assert_eq!(check_length("ab"), Err(ValidationError::TooShort));
        assert_eq!(check_length("xy, ab"), Err(ValidationError::TooShort));
        assert_eq!(check_length("xy, abc"), Ok(()));
        assert_eq!(validate_ingredients("xyz, abc"), Err(ValidationError::NotFood));
        assert_eq!(validate_ingredients("basmati rice"), Ok(()));
    }

    #[test]
    fn test_keyword_helpers() {
        assert!(is_greeting("hi"));
        assert!(is_greeting("hello there"));
        assert!(is_greeting("start over please"));
        assert!(!is_greeting("chicken"));

        assert!(is_food_chat("indian curry ideas"));
        assert!(!is_food_chat("spice"));
        assert!(!is_food_chat("chicken"));
    }

    #[test]
    fn test_first_message_must_be_greeting() {
        let engine = engine();
        let reply = engine.respond("u1", Some("chicken"));
        assert_eq!(reply, Reply::text(SAY_HI));
        assert_eq!(engine.stage("u1").unwrap(), Some(Stage::Greeting));
    }

    #[test]
    fn test_absent_message_is_handled() {
        let (engine, user) = engine_at(Stage::AwaitIngredients);
        assert_eq!(engine.respond(user, None), Reply::text(INVALID_INGREDIENTS));
        assert_eq!(engine.stage(user).unwrap(), Some(Stage::AwaitIngredients));
    }

    #[test]
    fn test_non_food_input_is_rejected() {
        let (engine, user) = engine_at(Stage::AwaitIngredients);
        assert_eq!(engine.respond(user, Some("table, chair")), Reply::text(NOT_FOOD));
        assert_eq!(engine.stage(user).unwrap(), Some(Stage::AwaitIngredients));
    }

    #[test]
    fn test_with_extraction() {
        let (engine, user) = engine_at(Stage::AwaitIngredients);
        let reply = engine.respond(user, Some("What can I cook with garlic"));
        assert!(reply.has_follow_up);
        assert!(reply.response.contains("Palak Paneer"));
        assert!(reply.response.contains("Dal Tadka"));
        assert_eq!(engine.stage(user).unwrap(), Some(Stage::OfferRetry));
    }

    #[test]
    fn test_food_chat_keeps_stage() {
        let (engine, user) = engine_at(Stage::AwaitIngredients);
        let reply = engine.respond(user, Some("indian curry ideas"));
        assert_eq!(reply, Reply::with_follow_up(CUISINE_INFO, CUISINE_FOLLOW_UP));
        assert_eq!(engine.stage(user).unwrap(), Some(Stage::AwaitIngredients));
    }

    #[test]
    fn test_single_key_ingredient_is_a_query() {
        let (engine, user) = engine_at(Stage::AwaitIngredients);
        let reply = engine.respond(user, Some("spice"));
        assert_eq!(reply, Reply::text(NO_MATCH));
        assert_eq!(engine.stage(user).unwrap(), Some(Stage::OfferRetry));
    }

    #[test]
    fn test_offer_retry_new_query() {
        let (engine, user) = engine_at(Stage::OfferRetry);
        let reply = engine.respond(user, Some("garlic"));
        assert!(reply.response.contains("Palak Paneer"));
        assert_eq!(engine.stage(user).unwrap(), Some(Stage::OfferRetry));

        assert_eq!(engine.respond(user, Some("xy")), Reply::text(INVALID_INGREDIENTS));
        assert_eq!(engine.respond(user, Some("table lamp")), Reply::text(NOT_FOOD));
        assert_eq!(engine.stage(user).unwrap(), Some(Stage::OfferRetry));
    }

    #[test]
    fn test_offer_retry_words_are_whole_tokens() {
        // "chicken, onion" contains the letters n and y in other words; it is still a query.
        let (engine, user) = engine_at(Stage::OfferRetry);
        let reply = engine.respond(user, Some("onion, chicken"));
        assert!(reply.has_follow_up);
        assert_eq!(engine.stage(user).unwrap(), Some(Stage::OfferRetry));
    }

    #[test]
    fn test_greeting_resets_from_any_stage() {
        let (engine, user) = engine_at(Stage::OfferRetry);
        assert_eq!(engine.respond(user, Some("Reset")), Reply::text(ONBOARDING));
        assert_eq!(engine.stage(user).unwrap(), Some(Stage::AwaitIngredients));
    }

    #[test]
    fn test_last_query_is_recorded() {
        let store = Arc::new(InMemorySessionStore::new());
        let engine = DialogueEngine::new(matcher(), store.clone());
        engine.respond("u", Some("hello"));
        engine.respond("u", Some("make something with rice"));

        let state = store.get("u").unwrap().unwrap();
        assert_eq!(state.last_query.as_deref(), Some("rice"));
        assert_eq!(state.stage, Stage::OfferRetry);
    }

    #[test]
    fn test_end_session_forgets_user() {
        let (engine, user) = engine_at(Stage::OfferRetry);
        engine.end_session(user).unwrap();
        assert_eq!(engine.stage(user).unwrap(), None);
    }

    #[test]
    fn test_idle_users_hold_no_lock_entries() {
        let engine = engine();
        for user in ["a", "b", "c"] {
            engine.respond(user, Some("hi"));
        }
        engine.end_session("a").unwrap();
        assert!(engine.user_locks.lock().unwrap().is_empty());
    }

    /// In-memory store that sleeps inside every call and records how many calls overlapped.
    #[derive(Default)]
    struct OverlapTrackingStore {
        inner: InMemorySessionStore,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl OverlapTrackingStore {
        fn track<T>(&self, call: impl FnOnce() -> T) -> T {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(2));
            let result = call();
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        }
    }

    impl SessionStore for OverlapTrackingStore {
        fn get(&self, user_id: &str) -> Result<Option<ConversationState>, SessionError> {
            self.track(|| self.inner.get(user_id))
        }
        fn put(&self, user_id: &str, state: ConversationState) -> Result<(), SessionError> {
            self.track(|| self.inner.put(user_id, state))
        }
        fn remove(&self, user_id: &str) -> Result<Option<ConversationState>, SessionError> {
            self.track(|| self.inner.remove(user_id))
        }
    }

    #[test]
    fn test_same_user_requests_never_overlap() {
        let store = Arc::new(OverlapTrackingStore::default());
        let engine = DialogueEngine::new(matcher(), store.clone());

        thread::scope(|scope| {
            for worker in 0..8 {
                let engine = &engine;
                scope.spawn(move || {
                    for round in 0..5 {
                        engine.respond("shared", Some("hi"));
                        engine.respond("shared", Some("chicken, onion"));
                        if (worker + round) % 3 == 0 {
                            engine.end_session("shared").unwrap();
                        }
                    }
                });
            }
        });

        assert_eq!(store.peak.load(Ordering::SeqCst), 1);
        assert!(engine.user_locks.lock().unwrap().is_empty());
    }

    struct FailingStore;

    impl SessionStore for FailingStore {
        fn get(&self, _user_id: &str) -> Result<Option<ConversationState>, SessionError> {
            Err(SessionError::Unavailable("backend down".to_string()))
        }
        fn put(&self, _user_id: &str, _state: ConversationState) -> Result<(), SessionError> {
            Err(SessionError::Unavailable("backend down".to_string()))
        }
        fn remove(&self, _user_id: &str) -> Result<Option<ConversationState>, SessionError> {
            Err(SessionError::Unavailable("backend down".to_string()))
        }
    }

    struct PanickingMatcher(RecipeCorpus);

    impl RecipeMatcher for PanickingMatcher {
        fn name(&self) -> &'static str {
            "panicking"
        }
        fn corpus(&self) -> &RecipeCorpus {
            &self.0
        }
        fn rank(&self, _query: &MatchQuery) -> Vec<RankedRecipe<'_>> {
            panic!("matcher blew up");
        }
    }

    #[test]
    fn test_store_failure_becomes_generic_reply() {
        let engine = DialogueEngine::new(matcher(), Arc::new(FailingStore));
        assert_eq!(engine.respond("u", Some("hi")), Reply::text(GENERIC_ERROR));
    }

    #[test]
    fn test_panic_becomes_generic_reply_and_keeps_state() {
        let engine =
            DialogueEngine::with_in_memory_sessions(Arc::new(PanickingMatcher(sample_corpus())));
        engine.respond("u", Some("hi"));
        assert_eq!(engine.respond("u", Some("chicken, onion")), Reply::text(GENERIC_ERROR));
        assert_eq!(engine.stage("u").unwrap(), Some(Stage::AwaitIngredients));

        // The same user can keep talking afterwards.
        assert_eq!(engine.respond("u", Some("hello")), Reply::text(ONBOARDING));
    }
}
