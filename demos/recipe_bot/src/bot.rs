//! The conversation: state, intents and the rule tree.
//!
//! ```text
//! first_match
//! ├── no_recipe            ── first_match [choose, "choose first", choose anything]
//! ├── has_recipe           ── quantity question
//! ├── no_instructions_sent ── start
//! ├── has_recipe           ── best_match [next, previous, repeat, restart]
//! └── fallback
//! ```

use std::sync::Arc;

use arbiter::prelude::*;
use parking_lot::Mutex;
use regex::{Regex, RegexBuilder};

use crate::recipes::{self, Recipe};

/// What the bot says in reply to one message.
pub type Reply = Vec<String>;

/// Capture groups of a regex match.
type Groups = Vec<String>;

const NOT_UNDERSTOOD: &str = "I can't understand you. It's you, not me. Get it together and try again.";

#[derive(Debug, Default)]
struct Conversation {
    recipe: Option<&'static Recipe>,
    last_instruction: Option<usize>,
}

/// Regexes for everything the bot understands.
struct Intents {
    choose_recipe: Regex,
    query_quantity: Regex,
    start: Regex,
    next: Regex,
    previous: Regex,
    repeat: Regex,
    restart: Regex,
    anything: Regex,
}

impl Intents {
    fn compile() -> Result<Self, regex::Error> {
        let re = |pattern: &str| RegexBuilder::new(pattern).case_insensitive(true).build();
        Ok(Self {
            choose_recipe: re(r"I want to make (?:a |an |some )?(.+)")?,
            query_quantity: re(r"how (?:many|much) (.+)")?,
            start: re(r"(let's start|start|let's go|go|i'm ready|ready|ok|okay)\.*")?,
            next: re(r"(next|what's next|next up|ok|okay|go|continue)")?,
            previous: re(r"(go back|back up|previous)")?,
            repeat: re(r"(what's that again|huh|say that again|please repeat that|repeat that|repeat)")?,
            restart: re(r"(start over|start again|restart)")?,
            anything: re(r"(.+)")?,
        })
    }
}

/// Scores a text against regexes: `1.0` when one spans the whole (trimmed)
/// text, `0.6` when one only matches part of it.
fn matches_any(
    patterns: Vec<Regex>,
) -> impl Fn(String) -> Eventual<Option<Scored<Groups>>> + Send + Sync + 'static {
    move |text: String| {
        let text = text.trim();
        let scored = patterns.iter().find_map(|pattern| {
            let captures = pattern.captures(text)?;
            let whole = captures.get(0)?;
            let score = if whole.start() == 0 && whole.end() == text.len() {
                PERFECT_SCORE
            } else {
                0.6
            };
            let groups = captures
                .iter()
                .skip(1)
                .map(|group| group.map_or_else(String::new, |g| g.as_str().to_string()))
                .collect();
            Some(Scored::new(score, groups))
        });
        Eventual::ready(scored)
    }
}

fn say(lines: impl IntoIterator<Item = impl Into<String>>) -> Eventual<Reply> {
    Eventual::ready(lines.into_iter().map(Into::into).collect())
}

/// A cooking assistant holding one conversation.
#[derive(Clone, Default)]
pub struct RecipeBot {
    state: Arc<Mutex<Conversation>>,
}

impl RecipeBot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of the recipe being cooked, if one was chosen.
    pub fn recipe_name(&self) -> Option<&'static str> {
        self.state.lock().recipe.map(|recipe| recipe.name)
    }

    fn queries(&self) -> Queries<String> {
        let has_recipe = Arc::clone(&self.state);
        let no_recipe = Arc::clone(&self.state);
        let not_started = Arc::clone(&self.state);

        Queries::new()
            .with("has_recipe", move |_: String| {
                Eventual::ready(has_recipe.lock().recipe.is_some())
            })
            .with("no_recipe", move |_: String| {
                Eventual::ready(no_recipe.lock().recipe.is_none())
            })
            .with("no_instructions_sent", move |_: String| {
                let state = not_started.lock();
                Eventual::ready(state.recipe.is_some() && state.last_instruction.is_none())
            })
    }

    /// Builds the rule tree for this conversation.
    pub fn rules(&self) -> anyhow::Result<Rule<String, Reply>> {
        let intents = Intents::compile()?;
        let queries = self.queries();
        let guard = |name: &str, rule: Rule<String, Reply>| {
            queries
                .guard(name, rule)
                .ok_or_else(|| anyhow::anyhow!("query {name:?} is not registered"))
        };

        let choosing = first_match(vec![
            self.choose_recipe(matches_any(vec![intents.choose_recipe]))
                .name("choose-recipe"),
            rule(
                matches_any(vec![
                    intents.query_quantity.clone(),
                    intents.start.clone(),
                    intents.restart.clone(),
                ]),
                |_: String, _: Groups| say(["First please choose a recipe"]),
            )
            .name("choose-first"),
            self.choose_recipe(matches_any(vec![intents.anything]))
                .name("choose-anything"),
        ]);

        let navigating = best_match(vec![
            self.step(matches_any(vec![intents.next]), Step::Next).name("next"),
            self.step(matches_any(vec![intents.previous]), Step::Previous)
                .name("previous"),
            self.step(matches_any(vec![intents.repeat]), Step::Repeat)
                .name("repeat"),
            self.step(matches_any(vec![intents.restart]), Step::Restart)
                .name("restart"),
        ]);

        let fallback = rule(
            |_: String| Eventual::ready(Some(Scored::bare(0.0))),
            |_: String, _: ()| say([NOT_UNDERSTOOD]),
        )
        .name("fallback");

        Ok(first_match(vec![
            guard("no_recipe", choosing)?,
            guard("has_recipe", self.quantity(matches_any(vec![intents.query_quantity])))?,
            guard(
                "no_instructions_sent",
                self.step(matches_any(vec![intents.start]), Step::Restart)
                    .name("start"),
            )?,
            guard("has_recipe", navigating)?,
            fallback,
        ]))
    }

    fn choose_recipe<M>(&self, matcher: M) -> Rule<String, Reply>
    where
        M: Matcher<String, Args = Groups>,
    {
        let state = Arc::clone(&self.state);
        rule(matcher, move |_: String, groups: Groups| {
            let name = groups.first().map(String::as_str).unwrap_or_default().trim();
            match recipes::find(name) {
                Some(recipe) => {
                    *state.lock() = Conversation {
                        recipe: Some(recipe),
                        last_instruction: None,
                    };
                    let mut lines = vec![
                        format!(
                            "Great, let's make {} which {}!",
                            recipe.name,
                            recipe.recipe_yield.to_lowercase()
                        ),
                        "Here are the ingredients:".to_string(),
                    ];
                    lines.extend(recipe.ingredients.iter().map(|i| i.to_string()));
                    lines.push("Let me know when you're ready to go.".to_string());
                    say(lines)
                }
                None => say([format!(
                    "Sorry, I don't know how to make {name}. Maybe one day you can teach me."
                )]),
            }
        })
    }

    fn quantity<M>(&self, matcher: M) -> Rule<String, Reply>
    where
        M: Matcher<String, Args = Groups>,
    {
        let state = Arc::clone(&self.state);
        rule(matcher, move |_: String, groups: Groups| {
            let query = groups.first().cloned().unwrap_or_default();
            let ingredient = state
                .lock()
                .recipe
                .and_then(|recipe| recipe.closest_ingredient(&query));
            match ingredient {
                Some(ingredient) => say([ingredient]),
                None => say(["That isn't in this recipe."]),
            }
        })
    }

    fn step<M>(&self, matcher: M, step: Step) -> Rule<String, Reply>
    where
        M: Matcher<String, Args = Groups>,
    {
        let state = Arc::clone(&self.state);
        rule(matcher, move |_: String, _: Groups| {
            say(state.lock().advance(step))
        })
    }
}

/// A move through the instruction list.
#[derive(Debug, Clone, Copy)]
enum Step {
    Next,
    Previous,
    Repeat,
    Restart,
}

impl Conversation {
    fn advance(&mut self, step: Step) -> Reply {
        let Some(recipe) = self.recipe else {
            return vec!["First please choose a recipe".to_string()];
        };

        let target = match (step, self.last_instruction) {
            (Step::Restart, _) | (Step::Next, None) => Some(0),
            (Step::Next, Some(last)) => Some(last + 1),
            (Step::Repeat, last) => last,
            (Step::Previous, Some(last)) => last.checked_sub(1),
            (Step::Previous, None) => None,
        };

        match (step, target) {
            (_, Some(index)) if index < recipe.instructions.len() => {
                self.say_instruction(recipe, index)
            }
            (Step::Next, _) => vec!["That's it!".to_string()],
            (Step::Previous, _) => vec!["We're at the beginning.".to_string()],
            _ => vec!["We haven't started yet.".to_string()],
        }
    }

    fn say_instruction(&mut self, recipe: &Recipe, index: usize) -> Reply {
        self.last_instruction = Some(index);
        let mut lines = vec![recipe.instructions[index].to_string()];
        if index + 1 == recipe.instructions.len() {
            lines.push("That's it!".to_string());
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Session {
        bot: RecipeBot,
        engine: Engine<String, Reply>,
    }

    impl Session {
        fn new() -> Self {
            let bot = RecipeBot::new();
            let engine = Engine::new(bot.rules().unwrap()).observer(Arc::new(NoopObserver));
            Self { bot, engine }
        }

        async fn say(&self, text: &str) -> Reply {
            match self.engine.run(text.to_string()).await.unwrap() {
                Outcome::Completed(reply) => reply,
                Outcome::NoMatch => Vec::new(),
            }
        }
    }

    #[tokio::test]
    async fn test_choose_recipe() {
        let session = Session::new();
        let reply = session.say("I want to make pancakes").await;

        assert_eq!(reply[0], "Great, let's make Pancakes which makes 8 pancakes!");
        assert_eq!(reply.last().unwrap(), "Let me know when you're ready to go.");
        assert_eq!(session.bot.recipe_name(), Some("Pancakes"));
    }

    #[tokio::test]
    async fn test_unknown_recipe() {
        let session = Session::new();
        assert_eq!(
            session.say("I want to make some lasagne").await,
            vec!["Sorry, I don't know how to make lasagne. Maybe one day you can teach me."]
        );
        assert_eq!(session.bot.recipe_name(), None);
    }

    #[tokio::test]
    async fn test_bare_recipe_name_is_accepted() {
        let session = Session::new();
        session.say("tomato soup").await;
        assert_eq!(session.bot.recipe_name(), Some("Tomato Soup"));
    }

    #[tokio::test]
    async fn test_needs_recipe_first() {
        let session = Session::new();
        assert_eq!(session.say("how many eggs").await, vec!["First please choose a recipe"]);
        assert_eq!(session.say("start over").await, vec!["First please choose a recipe"]);
    }

    #[tokio::test]
    async fn test_walk_through_instructions() {
        let session = Session::new();
        session.say("I want to make pancakes").await;

        let first_step = session.say("let's go").await;
        assert_eq!(first_step[0], RECIPE_STEPS[0]);

        assert_eq!(session.say("next").await, vec![RECIPE_STEPS[1]]);
        assert_eq!(session.say("go back").await, vec![RECIPE_STEPS[0]]);
        assert_eq!(session.say("go back").await, vec!["We're at the beginning."]);
        assert_eq!(session.say("repeat that").await, vec![RECIPE_STEPS[0]]);

        session.say("next").await;
        session.say("next").await;
        assert_eq!(session.say("next").await, vec![RECIPE_STEPS[3], "That's it!"]);
        assert_eq!(session.say("next").await, vec!["That's it!"]);
        assert_eq!(session.say("start over").await, vec![RECIPE_STEPS[0]]);
    }

    const RECIPE_STEPS: [&str; 4] = [
        "Put the flour, eggs, milk, oil and salt into a bowl and whisk to a smooth batter.",
        "Set aside for 30 minutes to rest.",
        "Heat a lightly oiled frying pan over a medium heat.",
        "Cook each pancake for 1 minute on each side until golden.",
    ];

    #[tokio::test]
    async fn test_quantity_question() {
        let session = Session::new();
        session.say("I want to make pancakes").await;
        assert_eq!(session.say("how much milk").await, vec!["300ml semi-skimmed milk"]);
    }

    #[tokio::test]
    async fn test_fallback() {
        let session = Session::new();
        session.say("I want to make pancakes").await;
        assert_eq!(session.say("sing me a song").await, vec![NOT_UNDERSTOOD]);
    }

    #[test]
    fn test_whole_match_scores_perfect() {
        let matcher = matches_any(vec![Regex::new("(?i)next").unwrap()]);
        let scope = Scope::new();

        let whole = ready_value(matcher.score("Next".into(), &scope));
        let partial = ready_value(matcher.score("what's next?".into(), &scope));
        assert_eq!(whole.map(|s| s.score), Some(PERFECT_SCORE));
        assert_eq!(partial.map(|s| s.score), Some(0.6));
    }

    fn ready_value(eventual: Eventual<Option<Scored<Groups>>>) -> Option<Scored<Groups>> {
        match eventual {
            Eventual::Ready(result) => result.unwrap(),
            other => panic!("expected a ready result, got {other:?}"),
        }
    }
}
