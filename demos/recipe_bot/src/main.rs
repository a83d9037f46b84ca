//! Recipe Bot
//!
//! A cooking assistant on stdin/stdout, driven by the rule engine.
//!
//! ```text
//! > I want to make pancakes
//! Great, let's make Pancakes which makes 8 pancakes!
//! ...
//! > let's go
//! Put the flour, eggs, milk, oil and salt into a bowl and whisk to a smooth batter.
//! > how much milk
//! 300ml semi-skimmed milk
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --package recipe-bot -- --config demos/recipe_bot/arbiter.toml
//! ```

mod bot;
mod recipes;

use std::path::PathBuf;

use anyhow::Result;
use arbiter::prelude::*;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::bot::RecipeBot;

#[derive(Debug, Parser)]
#[command(name = "recipe-bot", about = "A cooking assistant driven by arbiter rules")]
struct Args {
    /// Configuration file; searched for in the usual places when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Configuration profile (`arbiter.{profile}.toml` is read first).
    #[arg(long)]
    profile: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut loader = ConfigLoader::new();
    if let Some(profile) = &args.profile {
        loader = loader.profile(profile);
    }
    if let Some(path) = &args.config {
        loader = loader.file(path);
    }
    let config = loader.load()?;

    let bot = RecipeBot::new();
    let engine = launch(bot.rules()?, &config)?;

    println!("Let's get cooking!");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match engine.run(line.to_string()).await {
            Ok(Outcome::Completed(reply)) => {
                for text in reply {
                    println!("{text}");
                }
            }
            Ok(Outcome::NoMatch) => debug!(message = line, "No rule matched"),
            Err(e) => error!("Failed to handle message: {:?}", e),
        }
    }

    info!(recipe = bot.recipe_name().unwrap_or("none"), "Goodbye");
    Ok(())
}
