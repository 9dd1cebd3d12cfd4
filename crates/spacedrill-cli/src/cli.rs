// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::io::Write;
use std::io::stdout;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use clap::Subcommand;
use serde_json::Value;
use serde_json::json;
use spacedrill_core::CardId;
use spacedrill_core::Catalog;
use spacedrill_core::Clock;
use spacedrill_core::Config;
use spacedrill_core::Database;
use spacedrill_core::Engine;
use spacedrill_core::Error;
use spacedrill_core::Fallible;
use spacedrill_core::LearnerId;
use spacedrill_core::Outcome;
use spacedrill_core::Period;
use spacedrill_core::StaticCatalog;
use spacedrill_core::SystemClock;
use spacedrill_core::UnitId;
use spacedrill_core::fail;
use spacedrill_core::format_interval;

/// Configuration file picked up from the working directory when `--config`
/// is not given.
const DEFAULT_CONFIG_FILE: &str = "spacedrill.toml";

#[derive(Parser)]
#[command(version, about = "Spaced repetition scheduling for learners", long_about = None)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Path to the SQLite database. Overrides the configuration file.
    #[arg(long, global = true)]
    database: Option<PathBuf>,
    /// Path to the catalog directory. Overrides the configuration file.
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the cards due for review now.
    Due {
        #[arg(long)]
        learner: String,
        /// Maximum number of cards to list.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Record a review.
    Review {
        #[arg(long)]
        learner: String,
        #[arg(long)]
        card: String,
        /// One of: wrong, hard, good, easy.
        #[arg(long)]
        outcome: Outcome,
        /// Seconds the learner took to answer.
        #[arg(long)]
        time: Option<u32>,
    },
    /// Summarize recent reviews.
    Stats {
        #[arg(long)]
        learner: String,
        /// One of: today, week, month.
        #[arg(long, default_value = "today")]
        period: Period,
    },
    /// Mark a unit completed and schedule its cards.
    Complete {
        #[arg(long)]
        learner: String,
        #[arg(long)]
        unit: String,
    },
    /// Count the cards due now, per state.
    Dashboard {
        #[arg(long)]
        learner: String,
    },
    /// Add watched seconds to a unit.
    Watch {
        #[arg(long)]
        learner: String,
        #[arg(long)]
        unit: String,
        #[arg(long)]
        seconds: u64,
    },
    /// Show which stages and units are unlocked.
    Unlocked {
        #[arg(long)]
        learner: String,
    },
    /// Show the review history of a card.
    History {
        #[arg(long)]
        learner: String,
        #[arg(long)]
        card: String,
    },
    /// Delete all of a learner's progress.
    Reset {
        #[arg(long)]
        learner: String,
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },
}

pub fn entrypoint() -> Fallible<()> {
    let cli = Cli::parse();
    let mut out = stdout().lock();
    run(cli, Arc::new(SystemClock), &mut out)
}

pub fn run(cli: Cli, clock: Arc<dyn Clock>, out: &mut impl Write) -> Fallible<()> {
    let config = load_config(&cli)?;
    let catalog = Arc::new(StaticCatalog::load(&config.catalog)?);
    let db_path = config
        .database
        .to_str()
        .ok_or_else(|| Error::Config("invalid database path".to_string()))?;
    let db = Database::new(db_path)?;
    let engine = Engine::new(db, catalog.clone(), clock, config);

    let value = match cli.command {
        Command::Due { learner, limit } => {
            let due = engine.get_due_cards(&LearnerId::new(learner), limit)?;
            json!(due)
        }
        Command::Review {
            learner,
            card,
            outcome,
            time,
        } => {
            let state = engine.submit_review(
                &LearnerId::new(learner),
                &CardId::new(card),
                outcome,
                time,
            )?;
            let next_review_in = format_interval(state.schedule.interval);
            json!({
                "state": state,
                "nextReviewIn": next_review_in,
            })
        }
        Command::Stats { learner, period } => {
            let stats = engine.get_review_stats(&LearnerId::new(learner), period)?;
            json!(stats)
        }
        Command::Complete { learner, unit } => {
            let report = engine.complete_unit(&LearnerId::new(learner), &UnitId::new(unit))?;
            json!(report)
        }
        Command::Dashboard { learner } => {
            let stats = engine.get_dashboard_stats(&LearnerId::new(learner))?;
            json!(stats)
        }
        Command::Watch {
            learner,
            unit,
            seconds,
        } => {
            let progress =
                engine.record_watch_time(&LearnerId::new(learner), &UnitId::new(unit), seconds)?;
            json!(progress)
        }
        Command::Unlocked { learner } => {
            unlocked(&engine, catalog.as_ref(), &LearnerId::new(learner))?
        }
        Command::History { learner, card } => {
            let history = engine.card_history(&LearnerId::new(learner), &CardId::new(card))?;
            json!(history)
        }
        Command::Reset { learner, yes } => {
            if !yes {
                return fail("refusing to delete progress without --yes.");
            }
            let counts = engine.reset_progress(&LearnerId::new(learner))?;
            json!(counts)
        }
    };
    print_json(out, &value)
}

fn load_config(cli: &Cli) -> Fallible<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => {
            let path = Path::new(DEFAULT_CONFIG_FILE);
            if path.exists() {
                Config::load(path)?
            } else {
                Config::default()
            }
        }
    };
    if let Some(database) = &cli.database {
        config.database = database.clone();
    }
    if let Some(catalog) = &cli.catalog {
        config.catalog = catalog.clone();
    }
    Ok(config)
}

fn unlocked(engine: &Engine, catalog: &dyn Catalog, learner: &LearnerId) -> Fallible<Value> {
    let mut stages = Vec::new();
    for stage in catalog.stages() {
        let mut units = Vec::new();
        for unit in catalog.units_in_stage(&stage)? {
            let progress = engine.unit_progress(learner, &unit)?;
            let unlocked = engine.is_unit_unlocked(learner, &unit)?;
            units.push(json!({
                "id": unit,
                "unlocked": unlocked,
                "completed": progress.is_completed,
                "watchTimeSeconds": progress.watch_time_seconds,
            }));
        }
        let unlocked = engine.is_stage_unlocked(learner, &stage)?;
        let completed = engine.stage_progress(learner, &stage)?.is_completed;
        stages.push(json!({
            "id": stage,
            "unlocked": unlocked,
            "completed": completed,
            "units": units,
        }));
    }
    Ok(Value::Array(stages))
}

fn print_json(out: &mut impl Write, value: &Value) -> Fallible<()> {
    let text = serde_json::to_string_pretty(value).map_err(std::io::Error::from)?;
    writeln!(out, "{text}")?;
    Ok(())
}
