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

use std::sync::Arc;

use crate::catalog::Catalog;
use crate::clock::Clock;
use crate::config::Config;
use crate::db::Database;
use crate::error::Fallible;
use crate::retry::conflict_backoff;
use crate::retry::retry_conflicts;

/// The scheduling engine. Owns its collaborators and exposes every
/// operation: the review queue (`queue`), review submission and statistics
/// (`pipeline`), and unit completion and unlocking (`gate`).
pub struct Engine {
    pub(crate) db: Database,
    pub(crate) catalog: Arc<dyn Catalog>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) config: Config,
}

impl Engine {
    pub fn new(
        db: Database,
        catalog: Arc<dyn Catalog>,
        clock: Arc<dyn Clock>,
        config: Config,
    ) -> Self {
        Self {
            db,
            catalog,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run a write, retrying it on conflicts as the config allows.
    pub(crate) fn retry<T>(&self, what: &str, op: impl FnMut() -> Fallible<T>) -> Fallible<T> {
        let backoff =
            conflict_backoff(self.config.max_conflict_retries, self.config.retry_backoff_ms);
        retry_conflicts(backoff, what, op)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use crate::catalog::StageEntry;
    use crate::catalog::StaticCatalog;
    use crate::catalog::UnitEntry;
    use crate::clock::FixedClock;
    use crate::config::Config;
    use crate::db::Database;
    use crate::engine::Engine;
    use crate::error::Fallible;
    use crate::types::ids::CardId;
    use crate::types::ids::StageId;
    use crate::types::ids::UnitId;
    use crate::types::timestamp::Timestamp;

    /// Two stages. `basics` has units `greetings` (3 cards) and `numbers`
    /// (2 cards); `travel` has unit `airport` (1 card).
    pub fn catalog() -> StaticCatalog {
        let unit = |id: &str, cards: &[&str]| UnitEntry {
            id: UnitId::from(id),
            cards: cards.iter().map(|c| CardId::from(*c)).collect(),
        };
        StaticCatalog::new(vec![
            StageEntry {
                id: StageId::from("basics"),
                position: 1,
                units: vec![
                    unit("greetings", &["hello", "goodbye", "thanks"]),
                    unit("numbers", &["one", "two"]),
                ],
            },
            StageEntry {
                id: StageId::from("travel"),
                position: 2,
                units: vec![unit("airport", &["gate"])],
            },
        ])
        .unwrap()
    }

    pub fn start() -> Timestamp {
        Timestamp::parse("2025-06-01T12:00:00Z").unwrap()
    }

    pub fn engine_with(config: Config) -> Fallible<(Engine, Arc<FixedClock>)> {
        let clock = Arc::new(FixedClock::utc(start()));
        let engine = Engine::new(
            Database::in_memory()?,
            Arc::new(catalog()),
            clock.clone(),
            config,
        );
        Ok((engine, clock))
    }

    pub fn engine() -> Fallible<(Engine, Arc<FixedClock>)> {
        engine_with(Config::default())
    }
}
