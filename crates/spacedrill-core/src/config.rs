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

use std::fs::read_to_string;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::Error;
use crate::error::Fallible;

/// Engine settings. Every field has a default, so an empty file is a valid
/// configuration.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Path to the SQLite database.
    pub database: PathBuf,
    /// Directory holding the content catalog.
    pub catalog: PathBuf,
    /// How many new cards a learner may be introduced to per calendar day.
    pub daily_new_card_limit: u32,
    /// Default number of cards returned by the review queue.
    pub queue_limit: usize,
    /// How many times a conflicting write is retried before giving up.
    pub max_conflict_retries: u32,
    /// Base delay between retries. Doubles on every attempt.
    pub retry_backoff_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from("spacedrill.db"),
            catalog: PathBuf::from("catalog"),
            daily_new_card_limit: 20,
            queue_limit: 20,
            max_conflict_retries: 3,
            retry_backoff_ms: 10,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Fallible<Self> {
        log::debug!("Loading configuration from {}", path.display());
        let content = read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Fallible<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() -> Fallible<()> {
        assert_eq!(Config::parse("")?, Config::default());
        Ok(())
    }

    #[test]
    fn test_partial_file() -> Fallible<()> {
        let config = Config::parse("daily_new_card_limit = 5\ndatabase = \"/tmp/x.db\"\n")?;
        assert_eq!(config.daily_new_card_limit, 5);
        assert_eq!(config.database, PathBuf::from("/tmp/x.db"));
        assert_eq!(config.queue_limit, 20);
        Ok(())
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = Config::parse("daily_limit = 5\n").err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }
}
